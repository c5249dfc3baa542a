//! Turns a Rollbar item (and optionally its latest occurrence) into a Slack
//! attachment.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::rollbar::{Item, Occurrence};

pub const MAX_STACKTRACE_FRAMES: usize = 10;

const FIRST_SEEN_FORMAT: &str = "%b %-d %H:%M:%S";

/// A Slack message attachment rendered in place of the shared link.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Preview {
    pub fallback: String,
    pub title: String,
    pub ts: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
    pub fields: Vec<PreviewField>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreviewField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl PreviewField {
    fn short(title: &str, value: String) -> Self {
        Self {
            title: title.to_string(),
            value,
            short: true,
        }
    }
}

impl Preview {
    pub fn field(&self, title: &str) -> Option<&PreviewField> {
        self.fields.iter().find(|f| f.title == title)
    }
}

pub fn build_preview(item: &Item, occurrence: Option<&Occurrence>, now: DateTime<Utc>) -> Preview {
    let mut fields = vec![
        PreviewField::short("Status", item.status.clone()),
        PreviewField::short("Occurrences", item.total_occurrences.to_string()),
        PreviewField::short("First seen", first_seen(item.first_occurrence_timestamp)),
        PreviewField::short("Last seen", last_seen(item.last_occurrence_timestamp, now)),
    ];

    let mut mrkdwn_in = Vec::new();
    if let Some(stacktrace) = occurrence.and_then(render_stacktrace) {
        fields.push(PreviewField {
            title: "Stack trace".to_string(),
            value: stacktrace,
            short: false,
        });
        mrkdwn_in.push("fields".to_string());
    }

    Preview {
        fallback: item.title.clone(),
        title: item.title.clone(),
        ts: now.timestamp(),
        mrkdwn_in,
        fields,
    }
}

/// Render `d` as a single-unit relative time, e.g. `45s ago` or `3h ago`.
pub fn time_ago(d: chrono::Duration) -> String {
    let mut t = d.num_milliseconds() as f64 / 1000.0;
    if t < 1.0 {
        return "just now".to_string();
    }
    if t < 60.0 {
        return format!("{}s ago", t.round());
    }
    t /= 60.0;
    if t < 60.0 {
        return format!("{}m ago", t.round());
    }
    t /= 60.0;
    if t < 24.0 {
        return format!("{}h ago", t.round());
    }
    t /= 24.0;
    format!("{}d ago", t.round())
}

fn first_seen(ts: Option<i64>) -> String {
    ts.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|t| t.format(FIRST_SEEN_FORMAT).to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn last_seen(ts: Option<i64>, now: DateTime<Utc>) -> String {
    match ts.and_then(|secs| Utc.timestamp_opt(secs, 0).single()) {
        Some(t) => time_ago(now - t),
        None => "never".to_string(),
    }
}

/// Most recent frame first, capped at `MAX_STACKTRACE_FRAMES`.
fn render_stacktrace(occurrence: &Occurrence) -> Option<String> {
    let frames = &occurrence.top_trace()?.frames;
    if frames.is_empty() {
        return None;
    }

    let mut out = String::from("```");
    for frame in frames.iter().rev().take(MAX_STACKTRACE_FRAMES) {
        let location = match &frame.class_name {
            Some(class) if !class.is_empty() => format!("{}.{}", class, frame.method),
            _ => frame.method.clone(),
        };
        let line = frame.lineno.map(|l| l.to_string()).unwrap_or_else(|| "?".into());
        out.push_str(&format!("at {} ({}:{})\n", location, frame.filename, line));
    }
    if frames.len() > MAX_STACKTRACE_FRAMES {
        out.push_str(&format!(
            "(... {} more frames ...)\n",
            frames.len() - MAX_STACKTRACE_FRAMES
        ));
    }
    out.push_str("```");
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollbar::types::{Frame, OccurrenceBody, OccurrenceData, Trace};
    use chrono::Duration;

    fn item() -> Item {
        Item {
            id: 1,
            title: "NoMethodError: undefined method `name' for nil".into(),
            status: "active".into(),
            first_occurrence_timestamp: Some(1_500_000_000),
            last_occurrence_timestamp: Some(1_500_003_600),
            total_occurrences: 12,
            activating_occurrence_id: Some(99),
            ..Default::default()
        }
    }

    fn occurrence_with_frames(n: usize) -> Occurrence {
        let frames = (0..n)
            .map(|i| Frame {
                filename: format!("file{}.rb", i),
                lineno: Some(i as u32 + 1),
                method: format!("m{}", i),
                class_name: Some(format!("C{}", i)),
            })
            .collect();
        Occurrence {
            id: 99,
            data: OccurrenceData {
                body: OccurrenceBody {
                    trace_chain: vec![Trace { frames }],
                    trace: None,
                },
            },
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_500_003_645, 0).unwrap()
    }

    #[test]
    fn test_time_ago_thresholds() {
        assert_eq!(time_ago(Duration::milliseconds(400)), "just now");
        assert_eq!(time_ago(Duration::seconds(45)), "45s ago");
        assert_eq!(time_ago(Duration::seconds(90)), "2m ago");
        assert_eq!(time_ago(Duration::seconds(3599)), "60m ago");
        assert_eq!(time_ago(Duration::seconds(3600)), "1h ago");
        assert_eq!(time_ago(Duration::hours(23)), "23h ago");
        assert_eq!(time_ago(Duration::hours(36)), "2d ago");
    }

    #[test]
    fn test_time_ago_future_timestamp_is_just_now() {
        assert_eq!(time_ago(Duration::seconds(-30)), "just now");
    }

    #[test]
    fn test_preview_basic_fields() {
        let p = build_preview(&item(), None, now());
        assert_eq!(p.title, item().title);
        assert_eq!(p.fallback, item().title);
        assert_eq!(p.ts, now().timestamp());
        assert_eq!(p.fields.len(), 4);
        assert_eq!(p.field("Status").unwrap().value, "active");
        assert_eq!(p.field("Occurrences").unwrap().value, "12");
        assert_eq!(p.field("First seen").unwrap().value, "Jul 14 02:40:00");
        assert_eq!(p.field("Last seen").unwrap().value, "45s ago");
        assert!(p.mrkdwn_in.is_empty());
    }

    #[test]
    fn test_zero_occurrences_without_occurrence_has_no_stacktrace() {
        let mut it = item();
        it.total_occurrences = 0;
        it.first_occurrence_timestamp = None;
        it.last_occurrence_timestamp = None;
        let p = build_preview(&it, None, now());
        assert!(p.field("Stack trace").is_none());
        assert_eq!(p.field("Occurrences").unwrap().value, "0");
        assert_eq!(p.field("First seen").unwrap().value, "never");
        assert_eq!(p.field("Last seen").unwrap().value, "never");
    }

    #[test]
    fn test_empty_frames_have_no_stacktrace() {
        let p = build_preview(&item(), Some(&occurrence_with_frames(0)), now());
        assert!(p.field("Stack trace").is_none());
    }

    #[test]
    fn test_fifteen_frames_are_truncated_to_ten() {
        let p = build_preview(&item(), Some(&occurrence_with_frames(15)), now());
        let trace = &p.field("Stack trace").unwrap().value;
        assert!(!p.field("Stack trace").unwrap().short);
        assert_eq!(p.mrkdwn_in, vec!["fields".to_string()]);

        let lines: Vec<&str> = trace.trim_matches('`').lines().collect();
        assert_eq!(lines.iter().filter(|l| l.starts_with("at ")).count(), 10);
        assert_eq!(lines[0], "at C14.m14 (file14.rb:15)");
        assert_eq!(lines[9], "at C5.m5 (file5.rb:6)");
        assert_eq!(lines[10], "(... 5 more frames ...)");
    }

    #[test]
    fn test_short_trace_has_no_elision_note() {
        let p = build_preview(&item(), Some(&occurrence_with_frames(3)), now());
        let trace = &p.field("Stack trace").unwrap().value;
        assert!(trace.starts_with("```at C2.m2 (file2.rb:3)\n"));
        assert!(trace.ends_with("at C0.m0 (file0.rb:1)\n```"));
        assert!(!trace.contains("more frames"));
    }

    #[test]
    fn test_frame_without_class_or_line() {
        let mut occ = occurrence_with_frames(1);
        occ.data.body.trace_chain[0].frames[0].class_name = None;
        occ.data.body.trace_chain[0].frames[0].lineno = None;
        let p = build_preview(&item(), Some(&occ), now());
        assert_eq!(p.field("Stack trace").unwrap().value, "```at m0 (file0.rb:?)\n```");
    }

    #[test]
    fn test_preview_serializes_as_slack_attachment() {
        let p = build_preview(&item(), Some(&occurrence_with_frames(1)), now());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["fields"][0]["title"], "Status");
        assert_eq!(json["fields"][0]["short"], true);
        assert_eq!(json["mrkdwn_in"][0], "fields");

        let plain = serde_json::to_value(build_preview(&item(), None, now())).unwrap();
        assert!(plain.get("mrkdwn_in").is_none());
    }
}
