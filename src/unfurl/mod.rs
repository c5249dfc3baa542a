//! Link resolution and unfurl pipeline.

pub mod assembler;
pub mod matcher;
pub mod pipeline;

pub use assembler::{build_preview, time_ago, Preview, PreviewField};
pub use matcher::{match_item_link, match_project_url, project_url, ItemRef};
pub use pipeline::{LinkSharedEvent, SharedLink, UnfurlOutcome, UnfurlPipeline};
