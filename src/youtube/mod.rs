//! YouTube lookup module.
//!
//! Searches and resolves tracks by running yt-dlp and parsing its JSON output.

mod error;
mod resolver;
mod types;
mod url;

pub use error::ResolveError;
pub use resolver::{find_yt_dlp, Resolver, YtDlpOptions, YtDlpResolver};
pub use types::{format_duration, SourceRef, TrackDescriptor};
pub use url::{extract_video_id, looks_like_url, watch_url};
