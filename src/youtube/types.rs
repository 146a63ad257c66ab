//! Track types.
//!
//! `TrackDescriptor` is what the rest of the player passes around; `YtDlpEntry`
//! mirrors the JSON that yt-dlp prints and is converted at the resolver edge.

use serde::Deserialize;
use std::fmt;

/// Longest title shown in a result list before it is truncated.
const MAX_LISTED_TITLE: usize = 70;

/// Opaque reference the resolver turns into a playable stream URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef(String);

impl SourceRef {
  pub fn new(reference: impl Into<String>) -> Self {
    Self(reference.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SourceRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// One playable item. Never mutated after the resolver creates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
  pub id: String,
  pub title: String,
  /// Length in whole seconds, when known.
  pub duration: Option<u64>,
  pub uploader: Option<String>,
  pub source: SourceRef,
}

impl TrackDescriptor {
  /// Duration as `m:ss` or `h:mm:ss`, `--:--` when unknown (live streams).
  pub fn duration_label(&self) -> String {
    match self.duration {
      Some(secs) => format_duration(secs),
      None => "--:--".to_string(),
    }
  }

  /// Title cut to fit a result list line.
  pub fn listed_title(&self) -> String {
    truncate_title(&self.title, MAX_LISTED_TITLE)
  }
}

impl fmt::Display for TrackDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} [{}]", self.title, self.duration_label())
  }
}

pub fn format_duration(secs: u64) -> String {
  let hours = secs / 3600;
  let minutes = (secs % 3600) / 60;
  let seconds = secs % 60;
  if hours > 0 {
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
  } else {
    format!("{}:{:02}", minutes, seconds)
  }
}

fn truncate_title(title: &str, max: usize) -> String {
  if title.chars().count() <= max {
    return title.to_string();
  }
  let kept: String = title.chars().take(max.saturating_sub(3)).collect();
  format!("{}...", kept)
}

/// A single entry as printed by `yt-dlp --dump-json`.
///
/// Flat search results only carry a subset of these; everything except the
/// id is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct YtDlpEntry {
  pub id: String,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub duration: Option<f64>,
  #[serde(default)]
  pub uploader: Option<String>,
  #[serde(default)]
  pub channel: Option<String>,
  #[serde(default)]
  pub webpage_url: Option<String>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub ie_key: Option<String>,
}

impl YtDlpEntry {
  /// Page URL for this entry, falling back to the canonical watch URL.
  fn page_url(&self) -> String {
    if let Some(url) = self.webpage_url.as_ref().filter(|u| u.starts_with("http")) {
      return url.clone();
    }
    // Flat entries put the page URL in `url`; full entries put the stream there.
    if self.ie_key.is_some() {
      if let Some(url) = self.url.as_ref().filter(|u| u.starts_with("http")) {
        return url.clone();
      }
    }
    super::url::watch_url(&self.id)
  }
}

impl From<YtDlpEntry> for TrackDescriptor {
  fn from(entry: YtDlpEntry) -> Self {
    let source = SourceRef::new(entry.page_url());
    Self {
      title: entry.title.unwrap_or_else(|| "Unknown Title".to_string()),
      duration: entry
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d.round() as u64),
      uploader: entry.uploader.or(entry.channel),
      id: entry.id,
      source,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_flat_search_entry_conversion() {
    let json = r#"{"_type":"url","ie_key":"Youtube","id":"dQw4w9WgXcQ","url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ","title":"Never Gonna Give You Up","duration":212.0,"channel":"Rick Astley","uploader":null}"#;
    let entry: YtDlpEntry = serde_json::from_str(json).unwrap();
    let track = TrackDescriptor::from(entry);

    assert_eq!(track.id, "dQw4w9WgXcQ");
    assert_eq!(track.duration, Some(212));
    assert_eq!(track.uploader.as_deref(), Some("Rick Astley"));
    assert_eq!(
      track.source.as_str(),
      "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
    );
  }

  #[test]
  fn test_full_entry_ignores_stream_url() {
    let json = r#"{"id":"abc123def45","title":"Live","url":"https://rr1.googlevideo.com/videoplayback?x=1","duration":null}"#;
    let entry: YtDlpEntry = serde_json::from_str(json).unwrap();
    let track = TrackDescriptor::from(entry);

    assert_eq!(track.duration, None);
    assert_eq!(
      track.source.as_str(),
      "https://www.youtube.com/watch?v=abc123def45"
    );
    assert_eq!(track.duration_label(), "--:--");
  }

  #[test]
  fn test_duration_formatting() {
    assert_eq!(format_duration(0), "0:00");
    assert_eq!(format_duration(212), "3:32");
    assert_eq!(format_duration(3725), "1:02:05");
  }

  #[test]
  fn test_long_titles_are_truncated() {
    let long = "x".repeat(80);
    let cut = truncate_title(&long, 70);
    assert_eq!(cut.chars().count(), 70);
    assert!(cut.ends_with("..."));
    assert_eq!(truncate_title("short", 70), "short");
  }
}
