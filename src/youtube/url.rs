//! YouTube link recognition.

/// Canonical watch page for a video id.
pub fn watch_url(video_id: &str) -> String {
  format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Whether the input should be treated as a link rather than a search term.
pub fn looks_like_url(input: &str) -> bool {
  let lower = input.trim_start().to_ascii_lowercase();
  lower.starts_with("http://") || lower.starts_with("https://")
}

/// Extract the video id from a YouTube link.
///
/// Accepts `youtube.com/watch?v=<id>`, `youtu.be/<id>` and
/// `youtube.com/shorts/<id>`, with or without `www.`/`m.`/`music.`.
pub fn extract_video_id(url: &str) -> Option<String> {
  let rest = strip_scheme(url.trim())?;
  let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
  let host = host.to_ascii_lowercase();
  let host = host
    .trim_start_matches("www.")
    .trim_start_matches("m.")
    .trim_start_matches("music.");

  let id = match host {
    "youtu.be" => path.split(['?', '#', '/']).next(),
    "youtube.com" => {
      let (route, query) = path.split_once('?').unwrap_or((path, ""));
      if route == "watch" {
        query
          .split('#')
          .next()
          .unwrap_or("")
          .split('&')
          .find_map(|pair| pair.strip_prefix("v="))
      } else if let Some(short) = route.strip_prefix("shorts/") {
        short.split(['#', '/']).next()
      } else {
        None
      }
    }
    _ => None,
  }?;

  is_video_id(id).then(|| id.to_string())
}

/// The part after `http://` or `https://`, with the scheme matched in any case.
fn strip_scheme(url: &str) -> Option<&str> {
  let (scheme, rest) = url.split_once("://")?;
  (scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("http")).then_some(rest)
}

fn is_video_id(id: &str) -> bool {
  !id.is_empty()
    && id.len() <= 64
    && id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
