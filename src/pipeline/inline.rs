//! Pass C: replace inline placeholders in HTML pages with the assets' final content.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::host::join_url;
use crate::kind::InlineKind;

const PLACEHOLDER_PREFIX: &str = "<!-- inline ";

fn placeholder_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"<!-- inline (script|style):(\S+) -->\n").expect("invalid placeholder regex")
  })
}

/// Counts reported by the inlining pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InlineStats {
  /// HTML files scanned.
  pub pages_scanned: usize,
  /// HTML files rewritten.
  pub pages_rewritten: usize,
  /// Placeholders replaced.
  pub assets_embedded: usize,
}

/// Substitute every placeholder in `html`, reading assets below `destination`.
/// Returns the new text and the number of replacements.
pub fn inline_placeholders(html: &str, destination: &Path) -> Result<(String, usize)> {
  let mut output = String::with_capacity(html.len());
  let mut last = 0;
  let mut embedded = 0;

  for caps in placeholder_pattern().captures_iter(html) {
    let (Some(whole), Some(kind), Some(url)) = (
      caps.get(0),
      caps.get(1).and_then(|m| InlineKind::parse(m.as_str())),
      caps.get(2),
    ) else {
      continue;
    };

    let asset_path = join_url(destination, url.as_str());
    debug!(path = %asset_path.display(), "embedding asset");
    let content = fs::read_to_string(&asset_path).map_err(|err| Error::io(&asset_path, err))?;

    output.push_str(&html[last..whole.start()]);
    let tag = kind.as_str();
    output.push_str(&format!("<{tag}>{content}</{tag}>\n"));
    last = whole.end();
    embedded += 1;
  }
  output.push_str(&html[last..]);

  Ok((output, embedded))
}

/// Inline registered assets into every `.html` file under `destination`.
pub fn inline_assets(destination: &Path) -> Result<InlineStats> {
  let mut stats = InlineStats::default();

  for entry in WalkDir::new(destination)
    .sort_by_file_name()
    .into_iter()
    .filter_map(std::result::Result::ok)
    .filter(|e| e.file_type().is_file())
    .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
  {
    let page = entry.path();
    debug!(path = %page.display(), "HTML file");
    stats.pages_scanned += 1;

    let source = fs::read_to_string(page).map_err(|err| Error::io(page, err))?;
    if !source.contains(PLACEHOLDER_PREFIX) {
      continue;
    }

    let (processed, embedded) = inline_placeholders(&source, destination)?;
    if embedded == 0 {
      continue;
    }
    fs::write(page, processed).map_err(|err| Error::io(page, err))?;
    stats.pages_rewritten += 1;
    stats.assets_embedded += embedded;
  }

  Ok(stats)
}
