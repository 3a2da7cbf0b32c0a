//! Extension parsing and asset classification.

use std::collections::BTreeSet;

/// How the post-write stage materializes a fingerprinted asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
  /// Run through the script minifier.
  Script,
  /// Run through the stylesheet minifier, then has its `url()`s rewritten.
  Stylesheet,
  /// Copied byte-for-byte.
  Passthrough,
  /// No rule applies; left unmaterialized with a warning.
  Unknown,
}

/// Element an inlined asset is wrapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineKind {
  /// `<script>...</script>`
  Script,
  /// `<style>...</style>`
  Style,
}

impl InlineKind {
  /// Tag name used in placeholders and in the inlined element.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Script => "script",
      Self::Style => "style",
    }
  }

  /// Parse the kind segment of a placeholder.
  pub fn parse(value: &str) -> Option<Self> {
    match value {
      "script" => Some(Self::Script),
      "style" => Some(Self::Style),
      _ => None,
    }
  }
}

/// Extension lookup tables built from the project configuration.
#[derive(Debug, Clone, Default)]
pub struct AssetClassifier {
  scripts: BTreeSet<String>,
  stylesheets: BTreeSet<String>,
  passthrough: BTreeSet<String>,
}

impl AssetClassifier {
  /// Build a classifier; extensions are compared case-insensitively, without the dot.
  pub fn new(scripts: &[String], stylesheets: &[String], passthrough: &[String]) -> Self {
    Self {
      scripts: normalise(scripts),
      stylesheets: normalise(stylesheets),
      passthrough: normalise(passthrough),
    }
  }

  /// Classify an asset URL by its last extension.
  pub fn classify(&self, url: &str) -> AssetKind {
    let Some(ext) = url_extension(url).map(str::to_ascii_lowercase) else {
      return AssetKind::Unknown;
    };
    if self.scripts.contains(&ext) {
      AssetKind::Script
    } else if self.stylesheets.contains(&ext) {
      AssetKind::Stylesheet
    } else if self.passthrough.contains(&ext) {
      AssetKind::Passthrough
    } else {
      AssetKind::Unknown
    }
  }

  /// Inline element for a URL: scripts become `<script>`, everything else `<style>`.
  pub fn inline_kind(&self, url: &str) -> InlineKind {
    match self.classify(url) {
      AssetKind::Script => InlineKind::Script,
      _ => InlineKind::Style,
    }
  }
}

fn normalise(values: &[String]) -> BTreeSet<String> {
  values
    .iter()
    .map(|value| value.trim().trim_start_matches('.').to_ascii_lowercase())
    .filter(|value| !value.is_empty())
    .collect()
}

/// Split a URL into its path and any `?query` / `#fragment` suffix.
pub fn split_suffix(url: &str) -> (&str, &str) {
  match url.find(['?', '#']) {
    Some(index) => url.split_at(index),
    None => (url, ""),
  }
}

/// Byte offset of the dot starting the last extension of the final path segment.
///
/// The extension must be one or more word characters. A segment that only starts with a
/// dot (`.htaccess`) has no extension.
pub fn extension_start(path: &str) -> Option<usize> {
  let segment_start = path.rfind('/').map_or(0, |index| index + 1);
  let segment = &path[segment_start..];
  let dot = segment.rfind('.')?;
  let ext = &segment[dot + 1..];
  if dot == 0 || ext.is_empty() || !ext.chars().all(|c| c.is_alphanumeric() || c == '_') {
    return None;
  }
  Some(segment_start + dot)
}

/// Last extension of a URL (without the dot), ignoring query and fragment.
pub fn url_extension(url: &str) -> Option<&str> {
  let (path, _) = split_suffix(url);
  extension_start(path).map(|dot| &path[dot + 1..])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn classifier() -> AssetClassifier {
    AssetClassifier::new(
      &["js".into(), "mjs".into()],
      &["css".into()],
      &[".png".into(), "WOFF2".into()],
    )
  }

  #[test]
  fn classifies_by_last_extension() {
    let classifier = classifier();
    assert_eq!(classifier.classify("js/app.min.js"), AssetKind::Script);
    assert_eq!(classifier.classify("app.mjs"), AssetKind::Script);
    assert_eq!(classifier.classify("css/site.CSS"), AssetKind::Stylesheet);
    assert_eq!(classifier.classify("img/logo.png"), AssetKind::Passthrough);
    assert_eq!(classifier.classify("fonts/a.woff2?v=1"), AssetKind::Passthrough);
    assert_eq!(classifier.classify("notes.md"), AssetKind::Unknown);
    assert_eq!(classifier.classify("LICENSE"), AssetKind::Unknown);
  }

  #[test]
  fn inline_kind_defaults_to_style() {
    let classifier = classifier();
    assert_eq!(classifier.inline_kind("app.js"), InlineKind::Script);
    assert_eq!(classifier.inline_kind("site.css"), InlineKind::Style);
    assert_eq!(classifier.inline_kind("weird.txt"), InlineKind::Style);
  }

  #[test]
  fn extension_only_considers_final_segment() {
    assert_eq!(url_extension("app.min.js"), Some("js"));
    assert_eq!(url_extension("dir.v2/file"), None);
    assert_eq!(url_extension(".htaccess"), None);
    assert_eq!(url_extension("archive.tar.gz"), Some("gz"));
    assert_eq!(url_extension("font.woff#iefix"), Some("woff"));
    assert_eq!(url_extension("trailing."), None);
  }

  #[test]
  fn splits_query_and_fragment() {
    assert_eq!(split_suffix("a.css?v=2#x"), ("a.css", "?v=2#x"));
    assert_eq!(split_suffix("a.css"), ("a.css", ""));
  }
}
