//! Template tags referencing fingerprinted assets.
//!
//! Two variants exist: [`DirectReferenceTag`] renders a bare URL and
//! [`InlineReferenceTag`] renders a placeholder that the post-write pipeline later swaps for
//! the asset's content. Both share the production path in [`render_tag`], which digests the
//! source file, registers the fingerprinted URL, records the page dependency and reserves
//! the output path.

use tracing::debug;

use crate::digest::{ContentDigester, fingerprint_url};
use crate::error::{Error, Result};
use crate::host::{ClaimedOutput, RenderContext};
use crate::kind::{AssetClassifier, InlineKind};
use crate::mode::BuildMode;
use crate::registry::ReferenceRegistry;

/// Per-variant rendering of an asset reference.
pub trait AssetTag {
  /// URL as written in the template, relative to the site source root.
  fn url(&self) -> &str;

  /// Output when assets are served unmodified.
  fn render_development(&self) -> String;

  /// Output once the asset has been fingerprinted.
  fn render_production(&self, fingerprinted_url: &str) -> String;
}

/// Renders the URL itself, fingerprinted in production.
#[derive(Debug, Clone)]
pub struct DirectReferenceTag {
  url: String,
}

impl DirectReferenceTag {
  /// Tag for `url`; surrounding whitespace is ignored.
  pub fn new(url: &str) -> Self {
    Self {
      url: url.trim().to_string(),
    }
  }
}

impl AssetTag for DirectReferenceTag {
  fn url(&self) -> &str {
    &self.url
  }

  fn render_development(&self) -> String {
    self.url.clone()
  }

  fn render_production(&self, fingerprinted_url: &str) -> String {
    fingerprinted_url.to_string()
  }
}

/// Renders a linking tag in development and an inline placeholder in production.
#[derive(Debug, Clone)]
pub struct InlineReferenceTag {
  url: String,
  kind: InlineKind,
}

impl InlineReferenceTag {
  /// Tag for `url`, inlined as a script when its extension is a script extension.
  pub fn new(url: &str, classifier: &AssetClassifier) -> Self {
    let url = url.trim().to_string();
    let kind = classifier.inline_kind(&url);
    Self { url, kind }
  }

  /// Element the asset will be inlined as.
  pub fn kind(&self) -> InlineKind {
    self.kind
  }
}

impl AssetTag for InlineReferenceTag {
  fn url(&self) -> &str {
    &self.url
  }

  fn render_development(&self) -> String {
    match self.kind {
      InlineKind::Script => format!(r#"<script src="{}"></script>"#, self.url),
      InlineKind::Style => format!(r#"<link rel="stylesheet" href="{}"/>"#, self.url),
    }
  }

  fn render_production(&self, fingerprinted_url: &str) -> String {
    inline_placeholder(self.kind, fingerprinted_url)
  }
}

/// Marker written into pages and consumed by the inlining pass.
pub fn inline_placeholder(kind: InlineKind, fingerprinted_url: &str) -> String {
  format!("<!-- inline {}:{} -->", kind.as_str(), fingerprinted_url)
}

/// Names under which the tags are exposed to templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagName {
  /// `asset_url`
  AssetUrl,
  /// `asset_inline`
  AssetInline,
}

impl TagName {
  /// Parse a template tag name.
  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "asset_url" => Some(Self::AssetUrl),
      "asset_inline" => Some(Self::AssetInline),
      _ => None,
    }
  }

  /// Template-facing name.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::AssetUrl => "asset_url",
      Self::AssetInline => "asset_inline",
    }
  }

  /// Instantiate the tag variant for one invocation.
  pub fn build(self, url: &str, classifier: &AssetClassifier) -> Box<dyn AssetTag> {
    match self {
      Self::AssetUrl => Box::new(DirectReferenceTag::new(url)),
      Self::AssetInline => Box::new(InlineReferenceTag::new(url, classifier)),
    }
  }
}

/// Render one tag invocation.
///
/// Development mode touches nothing and returns the variant's pass-through output.
pub fn render_tag(
  tag: &dyn AssetTag,
  mode: BuildMode,
  context: &mut RenderContext<'_>,
  registry: &mut ReferenceRegistry,
  digester: &mut ContentDigester,
) -> Result<String> {
  if !mode.is_production() {
    return Ok(tag.render_development());
  }

  let url = tag.url();
  let source_path = context.roots.in_source(url);
  let digest = digester.digest(&source_path)?;
  let fingerprinted = fingerprint_url(url, &digest).ok_or_else(|| Error::NoExtension {
    url: url.to_string(),
  })?;

  if let Some(page) = context.page {
    let page_path = context.roots.in_source(page);
    context.dependencies.add_dependency(&page_path, &source_path);
  }

  context.claims.insert(ClaimedOutput {
    path: context.roots.in_destination(&fingerprinted),
  });
  registry.register(url, &fingerprinted)?;

  debug!(url, fingerprinted = %fingerprinted, "fingerprinted asset");
  Ok(tag.render_production(&fingerprinted))
}
