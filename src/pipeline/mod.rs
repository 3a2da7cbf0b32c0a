//! Post-write processing run once the generator has written the whole output tree.
//!
//! The passes run strictly in order: stylesheet rewriting reads the files produced by
//! materialization, and inlining reads the final minified bytes.

pub mod inline;
pub mod materialize;
pub mod minify;
pub mod stylesheet;

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::host::join_url;
use crate::kind::AssetClassifier;
use crate::mode::BuildMode;
use crate::registry::ReferenceRegistry;

pub use inline::{InlineStats, inline_assets, inline_placeholders};
pub use materialize::{MaterializeStats, materialize_assets};
pub use minify::{ExternalMinifier, Minifier};
pub use stylesheet::{RewrittenStylesheet, rewrite_stylesheet_urls, rewrite_stylesheets};

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostWriteSummary {
  /// Pass A counts.
  pub materialized: MaterializeStats,
  /// Image references rewritten in pass B.
  pub stylesheet_references: usize,
  /// Pass C counts.
  pub inlined: InlineStats,
}

/// The three ordered post-write passes.
pub struct PostWritePipeline<'a> {
  classifier: AssetClassifier,
  minifier: &'a dyn Minifier,
  manifest_file: Option<String>,
}

impl<'a> PostWritePipeline<'a> {
  /// Pipeline using the configured asset kinds and the given minifier.
  pub fn new(config: &ProjectConfig, minifier: &'a dyn Minifier) -> Self {
    Self {
      classifier: config.classifier(),
      minifier,
      manifest_file: config.manifest_file.clone(),
    }
  }

  /// Run every pass against `destination`. Does nothing outside production.
  pub fn run(
    &self,
    mode: BuildMode,
    registry: &ReferenceRegistry,
    destination: &Path,
  ) -> Result<PostWriteSummary> {
    if !mode.is_production() {
      return Ok(PostWriteSummary::default());
    }

    let materialized = materialize_assets(registry, destination, &self.classifier, self.minifier)?;
    info!(
      minified = materialized.minified,
      copied = materialized.copied,
      "optimizing assets: done"
    );

    let stylesheet_references = rewrite_stylesheets(registry, destination, &self.classifier)?;
    info!(references = stylesheet_references, "processing images: done");

    let inlined = inline_assets(destination)?;
    info!(embedded = inlined.assets_embedded, "embedding assets: done");

    if let Some(manifest) = &self.manifest_file {
      write_manifest(registry, &join_url(destination, manifest))?;
    }

    Ok(PostWriteSummary {
      materialized,
      stylesheet_references,
      inlined,
    })
  }
}

fn write_manifest(registry: &ReferenceRegistry, path: &Path) -> Result<()> {
  let json = serde_json::to_string_pretty(registry).map_err(|source| Error::Manifest {
    path: path.to_path_buf(),
    source,
  })?;
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
  }
  fs::write(path, json).map_err(|err| Error::io(path, err))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  struct CopyMinifier;

  impl Minifier for CopyMinifier {
    fn minify_script(&self, input: &Path, output: &Path) -> Result<()> {
      fs::copy(input, output).map(|_| ()).map_err(|err| Error::io(input, err))
    }

    fn minify_stylesheet(&self, input: &Path, output: &Path) -> Result<()> {
      fs::copy(input, output).map(|_| ()).map_err(|err| Error::io(input, err))
    }
  }

  #[test]
  fn development_mode_is_a_no_op() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<!-- inline script:a-1.js -->\n").unwrap();
    let mut registry = ReferenceRegistry::default();
    registry.register("a.js", "a-1.js").unwrap();

    let config = ProjectConfig::default();
    let pipeline = PostWritePipeline::new(&config, &CopyMinifier);
    let summary = pipeline.run(BuildMode::Development, &registry, dir.path()).unwrap();

    assert_eq!(summary, PostWriteSummary::default());
    assert!(!dir.path().join("a-1.js").exists());
  }

  #[test]
  fn inlined_stylesheet_sees_rewritten_urls_and_manifest_is_written() {
    let dir = tempdir().unwrap();
    let dest = dir.path();
    fs::write(dest.join("logo.png"), b"logo").unwrap();
    fs::write(dest.join("site.css"), "h1{background:url(logo.png)}").unwrap();
    fs::write(dest.join("index.html"), "<!-- inline style:site-9.css -->\n").unwrap();

    let mut registry = ReferenceRegistry::default();
    registry.register("site.css", "site-9.css").unwrap();

    let config = ProjectConfig {
      manifest_file: Some("meta/assets.json".into()),
      ..ProjectConfig::default()
    };
    let summary = PostWritePipeline::new(&config, &CopyMinifier)
      .run(BuildMode::Production, &registry, dest)
      .unwrap();

    assert_eq!(summary.materialized.minified, 1);
    assert_eq!(summary.stylesheet_references, 1);
    assert_eq!(summary.inlined.assets_embedded, 1);

    let digest = crate::digest::digest_bytes(b"logo");
    assert_eq!(
      fs::read_to_string(dest.join("index.html")).unwrap(),
      format!("<style>h1{{background:url(logo-{digest}.png)}}</style>\n")
    );
    let manifest = fs::read_to_string(dest.join("meta/assets.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert_eq!(parsed["site.css"], "site-9.css");
  }
}
