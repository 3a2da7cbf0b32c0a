//! Pass A: put final bytes at every fingerprinted path claimed during rendering.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::host::join_url;
use crate::install::install_asset;
use crate::kind::{AssetClassifier, AssetKind};
use crate::pipeline::minify::Minifier;
use crate::registry::ReferenceRegistry;

/// Counts reported by the materialize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeStats {
  /// Scripts and stylesheets run through a minifier.
  pub minified: usize,
  /// Assets copied through unchanged.
  pub copied: usize,
  /// Assets of unknown kind left unmaterialized.
  pub skipped: usize,
}

/// Minify or copy every registered asset from its original destination path to its
/// fingerprinted one.
pub fn materialize_assets(
  registry: &ReferenceRegistry,
  destination: &Path,
  classifier: &AssetClassifier,
  minifier: &dyn Minifier,
) -> Result<MaterializeStats> {
  let mut stats = MaterializeStats::default();

  for (original, fingerprinted) in registry.iter() {
    let source_path = join_url(destination, original);
    let target_path = join_url(destination, fingerprinted);

    match classifier.classify(original) {
      AssetKind::Script => {
        debug!(source = %source_path.display(), target = %target_path.display(), "JS asset");
        minifier.minify_script(&source_path, &target_path)?;
        stats.minified += 1;
      }
      AssetKind::Stylesheet => {
        debug!(source = %source_path.display(), target = %target_path.display(), "CSS asset");
        minifier.minify_stylesheet(&source_path, &target_path)?;
        stats.minified += 1;
      }
      AssetKind::Passthrough => {
        debug!(source = %source_path.display(), target = %target_path.display(), "static asset");
        install_asset(&source_path, &target_path)?;
        stats.copied += 1;
      }
      AssetKind::Unknown => {
        warn!(path = %source_path.display(), "skipping unknown asset type");
        stats.skipped += 1;
      }
    }
  }

  Ok(stats)
}
