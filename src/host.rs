//! Seams through which the site generator hands rendering state to the tags.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::trace;

use crate::kind::split_suffix;

/// Source and destination roots of the site being built.
#[derive(Debug, Clone)]
pub struct SiteRoots {
  /// Directory holding authored pages and assets.
  pub source: PathBuf,
  /// Directory the generated site is written to.
  pub destination: PathBuf,
}

impl SiteRoots {
  /// Create roots from the two directories.
  pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
    Self {
      source: source.into(),
      destination: destination.into(),
    }
  }

  /// Absolute source path of a site URL.
  pub fn in_source(&self, url: &str) -> PathBuf {
    join_url(&self.source, url)
  }

  /// Absolute destination path of a site URL.
  pub fn in_destination(&self, url: &str) -> PathBuf {
    join_url(&self.destination, url)
  }
}

/// Join a `/`-separated site URL below `root`, ignoring a leading slash and any
/// `?query` or `#fragment` suffix.
pub fn join_url(root: &Path, url: &str) -> PathBuf {
  let (path, _) = split_suffix(url);
  path
    .trim_start_matches('/')
    .split('/')
    .filter(|segment| !segment.is_empty() && *segment != ".")
    .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Receives "page depends on asset" edges for incremental rebuilds.
pub trait DependencyTracker {
  /// Record that `page` must be regenerated when `asset` changes.
  fn add_dependency(&mut self, page: &Path, asset: &Path);
}

/// In-memory dependency edges, page source path to asset source paths.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DependencyGraph {
  edges: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl DependencyGraph {
  /// Assets a page depends on.
  pub fn dependencies_of(&self, page: &Path) -> Option<&BTreeSet<PathBuf>> {
    self.edges.get(page)
  }

  /// Pages depending on `asset`, useful when a single asset changes.
  pub fn dependents_of<'a>(&'a self, asset: &'a Path) -> impl Iterator<Item = &'a Path> + 'a {
    self
      .edges
      .iter()
      .filter(move |(_, assets)| assets.contains(asset))
      .map(|(page, _)| page.as_path())
  }

  /// True when no edge was recorded.
  pub fn is_empty(&self) -> bool {
    self.edges.is_empty()
  }
}

impl DependencyTracker for DependencyGraph {
  fn add_dependency(&mut self, page: &Path, asset: &Path) {
    self
      .edges
      .entry(page.to_path_buf())
      .or_default()
      .insert(asset.to_path_buf());
  }
}

/// A destination path reserved by a fingerprinting tag.
///
/// The bytes are produced later by the post-write pipeline; the claim only tells the
/// generator that the path is expected output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClaimedOutput {
  /// Absolute destination path.
  pub path: PathBuf,
}

impl ClaimedOutput {
  /// Generator write step for a claimed path. Intentionally writes nothing.
  pub fn write(&self) {
    trace!(path = %self.path.display(), "claimed output left for post-write");
  }
}

/// Per-invocation state a tag renders against.
pub struct RenderContext<'a> {
  /// Roots of the site being built.
  pub roots: &'a SiteRoots,
  /// Source-relative path of the page being rendered, when known.
  pub page: Option<&'a str>,
  /// Dependency sink for incremental rebuilds.
  pub dependencies: &'a mut dyn DependencyTracker,
  /// Output paths reserved during this build, one entry per path.
  pub claims: &'a mut BTreeSet<ClaimedOutput>,
}
