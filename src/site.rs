//! Minimal site generator driving a full build: render pages, copy files, post-process.
//!
//! Pages are the `.html` files of the source tree. Inside them `{% asset_url path %}` and
//! `{% asset_inline path %}` are rendered through [`render_tag`]; every other file is
//! copied through to the destination unchanged.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::{DEFAULT_CONFIG_FILE, ProjectConfig};
use crate::digest::ContentDigester;
use crate::host::{ClaimedOutput, DependencyGraph, RenderContext, SiteRoots};
use crate::install::install_asset;
use crate::kind::AssetClassifier;
use crate::mode::BuildMode;
use crate::pipeline::{Minifier, PostWritePipeline, PostWriteSummary};
use crate::registry::ReferenceRegistry;
use crate::tag::{TagName, render_tag};

fn tag_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"\{%-?\s*(asset_url|asset_inline)\s+([^%]+?)\s*-?%\}").expect("invalid tag regex")
  })
}

/// Everything a finished build produced, serializable for `--report`.
#[derive(Debug, Serialize)]
pub struct BuildReport {
  /// Mode the build ran in.
  pub mode: BuildMode,
  /// HTML pages rendered.
  pub pages_rendered: usize,
  /// Non-page files copied through.
  pub files_copied: usize,
  /// Original -> fingerprinted URLs registered while rendering.
  pub assets: ReferenceRegistry,
  /// Page -> asset source dependencies.
  pub dependencies: DependencyGraph,
  /// Post-write pipeline counts.
  pub post_write: PostWriteSummary,
}

/// One build of a site.
pub struct SiteBuild<'a> {
  roots: SiteRoots,
  config: ProjectConfig,
  mode: BuildMode,
  minifier: &'a dyn Minifier,
}

/// Mutable state of the render phase; recreated for every build.
struct RenderState {
  registry: ReferenceRegistry,
  digester: ContentDigester,
  dependencies: DependencyGraph,
  claims: BTreeSet<ClaimedOutput>,
  classifier: AssetClassifier,
}

impl<'a> SiteBuild<'a> {
  /// Prepare a build of `roots` in `mode`.
  pub fn new(
    roots: SiteRoots,
    config: ProjectConfig,
    mode: BuildMode,
    minifier: &'a dyn Minifier,
  ) -> Self {
    Self {
      roots,
      config,
      mode,
      minifier,
    }
  }

  /// Render, write and post-process the whole site.
  pub fn run(&self) -> Result<BuildReport> {
    fs::create_dir_all(&self.roots.destination)
      .with_context(|| format!("failed to create {}", self.roots.destination.display()))?;
    let source_root = fs::canonicalize(&self.roots.source)
      .with_context(|| format!("failed to read {}", self.roots.source.display()))?;
    let destination_root = fs::canonicalize(&self.roots.destination)
      .with_context(|| format!("failed to read {}", self.roots.destination.display()))?;
    let roots = SiteRoots::new(&source_root, &destination_root);

    let mut state = RenderState {
      registry: ReferenceRegistry::new(self.config.on_conflict),
      digester: ContentDigester::new(),
      dependencies: DependencyGraph::default(),
      claims: BTreeSet::new(),
      classifier: self.config.classifier(),
    };

    let mut pages_rendered = 0;
    let mut files_copied = 0;

    let walker = WalkDir::new(&source_root)
      .sort_by_file_name()
      .into_iter()
      .filter_entry(|entry| !is_excluded(entry, &destination_root));
    for entry in walker {
      let entry = entry.with_context(|| format!("failed to walk {}", source_root.display()))?;
      if !entry.file_type().is_file() {
        continue;
      }

      let relative = entry.path().strip_prefix(&source_root)?;
      let url = relative_url(relative);
      let target = destination_root.join(relative);
      if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
          .with_context(|| format!("failed to create {}", parent.display()))?;
      }

      if entry.path().extension().is_some_and(|ext| ext == "html") {
        let text = fs::read_to_string(entry.path())
          .with_context(|| format!("failed to read {}", entry.path().display()))?;
        let rendered = render_page(&text, &url, &roots, self.mode, &mut state)
          .with_context(|| format!("failed to render {url}"))?;
        fs::write(&target, rendered)
          .with_context(|| format!("failed to write {}", target.display()))?;
        pages_rendered += 1;
      } else {
        install_asset(entry.path(), &target).with_context(|| {
          format!(
            "failed to copy {} to {}",
            entry.path().display(),
            target.display()
          )
        })?;
        files_copied += 1;
      }
    }

    for claim in &state.claims {
      claim.write();
    }
    info!(pages = pages_rendered, files = files_copied, "site written");

    let post_write = PostWritePipeline::new(&self.config, self.minifier)
      .run(self.mode, &state.registry, &destination_root)
      .context("post-write processing failed")?;

    for claim in &state.claims {
      if !claim.path.exists() {
        warn!(path = %claim.path.display(), "fingerprinted asset was never materialized");
      }
    }

    Ok(BuildReport {
      mode: self.mode,
      pages_rendered,
      files_copied,
      assets: state.registry,
      dependencies: state.dependencies,
      post_write,
    })
  }
}

fn is_excluded(entry: &DirEntry, destination: &Path) -> bool {
  if entry.depth() == 0 {
    return false;
  }
  let name = entry.file_name().to_string_lossy();
  name.starts_with('.')
    || entry.path() == destination
    || (entry.depth() == 1 && name == DEFAULT_CONFIG_FILE)
}

fn relative_url(relative: &Path) -> String {
  relative
    .components()
    .map(|component| component.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}

fn render_page(
  text: &str,
  page_url: &str,
  roots: &SiteRoots,
  mode: BuildMode,
  state: &mut RenderState,
) -> Result<String> {
  let mut output = String::with_capacity(text.len());
  let mut last = 0;

  for caps in tag_pattern().captures_iter(text) {
    let (Some(whole), Some(name), Some(url)) = (caps.get(0), caps.get(1), caps.get(2)) else {
      continue;
    };
    let name = TagName::parse(name.as_str())
      .ok_or_else(|| anyhow!("unknown asset tag `{}`", name.as_str()))?;
    let tag = name.build(url.as_str(), &state.classifier);

    let mut context = RenderContext {
      roots,
      page: Some(page_url),
      dependencies: &mut state.dependencies,
      claims: &mut state.claims,
    };
    let rendered = render_tag(
      tag.as_ref(),
      mode,
      &mut context,
      &mut state.registry,
      &mut state.digester,
    )?;
    debug!(page = page_url, tag = name.as_str(), url = tag.url(), "rendered asset tag");

    output.push_str(&text[last..whole.start()]);
    output.push_str(&rendered);
    last = whole.end();
  }
  output.push_str(&text[last..]);

  Ok(output)
}

/// Conventional destination: `_site` inside the source root.
pub fn default_destination(source: &Path) -> PathBuf {
  source.join("_site")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::ExternalMinifier;
  use std::time::Duration;
  use tempfile::tempdir;

  fn unused_minifier() -> ExternalMinifier {
    ExternalMinifier::new(Vec::new(), Vec::new(), Duration::from_secs(1))
  }

  #[test]
  fn development_build_copies_and_passes_urls_through() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    fs::create_dir_all(source.join("css")).unwrap();
    fs::create_dir_all(source.join(".git")).unwrap();
    fs::write(source.join(".git/HEAD"), "ref").unwrap();
    fs::write(source.join(DEFAULT_CONFIG_FILE), "{}").unwrap();
    fs::write(source.join("css/site.css"), "body{}").unwrap();
    fs::write(
      source.join("index.html"),
      "<link href=\"{% asset_url css/site.css %}\">\n{% asset_inline css/site.css %}\n",
    )
    .unwrap();

    let minifier = unused_minifier();
    let roots = SiteRoots::new(&source, default_destination(&source));
    let report = SiteBuild::new(roots, ProjectConfig::default(), BuildMode::Development, &minifier)
      .run()
      .unwrap();

    let dest = default_destination(&source);
    assert_eq!(report.pages_rendered, 1);
    assert_eq!(report.files_copied, 1);
    assert!(report.assets.is_empty());
    assert_eq!(
      fs::read_to_string(dest.join("index.html")).unwrap(),
      "<link href=\"css/site.css\">\n<link rel=\"stylesheet\" href=\"css/site.css\"/>\n"
    );
    assert!(dest.join("css/site.css").exists());
    assert!(!dest.join(".git").exists());
    assert!(!dest.join(DEFAULT_CONFIG_FILE).exists());
    assert!(!dest.join("_site").exists());
  }

  #[test]
  fn render_failure_names_the_page() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("src");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("about.html"), "{% asset_url missing.js %}").unwrap();

    let minifier = unused_minifier();
    let roots = SiteRoots::new(&source, dir.path().join("out"));
    let err = SiteBuild::new(roots, ProjectConfig::default(), BuildMode::Production, &minifier)
      .run()
      .unwrap_err();
    assert!(format!("{err:#}").contains("failed to render about.html"));
  }

  #[test]
  fn relative_url_uses_forward_slashes() {
    assert_eq!(relative_url(Path::new("blog/2024/post.html")), "blog/2024/post.html");
  }
}
