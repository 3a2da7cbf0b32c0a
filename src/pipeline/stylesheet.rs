//! Pass B: point `url()` references inside fingerprinted stylesheets at fingerprinted copies.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::digest::{ContentDigester, fingerprint_path, fingerprint_url};
use crate::error::{Error, Result};
use crate::filters::should_ignore_stylesheet_reference;
use crate::host::join_url;
use crate::install::install_asset;
use crate::kind::{AssetClassifier, AssetKind, split_suffix};
use crate::registry::ReferenceRegistry;

fn url_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(
      r#"url\((?P<lead>\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^"'()\s][^()\s]*))(?P<trail>\s*)\)"#,
    )
    .expect("invalid url() regex")
  })
}

/// One stylesheet after its references were rewritten.
#[derive(Debug)]
pub struct RewrittenStylesheet {
  /// Stylesheet text with fingerprinted references.
  pub text: String,
  /// `(original, fingerprinted)` image paths to copy, in document order.
  pub copies: Vec<(PathBuf, PathBuf)>,
}

/// Rewrite every `url()` in `text`, resolving relative references against `stylesheet_dir`
/// and root-relative ones against `destination`. Quoting and inner whitespace are kept.
pub fn rewrite_stylesheet_urls(
  text: &str,
  stylesheet_dir: &Path,
  destination: &Path,
  digester: &mut ContentDigester,
) -> Result<RewrittenStylesheet> {
  let mut rewritten = String::with_capacity(text.len());
  let mut copies = Vec::new();
  let mut last = 0;

  for caps in url_pattern().captures_iter(text) {
    let Some(whole) = caps.get(0) else {
      continue;
    };
    rewritten.push_str(&text[last..whole.start()]);
    last = whole.end();

    let (quote, body) = reference_body(&caps);
    match fingerprint_reference(body, stylesheet_dir, destination, digester)? {
      Some((url, source, target)) => {
        let lead = caps.name("lead").map_or("", |m| m.as_str());
        let trail = caps.name("trail").map_or("", |m| m.as_str());
        rewritten.push_str(&format!("url({lead}{quote}{url}{quote}{trail})"));
        copies.push((source, target));
      }
      None => rewritten.push_str(whole.as_str()),
    }
  }
  rewritten.push_str(&text[last..]);

  Ok(RewrittenStylesheet {
    text: rewritten,
    copies,
  })
}

fn reference_body<'t>(caps: &Captures<'t>) -> (&'static str, &'t str) {
  if let Some(body) = caps.name("dq") {
    ("\"", body.as_str())
  } else if let Some(body) = caps.name("sq") {
    ("'", body.as_str())
  } else {
    ("", caps.name("bare").map_or("", |m| m.as_str()))
  }
}

fn fingerprint_reference(
  body: &str,
  stylesheet_dir: &Path,
  destination: &Path,
  digester: &mut ContentDigester,
) -> Result<Option<(String, PathBuf, PathBuf)>> {
  if should_ignore_stylesheet_reference(body) {
    return Ok(None);
  }

  let (path, _) = split_suffix(body);
  let source = if path.starts_with('/') {
    join_url(destination, path)
  } else {
    join_url(stylesheet_dir, path)
  };

  let digest = digester.digest(&source)?;
  let (Some(url), Some(target)) = (
    fingerprint_url(body, &digest),
    fingerprint_path(&source, &digest),
  ) else {
    debug!(reference = body, "stylesheet reference has no extension, left as is");
    return Ok(None);
  };

  Ok(Some((url, source, target)))
}

/// Rewrite every fingerprinted stylesheet in place and copy the images it references.
/// Returns the number of image references rewritten.
pub fn rewrite_stylesheets(
  registry: &ReferenceRegistry,
  destination: &Path,
  classifier: &AssetClassifier,
) -> Result<usize> {
  let mut digester = ContentDigester::new();
  let mut rewritten_refs = 0;

  for (original, fingerprinted) in registry.iter() {
    if classifier.classify(original) != AssetKind::Stylesheet {
      continue;
    }

    let stylesheet_path = join_url(destination, fingerprinted);
    let stylesheet_dir = stylesheet_path
      .parent()
      .map_or_else(|| destination.to_path_buf(), Path::to_path_buf);

    let text =
      fs::read_to_string(&stylesheet_path).map_err(|err| Error::io(&stylesheet_path, err))?;
    let result = rewrite_stylesheet_urls(&text, &stylesheet_dir, destination, &mut digester)?;

    fs::write(&stylesheet_path, &result.text).map_err(|err| Error::io(&stylesheet_path, err))?;

    for (source, target) in &result.copies {
      debug!(source = %source.display(), target = %target.display(), "image asset");
      install_asset(source, target)?;
    }
    rewritten_refs += result.copies.len();
  }

  Ok(rewritten_refs)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::digest::digest_bytes;
  use tempfile::tempdir;

  #[test]
  fn preserves_quoting_and_whitespace() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("logo.png"), b"logo").unwrap();
    let digest = digest_bytes(b"logo");

    let css = "a{background:url('logo.png')}\nb{background:url( \"logo.png\" )}\nc{background:url(logo.png)}";
    let result =
      rewrite_stylesheet_urls(css, dir.path(), dir.path(), &mut ContentDigester::new()).unwrap();

    assert_eq!(
      result.text,
      format!(
        "a{{background:url('logo-{digest}.png')}}\nb{{background:url( \"logo-{digest}.png\" )}}\nc{{background:url(logo-{digest}.png)}}"
      )
    );
    assert_eq!(result.copies.len(), 3);
    assert!(result.copies.iter().all(|(_, target)| *target == dir.path().join(format!("logo-{digest}.png"))));
  }

  #[test]
  fn leaves_external_references_untouched() {
    let dir = tempdir().unwrap();
    let css = "a{background:url(data:image/png;base64,AAAA)} b{src:url(\"https://x.test/f.woff\")} c{fill:url(#g)} d{x:url()}";
    let result =
      rewrite_stylesheet_urls(css, dir.path(), dir.path(), &mut ContentDigester::new()).unwrap();
    assert_eq!(result.text, css);
    assert!(result.copies.is_empty());
  }

  #[test]
  fn resolves_relative_and_root_paths() {
    let dir = tempdir().unwrap();
    let dest = dir.path();
    fs::create_dir_all(dest.join("css")).unwrap();
    fs::create_dir_all(dest.join("img")).unwrap();
    fs::write(dest.join("img/bg.jpg"), b"bg").unwrap();
    let digest = digest_bytes(b"bg");

    let css = "a{background:url(../img/bg.jpg?v=1)} b{background:url(/img/bg.jpg)}";
    let result =
      rewrite_stylesheet_urls(css, &dest.join("css"), dest, &mut ContentDigester::new()).unwrap();

    assert_eq!(
      result.text,
      format!("a{{background:url(../img/bg-{digest}.jpg?v=1)}} b{{background:url(/img/bg-{digest}.jpg)}}")
    );
    assert_eq!(fs::canonicalize(&result.copies[0].0).unwrap(), fs::canonicalize(dest.join("img/bg.jpg")).unwrap());
    assert_eq!(result.copies[1].1, dest.join(format!("img/bg-{digest}.jpg")));
  }

  #[test]
  fn missing_image_is_fatal() {
    let dir = tempdir().unwrap();
    let err = rewrite_stylesheet_urls(
      "a{background:url(gone.png)}",
      dir.path(),
      dir.path(),
      &mut ContentDigester::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingSource { .. }));
  }

  #[test]
  fn rewrites_fingerprinted_stylesheet_and_copies_images() {
    let dir = tempdir().unwrap();
    let dest = dir.path();
    fs::write(dest.join("logo.png"), b"logo").unwrap();
    fs::write(dest.join("style-1.css"), "h1{background: url('logo.png')}").unwrap();
    let digest = digest_bytes(b"logo");

    let mut registry = ReferenceRegistry::default();
    registry.register("style.css", "style-1.css").unwrap();
    registry.register("app.js", "app-2.js").unwrap();
    let classifier = AssetClassifier::new(&["js".into()], &["css".into()], &[]);

    let count = rewrite_stylesheets(&registry, dest, &classifier).unwrap();
    assert_eq!(count, 1);
    assert_eq!(
      fs::read_to_string(dest.join("style-1.css")).unwrap(),
      format!("h1{{background: url('logo-{digest}.png')}}")
    );
    assert_eq!(fs::read(dest.join(format!("logo-{digest}.png"))).unwrap(), b"logo");
  }
}
