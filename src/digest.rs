//! Content digests and the fingerprinted names derived from them.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use sha2::{Digest as _, Sha256};

use crate::error::{Error, Result};
use crate::kind::{extension_start, split_suffix};

/// Number of hex characters kept from the SHA-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Fixed-length lowercase hex identifier of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentDigest(String);

impl ContentDigest {
  /// Hex string form.
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ContentDigest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Digest raw bytes.
pub fn digest_bytes(content: &[u8]) -> ContentDigest {
  let hash = Sha256::digest(content);
  let mut hex = format!("{hash:x}");
  hex.truncate(DIGEST_LEN);
  ContentDigest(hex)
}

/// Reads and digests files, remembering results by path and modification time.
#[derive(Debug, Default)]
pub struct ContentDigester {
  cache: HashMap<PathBuf, (SystemTime, ContentDigest)>,
}

impl ContentDigester {
  /// Create a digester with an empty cache.
  pub fn new() -> Self {
    Self::default()
  }

  /// Digest the file at `path`. A missing file is [`Error::MissingSource`].
  pub fn digest(&mut self, path: &Path) -> Result<ContentDigest> {
    let modified = fs::metadata(path)
      .and_then(|meta| meta.modified())
      .map_err(|err| Error::io(path, err))?;

    if let Some((cached_at, digest)) = self.cache.get(path) {
      if *cached_at == modified {
        return Ok(digest.clone());
      }
    }

    let content = fs::read(path).map_err(|err| Error::io(path, err))?;
    let digest = digest_bytes(&content);
    self
      .cache
      .insert(path.to_path_buf(), (modified, digest.clone()));
    Ok(digest)
  }
}

/// Insert `-{digest}` before the last extension of `url`'s final segment.
///
/// `app.min.js` becomes `app.min-{digest}.js`; any `?query` or `#fragment` stays at the end.
/// Returns `None` when there is no extension to anchor on.
pub fn fingerprint_url(url: &str, digest: &ContentDigest) -> Option<String> {
  let (path, suffix) = split_suffix(url);
  let dot = extension_start(path)?;
  Some(format!(
    "{}-{}{}{}",
    &path[..dot],
    digest,
    &path[dot..],
    suffix
  ))
}

/// Filesystem counterpart of [`fingerprint_url`]: a sibling of `path`.
pub fn fingerprint_path(path: &Path, digest: &ContentDigest) -> Option<PathBuf> {
  let name = path.file_name()?.to_str()?;
  let dot = extension_start(name)?;
  let stamped = format!("{}-{}{}", &name[..dot], digest, &name[dot..]);
  Some(path.with_file_name(stamped))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn fixed(hex: &str) -> ContentDigest {
    ContentDigest(hex.to_string())
  }

  #[test]
  fn digest_is_deterministic_and_content_sensitive() {
    let first = digest_bytes(b"body { color: red; }");
    let second = digest_bytes(b"body { color: red; }");
    let other = digest_bytes(b"body { color: blue; }");

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert_eq!(first.as_str().len(), DIGEST_LEN);
    assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
  }

  #[test]
  fn inserts_digest_before_last_extension() {
    let digest = fixed("ab12ef");
    assert_eq!(fingerprint_url("app.js", &digest).unwrap(), "app-ab12ef.js");
    assert_eq!(fingerprint_url("app.min.js", &digest).unwrap(), "app.min-ab12ef.js");
    assert_eq!(
      fingerprint_url("/assets/v1.2/site.css", &digest).unwrap(),
      "/assets/v1.2/site-ab12ef.css"
    );
    assert_eq!(
      fingerprint_url("fonts/icons.woff?#iefix", &digest).unwrap(),
      "fonts/icons-ab12ef.woff?#iefix"
    );
  }

  #[test]
  fn urls_without_extension_are_not_fingerprinted() {
    let digest = fixed("ab12ef");
    assert_eq!(fingerprint_url("LICENSE", &digest), None);
    assert_eq!(fingerprint_url("dir.d/run", &digest), None);
    assert_eq!(fingerprint_url(".htaccess", &digest), None);
  }

  #[test]
  fn fingerprint_path_stays_in_same_directory() {
    let digest = fixed("cafe01");
    let stamped = fingerprint_path(Path::new("/site/css/img/logo.png"), &digest).unwrap();
    assert_eq!(stamped, Path::new("/site/css/img/logo-cafe01.png"));
  }

  #[test]
  fn digester_reads_files_and_reports_missing_ones() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("app.js");
    fs::write(&file, "console.log(1)").unwrap();

    let mut digester = ContentDigester::new();
    let digest = digester.digest(&file).unwrap();
    assert_eq!(digest, digest_bytes(b"console.log(1)"));
    assert_eq!(digester.digest(&file).unwrap(), digest);

    let err = digester.digest(&dir.path().join("missing.js")).unwrap_err();
    assert!(matches!(err, Error::MissingSource { .. }));
  }
}
