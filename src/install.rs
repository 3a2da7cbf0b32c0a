//! Placing byte-identical copies of assets in the output tree.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// Make `destination` hold the bytes of `source`.
///
/// Any existing destination is unlinked first, so the copy always lands in a fresh file and
/// never writes through a hard link left by an earlier build. Errors name the path they
/// happened at: a missing `source` is [`Error::MissingSource`], everything after that is
/// reported against `destination` or its parent directory.
pub fn install_asset(source: &Path, destination: &Path) -> Result<()> {
  if !source.is_file() {
    return Err(Error::MissingSource {
      path: source.to_path_buf(),
    });
  }

  match fs::remove_file(destination) {
    Ok(()) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => return Err(Error::io(destination, err)),
  }

  if let Some(parent) = destination.parent() {
    fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
  }

  fs::copy(source, destination)
    .map(|_| ())
    .map_err(|err| Error::io(destination, err))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn install_is_repeatable() -> Result<()> {
    let temp = tempdir().unwrap();
    let source = temp.path().join("logo.png");
    fs::write(&source, b"png").unwrap();
    let destination = temp.path().join("img/logo-cafe01.png");

    install_asset(&source, &destination)?;
    assert_eq!(fs::read(&destination).unwrap(), b"png");

    install_asset(&source, &destination)?;
    assert_eq!(fs::read(&destination).unwrap(), b"png");

    Ok(())
  }

  #[test]
  fn install_replaces_stale_destination() -> Result<()> {
    let temp = tempdir().unwrap();
    let source = temp.path().join("a.txt");
    let destination = temp.path().join("a-1.txt");
    fs::write(&source, b"new").unwrap();
    fs::write(&destination, b"old").unwrap();

    install_asset(&source, &destination)?;
    assert_eq!(fs::read(&destination).unwrap(), b"new");
    Ok(())
  }

  #[test]
  fn later_source_writes_do_not_reach_the_installed_copy() -> Result<()> {
    let temp = tempdir().unwrap();
    let source = temp.path().join("logo.png");
    let destination = temp.path().join("logo-aaaa.png");
    fs::write(&source, b"AAAA").unwrap();

    install_asset(&source, &destination)?;
    fs::write(&source, b"BBBB").unwrap();

    assert_eq!(fs::read(&destination).unwrap(), b"AAAA");
    Ok(())
  }

  #[test]
  fn linked_destination_is_unlinked_before_copying() -> Result<()> {
    let temp = tempdir().unwrap();
    let shared = temp.path().join("logo-aaaa.png");
    let destination = temp.path().join("logo.png");
    let source = temp.path().join("incoming.png");
    fs::write(&shared, b"AAAA").unwrap();
    fs::hard_link(&shared, &destination).unwrap();
    fs::write(&source, b"BBBB").unwrap();

    install_asset(&source, &destination)?;

    assert_eq!(fs::read(&destination).unwrap(), b"BBBB");
    assert_eq!(fs::read(&shared).unwrap(), b"AAAA");
    Ok(())
  }

  #[test]
  fn missing_source_names_the_source() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("nope.png");
    let err = install_asset(&source, &temp.path().join("x.png")).unwrap_err();
    assert!(matches!(err, Error::MissingSource { ref path } if *path == source));
  }

  #[cfg(unix)]
  #[test]
  fn destination_failure_names_the_destination() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("logo.png");
    fs::write(&source, b"png").unwrap();
    let blocker = temp.path().join("img");
    fs::write(&blocker, b"not a directory").unwrap();

    let destination = blocker.join("logo-1.png");
    let err = install_asset(&source, &destination).unwrap_err();
    assert!(matches!(err, Error::Io { ref path, .. } if *path == destination));
  }
}
