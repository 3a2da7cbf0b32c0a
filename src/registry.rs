//! Build-scoped map from original asset URLs to their fingerprinted URLs.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Behaviour when a URL is registered again with a different fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
  /// Abort with [`Error::DigestConflict`].
  #[default]
  Error,
  /// Keep the most recent fingerprint.
  Overwrite,
}

/// Registry of fingerprinted assets. One instance lives for exactly one build; the
/// render phase writes to it and the post-write phase only reads it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ReferenceRegistry {
  entries: BTreeMap<String, String>,
  #[serde(skip)]
  policy: ConflictPolicy,
}

impl ReferenceRegistry {
  /// Empty registry using the given conflict policy.
  pub fn new(policy: ConflictPolicy) -> Self {
    Self {
      entries: BTreeMap::new(),
      policy,
    }
  }

  /// Record `original -> fingerprinted`. Re-registering the same pair is a no-op.
  pub fn register(&mut self, original: &str, fingerprinted: &str) -> Result<()> {
    match self.entries.entry(original.to_string()) {
      Entry::Vacant(slot) => {
        slot.insert(fingerprinted.to_string());
      }
      Entry::Occupied(slot) if slot.get() == fingerprinted => {}
      Entry::Occupied(mut slot) => match self.policy {
        ConflictPolicy::Error => {
          return Err(Error::DigestConflict {
            url: original.to_string(),
            existing: slot.get().clone(),
            incoming: fingerprinted.to_string(),
          });
        }
        ConflictPolicy::Overwrite => {
          warn!(
            url = original,
            previous = %slot.get(),
            "asset content changed mid-build; keeping latest fingerprint"
          );
          slot.insert(fingerprinted.to_string());
        }
      },
    }
    Ok(())
  }

  /// Fingerprinted URL for `original`, if it was rendered in this build.
  pub fn lookup(&self, original: &str) -> Option<&str> {
    self.entries.get(original).map(String::as_str)
  }

  /// Visit every `(original, fingerprinted)` pair once.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .entries
      .iter()
      .map(|(original, fingerprinted)| (original.as_str(), fingerprinted.as_str()))
  }

  /// Number of registered assets.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// True when nothing was fingerprinted.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
