//! Development vs production switch.

use serde::Serialize;

/// Value of the mode variable that turns on fingerprinting.
pub const PRODUCTION: &str = "production";

/// Which flavour of output a build produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
  /// Unhashed, unminified references for local iteration.
  #[default]
  Development,
  /// Fingerprinted, minified and inlined output.
  Production,
}

impl BuildMode {
  /// Read the mode from an environment variable. Anything other than
  /// `production` (including an unset variable) is development.
  pub fn from_env(var: &str) -> Self {
    Self::from_value(std::env::var(var).ok().as_deref())
  }

  /// Interpret a raw mode value.
  pub fn from_value(value: Option<&str>) -> Self {
    match value {
      Some(PRODUCTION) => Self::Production,
      _ => Self::Development,
    }
  }

  /// True when assets should be fingerprinted.
  pub fn is_production(self) -> bool {
    self == Self::Production
  }
}
