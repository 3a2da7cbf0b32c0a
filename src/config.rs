//! Project configuration loader describing asset kinds and minifier commands.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::kind::AssetClassifier;
use crate::mode::BuildMode;
use crate::registry::ConflictPolicy;

/// File name searched for in the site source root.
pub const DEFAULT_CONFIG_FILE: &str = "asset_stamp.json";

/// Placeholder replaced by the minifier input path.
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder replaced by the minifier output path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Discoverable configuration for fingerprinting and post-processing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Environment variable selecting the build mode.
    pub mode_env_var: String,
    /// Extensions (without dot) treated as scripts.
    pub script_extensions: Vec<String>,
    /// Extensions (without dot) treated as stylesheets.
    pub stylesheet_extensions: Vec<String>,
    /// Extensions copied through unchanged to their fingerprinted path.
    pub passthrough_extensions: Vec<String>,
    /// Script minifier argv with `{input}` / `{output}` placeholders.
    pub script_minifier: Vec<String>,
    /// Stylesheet minifier argv with `{input}` / `{output}` placeholders.
    pub stylesheet_minifier: Vec<String>,
    /// Seconds a minifier may run before the build is aborted.
    pub minifier_timeout_secs: u64,
    /// What to do when one URL is fingerprinted twice with different content.
    pub on_conflict: ConflictPolicy,
    /// Destination-relative file receiving the original -> fingerprinted map.
    pub manifest_file: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            mode_env_var: "SITE_ENV".into(),
            script_extensions: vec!["js".into()],
            stylesheet_extensions: vec!["css".into()],
            passthrough_extensions: [
                "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp", "woff",
                "woff2", "ttf", "otf", "eot", "mp4", "webm", "mp3", "ogg", "pdf", "json",
                "txt", "xml", "wasm",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            script_minifier: [
                "uglifyjs",
                "--compress",
                "--mangle",
                "--output",
                OUTPUT_PLACEHOLDER,
                INPUT_PLACEHOLDER,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            stylesheet_minifier: ["cleancss", "--output", OUTPUT_PLACEHOLDER, INPUT_PLACEHOLDER]
                .into_iter()
                .map(String::from)
                .collect(),
            minifier_timeout_secs: 60,
            on_conflict: ConflictPolicy::default(),
            manifest_file: None,
        }
    }
}

impl ProjectConfig {
    /// Load configuration from the provided site source root.
    ///
    /// A missing file yields defaults; a present but malformed file is an error.
    pub fn discover(source_root: &Path) -> Result<Self> {
        let candidate = source_root.join(DEFAULT_CONFIG_FILE);
        Ok(Self::from_path(&candidate)?.unwrap_or_default())
    }

    /// Read configuration from a specific JSON file, `None` when it does not exist.
    pub fn from_path(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io(path, err)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| Error::Config {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Mode selected by the configured environment variable.
    pub fn mode_from_env(&self) -> BuildMode {
        BuildMode::from_env(&self.mode_env_var)
    }

    /// Minifier timeout as a duration.
    pub fn minifier_timeout(&self) -> Duration {
        Duration::from_secs(self.minifier_timeout_secs)
    }

    /// Extension-based classifier built from this configuration.
    pub fn classifier(&self) -> AssetClassifier {
        AssetClassifier::new(
            &self.script_extensions,
            &self.stylesheet_extensions,
            &self.passthrough_extensions,
        )
    }
}
