#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod digest;
pub mod error;
mod filters;
pub mod host;
pub mod install;
pub mod kind;
pub mod mode;
pub mod pipeline;
pub mod registry;
pub mod site;
pub mod tag;

pub use config::ProjectConfig;
pub use digest::{ContentDigest, ContentDigester, digest_bytes, fingerprint_url};
pub use error::{Error, Result};
pub use host::{ClaimedOutput, DependencyGraph, DependencyTracker, RenderContext, SiteRoots};
pub use mode::BuildMode;
pub use pipeline::{ExternalMinifier, Minifier, PostWritePipeline, PostWriteSummary};
pub use registry::{ConflictPolicy, ReferenceRegistry};
pub use site::{BuildReport, SiteBuild};
pub use tag::{AssetTag, DirectReferenceTag, InlineReferenceTag, TagName, render_tag};
