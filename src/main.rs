//! Command line entry point.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use asset_stamp::config::DEFAULT_CONFIG_FILE;
use asset_stamp::{
  BuildMode, ContentDigester, ExternalMinifier, ProjectConfig, SiteBuild, SiteRoots,
  fingerprint_url,
};

/// Fingerprint, rewrite and inline static site assets.
#[derive(Parser, Debug)]
#[command(name = "asset-stamp", version)]
struct Cli {
  /// Verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Render the site and run the post-write pipeline.
  Build {
    /// Site source directory.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    source: PathBuf,

    /// Output directory, `<source>/_site` by default.
    #[arg(short, long, value_name = "DIR")]
    destination: Option<PathBuf>,

    /// Configuration file, `<source>/asset_stamp.json` by default.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Force production mode regardless of the environment.
    #[arg(long)]
    production: bool,

    /// Write a JSON build report to this file.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
  },

  /// Print the digest and fingerprinted name of files.
  Digest {
    /// Files to digest.
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  setup_tracing(cli.verbose);

  match cli.command {
    Command::Build {
      source,
      destination,
      config,
      production,
      report,
    } => build(source, destination, config, production, report),
    Command::Digest { files } => digest(&files),
  }
}

fn setup_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn build(
  source: PathBuf,
  destination: Option<PathBuf>,
  config_path: Option<PathBuf>,
  production: bool,
  report: Option<PathBuf>,
) -> Result<()> {
  let config = match &config_path {
    Some(path) => ProjectConfig::from_path(path)?
      .with_context(|| format!("config file {} does not exist", path.display()))?,
    None => ProjectConfig::discover(&source)?,
  };
  let mode = if production {
    BuildMode::Production
  } else {
    config.mode_from_env()
  };
  let destination = destination.unwrap_or_else(|| asset_stamp::site::default_destination(&source));

  let config_label = config_path
    .as_deref()
    .map_or_else(|| DEFAULT_CONFIG_FILE.to_string(), |path| path.display().to_string());
  info!(
    source = %source.display(),
    destination = %destination.display(),
    ?mode,
    config = %config_label,
    "building site"
  );

  let minifier = ExternalMinifier::from_config(&config);
  let result = SiteBuild::new(SiteRoots::new(source, destination), config, mode, &minifier).run()?;

  if let Some(path) = report {
    let json = serde_json::to_string_pretty(&result)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
  }

  info!(
    assets = result.assets.len(),
    pages = result.pages_rendered,
    "build finished"
  );
  Ok(())
}

fn digest(files: &[PathBuf]) -> Result<()> {
  let mut digester = ContentDigester::new();
  for file in files {
    let digest = digester.digest(file)?;
    let name = file.to_string_lossy();
    let stamped = fingerprint_url(&name, &digest).unwrap_or_else(|| name.to_string());
    println!("{digest}  {stamped}");
  }
  Ok(())
}
