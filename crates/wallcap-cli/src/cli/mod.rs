//! CLI for wallcap.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use wallcap_core::config::{self, WallcapConfig};
use wallcap_core::convert::{ConversionStrategy, ImageEncoding};
use wallcap_core::url_model::Destination;

use commands::{run_config_path, run_grab};

/// Top-level CLI for wallcap.
#[derive(Debug, Parser)]
#[command(name = "wallcap")]
#[command(about = "wallcap: capture wallpapers through an instrumented browser", long_about = None)]
pub struct Cli {
    /// Load this config file instead of ~/.config/wallcap/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Open the source page, pick a photo from its API response and save it.
    Grab(GrabArgs),

    /// Print the location of the config file.
    ConfigPath,
}

/// Options for `grab`. Every flag overrides the matching config value.
#[derive(Debug, Default, Args)]
pub struct GrabArgs {
    /// Page to capture from; repeat for several downloads over one connection.
    #[arg(short = 's', long = "source-url", value_name = "URL")]
    pub source_url: Vec<String>,

    /// Photo stream to retrieve (e.g. popular, fresh_today, editors).
    #[arg(short = 'f', long)]
    pub feature: Option<String>,

    /// Only request photos of this category.
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Minimum photo width in pixels.
    #[arg(short = 'w', long)]
    pub width: Option<u32>,

    /// Minimum photo height in pixels.
    #[arg(short = 'H', long)]
    pub height: Option<u32>,

    /// Only accept landscape photos.
    #[arg(short = 'l', long)]
    pub landscape: bool,

    /// Photos must score strictly above this.
    #[arg(long, value_name = "SCORE")]
    pub min_score: Option<f64>,

    /// Image size requested from the API (default: 2048, or 4096 for larger minimums).
    #[arg(long, value_name = "N")]
    pub image_size: Option<u32>,

    /// Output file (extension added if missing) or existing directory.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output encoding: jpeg or png.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<ImageEncoding>,

    /// Re-encode inside the page instead of natively.
    #[arg(long)]
    pub in_page: bool,

    /// Attach to a running browser (http://host:port or ws://...) instead of launching one.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,
}

impl GrabArgs {
    /// Applies the flags on top of `cfg`.
    pub fn apply(&self, cfg: &mut WallcapConfig) {
        if let Some(feature) = &self.feature {
            cfg.capture.feature = Some(feature.clone());
        }
        if let Some(category) = &self.category {
            cfg.capture.category = Some(category.clone());
        }
        if let Some(width) = self.width {
            cfg.selection.min_width = width;
        }
        if let Some(height) = self.height {
            cfg.selection.min_height = height;
        }
        if self.landscape {
            cfg.selection.landscape_required = true;
        }
        if let Some(score) = self.min_score {
            cfg.selection.min_score = Some(score);
        }
        if let Some(size) = self.image_size {
            cfg.capture.image_size = Some(size);
        }
        if let Some(format) = self.format {
            cfg.capture.output_format = format;
        }
        if self.in_page {
            cfg.capture.conversion = ConversionStrategy::InPage;
        }
        if let Some(endpoint) = &self.endpoint {
            cfg.browser.endpoint = Some(endpoint.clone());
        }
    }

    /// Source pages to capture from, in order.
    pub fn sources(&self, cfg: &WallcapConfig) -> Vec<String> {
        if self.source_url.is_empty() {
            vec![cfg.capture.source_url.clone()]
        } else {
            self.source_url.clone()
        }
    }
}

/// Destination of download `index` out of `total`. Several downloads into
/// one output file get a `-N` suffix each.
pub fn destination_for(output: Option<&Path>, index: usize, total: usize) -> Destination {
    let Some(path) = output else {
        return Destination::Directory(PathBuf::from("."));
    };
    if path.is_dir() {
        return Destination::Directory(path.to_path_buf());
    }
    if total <= 1 {
        return Destination::File(path.to_path_buf());
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wallpaper".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, index + 1, ext.to_string_lossy()),
        None => format!("{}-{}", stem, index + 1),
    };
    Destination::File(path.with_file_name(name))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Grab(args) => {
                let cfg = load_config(cli.config.as_deref())?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_grab(cfg, &args).await?;
            }
            CliCommand::ConfigPath => run_config_path(cli.config.as_deref())?,
        }

        Ok(())
    }
}

fn load_config(path: Option<&Path>) -> Result<WallcapConfig> {
    match path {
        Some(path) => config::load_from(path),
        None => config::load_or_init(),
    }
}

#[cfg(test)]
mod tests;
