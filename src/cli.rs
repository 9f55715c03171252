// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::config::ViewportConfig;
use crate::error::ConfigError;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "substation-viewport")]
#[command(about = "Substation 3D viewport", long_about = None)]
pub struct Cli {
    /// JSON viewport configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON tour script, replaces the built-in patrol route
    #[arg(long)]
    pub tour: Option<PathBuf>,

    /// Directory model urls resolve under
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Render through the post-processing composer
    #[arg(long, default_value = "false")]
    pub composers: bool,

    /// Ignore clicks instead of picking devices
    #[arg(long = "no-picking", default_value = "false")]
    pub no_picking: bool,

    /// Start the device highlight cycle with the viewport
    #[arg(long, default_value = "false")]
    pub warming: bool,

    /// Start the patrol tour once the viewport is up
    #[arg(long = "auto-tour", default_value = "false")]
    pub auto_tour: bool,

    /// Hide the label overlay
    #[arg(long = "no-labels", default_value = "false")]
    pub no_labels: bool,
}

impl Cli {
    /// Load the config file, if any, and apply the command-line overrides
    pub fn viewport_config(&self) -> Result<ViewportConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ViewportConfig::load(path)?,
            None => ViewportConfig::default(),
        };
        if let Some(tour) = &self.tour {
            config.tour = Some(tour.clone());
        }
        if let Some(assets) = &self.assets {
            config.asset_root = assets.clone();
        }
        if self.no_picking {
            config.flags.enable_picking = false;
        }
        if self.warming {
            config.flags.enable_warming_cycle = true;
        }
        if self.no_labels {
            config.labels.clear();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "substation-viewport",
            "--assets",
            "/srv/assets",
            "--no-picking",
            "--warming",
            "--no-labels",
        ]);
        let config = cli.viewport_config().unwrap();
        assert_eq!(config.asset_root, PathBuf::from("/srv/assets"));
        assert!(!config.flags.enable_picking);
        assert!(config.flags.enable_warming_cycle);
        assert!(config.labels.is_empty());
    }

    #[test]
    fn test_no_flags_keeps_defaults() {
        let cli = Cli::parse_from(["substation-viewport"]);
        assert!(!cli.composers);
        assert!(!cli.auto_tour);
        assert_eq!(cli.viewport_config().unwrap(), ViewportConfig::default());
    }
}
