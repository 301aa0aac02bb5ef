use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use icy_tile_engine::{ColorRgba32, Palette, PaletteRef};

fn default_log_spec() -> String {
    "info".to_string()
}

fn default_png_scale() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Options {
    /// flexi_logger spec used when RUST_LOG is not set
    #[serde(default = "default_log_spec")]
    pub log_spec: String,

    /// Integer upscaling applied to PNG exports
    #[serde(default = "default_png_scale")]
    pub png_scale: u32,

    /// Fallback palette for elements that name none, as `#rrggbb` or `#rrggbbaa`
    #[serde(default)]
    pub default_palette: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            log_spec: default_log_spec(),
            png_scale: default_png_scale(),
            default_palette: Vec::new(),
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "GitHub", "icy_tile").map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

impl Options {
    pub fn load_options() -> Self {
        let Some(config_dir) = get_config_dir() else {
            return Self::default();
        };
        if !config_dir.exists() && fs::create_dir_all(&config_dir).is_err() {
            log::error!("Can't create configuration directory {}", config_dir.display());
            return Self::default();
        }
        let options_file = config_dir.join("options.toml");
        if !options_file.exists() {
            let options = Self::default();
            options.store_options();
            return options;
        }
        match fs::read_to_string(&options_file) {
            Ok(txt) => match toml::from_str(&txt) {
                Ok(options) => return options,
                Err(err) => log::warn!("Error parsing options file, using defaults: {err}"),
            },
            Err(err) => log::warn!("Error reading options file: {err}"),
        }
        Self::default()
    }

    pub fn store_options(&self) {
        let Some(config_dir) = get_config_dir() else {
            return;
        };
        let file_name = config_dir.join("options.toml");
        match toml::to_string(self) {
            Ok(text) => {
                if let Err(err) = fs::write(file_name, text) {
                    log::error!("Error writing options file: {err}");
                }
            }
            Err(err) => log::error!("Error writing options file: {err}"),
        }
    }

    /// Palette built from `default_palette`, if one is configured.
    pub fn default_palette(&self) -> Option<PaletteRef> {
        if self.default_palette.is_empty() {
            return None;
        }
        let colors: Result<Vec<ColorRgba32>, _> = self.default_palette.iter().map(|hex| ColorRgba32::from_hex(hex)).collect();
        match colors.and_then(|colors| Palette::from_colors("Default", colors, true)) {
            Ok(palette) => Some(palette.into_ref()),
            Err(err) => {
                log::warn!("Ignoring configured default palette: {err}");
                None
            }
        }
    }
}
