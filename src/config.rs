use std::fs;
use std::path::Path;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TreemapError;

pub const DEFAULT_API_URL: &str = "https://treemap-api1.nycgovparks.org/nmdapi/graphql";
pub const DEFAULT_IMAGE_URL_TEMPLATE: &str = "https://res.cloudinary.com/nycparks/image/upload/c_scale,w_auto/c_scale,w_auto/dpr_1.0/f_auto/q_auto:best/d_tree-map:species:defaulttmspecies.jpg/v1/tree-map/species/{photo_id}_tmspecies.png?_a=AJCihWI0";
pub const DEFAULT_SPECIES_PAGE_TEMPLATE: &str =
    "https://tree-map.nycgovparks.org/tree-map/species/{species_id}";
pub const DEFAULT_IMAGE_DIR: &str = "images";

const CONFIG_FILE_NAME: &str = "treemap.json";

/// On-disk shape of `treemap.json`; every key is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub image_url_template: Option<String>,
    #[serde(default)]
    pub species_page_template: Option<String>,
    #[serde(default)]
    pub image_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub image_url_template: String,
    pub species_page_template: String,
    pub image_dir: Utf8PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            image_url_template: DEFAULT_IMAGE_URL_TEMPLATE.to_string(),
            species_page_template: DEFAULT_SPECIES_PAGE_TEMPLATE.to_string(),
            image_dir: Utf8PathBuf::from(DEFAULT_IMAGE_DIR),
        }
    }
}

impl Settings {
    pub fn species_page_url(&self, species_id: impl std::fmt::Display) -> String {
        self.species_page_template
            .replace("{species_id}", &species_id.to_string())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads settings from `path`, or from `treemap.json` when present.
    pub fn resolve(path: Option<&str>) -> Result<Settings, TreemapError> {
        match path {
            Some(path) => Self::load(Path::new(path)),
            None => Ok(Self::discover(Path::new("."))),
        }
    }

    /// Reads `treemap.json` from `dir`. A missing or broken file means defaults.
    pub fn discover(dir: &Path) -> Settings {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Settings::default();
        }
        Self::load(&config_path).unwrap_or_else(|err| {
            warn!(error = %err, "ignoring {}, using default settings", config_path.display());
            Settings::default()
        })
    }

    fn load(config_path: &Path) -> Result<Settings, TreemapError> {
        let content = fs::read_to_string(config_path)
            .map_err(|_| TreemapError::ConfigRead(config_path.to_path_buf()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| TreemapError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> Settings {
        let defaults = Settings::default();
        Settings {
            api_url: config.api_url.unwrap_or(defaults.api_url),
            image_url_template: config
                .image_url_template
                .unwrap_or(defaults.image_url_template),
            species_page_template: config
                .species_page_template
                .unwrap_or(defaults.species_page_template),
            image_dir: config
                .image_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.image_dir),
        }
    }
}
