//! Configuration management for crimemap.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then environment variables.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "crimemap";

/// Default shapefile cache directory name.
const SHAPEFILE_DIR_NAME: &str = "shapefiles";

/// King County incident export.
const DEFAULT_INCIDENTS_URL: &str =
    "https://data.kingcounty.gov/api/views/4kmt-kfqf/rows.csv?accessType=DOWNLOAD";

/// Census 2020 cartographic boundary ZCTAs, 1:500k.
const DEFAULT_SHAPEFILE_URL: &str =
    "https://www2.census.gov/geo/tiger/GENZ2020/shp/cb_2020_us_zcta520_500k.zip";

const DEFAULT_SHAPEFILE_LAYER: &str = "cb_2020_us_zcta520_500k";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CRIMEMAP_`, `__` between levels)
/// 2. TOML config file at `~/.config/crimemap/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the source data comes from.
    pub sources: SourcesConfig,
    /// How raw incident rows are cleaned.
    pub cleaning: CleaningConfig,
    /// Dashboard server settings.
    pub dashboard: DashboardConfig,
    /// Choropleth styling.
    pub map: MapConfig,
}

/// Source data configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// URL of the incident CSV.
    pub incidents_url: String,
    /// URL of the zipped ZCTA shapefile.
    pub shapefile_url: String,
    /// Directory the shapefile archive is extracted into.
    /// Defaults to `~/.local/share/crimemap/shapefiles`
    pub shapefile_dir: Option<PathBuf>,
    /// Base name of the `.shp` file inside the archive.
    pub shapefile_layer: String,
    /// Skip TLS certificate verification for both downloads.
    pub accept_invalid_certs: bool,
    /// Request timeout in seconds. Unset means no timeout.
    pub timeout_secs: Option<u64>,
    /// User agent sent with downloads.
    pub user_agent: String,
}

/// Cleaning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Incidents strictly before midnight of this date are dropped.
    pub cutoff: NaiveDate,
    /// CSV column holding the ZIP code.
    pub zip_column: String,
    /// CSV column holding the NIBRS category name.
    pub category_column: String,
    /// CSV column holding the incident timestamp.
    pub timestamp_column: String,
    /// Shapefile attribute holding the ZCTA code.
    pub boundary_zip_field: String,
}

/// Dashboard server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Address to bind.
    pub bind_address: IpAddr,
    /// Port to bind.
    pub port: u16,
    /// Page heading.
    pub title: String,
    /// Category selected when the page first loads.
    pub default_category: String,
}

/// Choropleth styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Map center latitude.
    pub center_lat: f64,
    /// Map center longitude.
    pub center_lon: f64,
    /// Initial zoom level.
    pub zoom: f64,
    /// Fill opacity, 0 to 1.
    pub opacity: f64,
    /// Plotly continuous color scale name.
    pub color_scale: String,
    /// Figure height in pixels.
    pub height: u32,
    /// Boundary outline width.
    pub line_width: f64,
    /// Boundary outline color.
    pub line_color: String,
    /// Mapbox base style.
    pub style: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            incidents_url: DEFAULT_INCIDENTS_URL.to_string(),
            shapefile_url: DEFAULT_SHAPEFILE_URL.to_string(),
            shapefile_dir: None, // Will be resolved to default at runtime
            shapefile_layer: DEFAULT_SHAPEFILE_LAYER.to_string(),
            accept_invalid_certs: false,
            timeout_secs: None,
            user_agent: concat!("crimemap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            cutoff: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            zip_column: "zip".to_string(),
            category_column: "nibrs_code_name".to_string(),
            timestamp_column: "incident_datetime".to_string(),
            boundary_zip_field: "ZCTA5CE20".to_string(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([127, 0, 0, 1]),
            port: 8051,
            title: "King County Crime Map by ZIP Code".to_string(),
            default_category: "LARCENY/THEFT".to_string(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: 47.5,
            center_lon: -122.1,
            zoom: 7.0,
            opacity: 0.6,
            color_scale: "Reds".to_string(),
            height: 600,
            line_width: 1.5,
            line_color: "black".to_string(),
            style: "open-street-map".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("CRIMEMAP_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("incidents_url", &self.sources.incidents_url),
            ("shapefile_url", &self.sources.shapefile_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be an http(s) URL, got '{url}'"),
                });
            }
        }

        if self.sources.shapefile_layer.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "shapefile_layer must not be empty".to_string(),
            });
        }

        if self.sources.timeout_secs == Some(0) {
            return Err(Error::ConfigValidation {
                message: "timeout_secs must be greater than 0 when set".to_string(),
            });
        }

        for (name, column) in [
            ("zip_column", &self.cleaning.zip_column),
            ("category_column", &self.cleaning.category_column),
            ("timestamp_column", &self.cleaning.timestamp_column),
            ("boundary_zip_field", &self.cleaning.boundary_zip_field),
        ] {
            if column.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must not be empty"),
                });
            }
        }

        if self.dashboard.port == 0 {
            return Err(Error::ConfigValidation {
                message: "port must be greater than 0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.map.opacity) {
            return Err(Error::ConfigValidation {
                message: format!("opacity ({}) must be between 0 and 1", self.map.opacity),
            });
        }

        if !(0.0..=22.0).contains(&self.map.zoom) {
            return Err(Error::ConfigValidation {
                message: format!("zoom ({}) must be between 0 and 22", self.map.zoom),
            });
        }

        if !(-90.0..=90.0).contains(&self.map.center_lat)
            || !(-180.0..=180.0).contains(&self.map.center_lon)
        {
            return Err(Error::ConfigValidation {
                message: "map center is outside valid latitude/longitude range".to_string(),
            });
        }

        if self.map.height == 0 {
            return Err(Error::ConfigValidation {
                message: "height must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the shapefile cache directory, resolving defaults if not set.
    #[must_use]
    pub fn shapefile_dir(&self) -> PathBuf {
        self.sources
            .shapefile_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SHAPEFILE_DIR_NAME))
    }

    /// Get the path of the `.shp` file inside the cache directory.
    #[must_use]
    pub fn shapefile_path(&self) -> PathBuf {
        self.shapefile_dir()
            .join(format!("{}.shp", self.sources.shapefile_layer))
    }

    /// Get the request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.sources.timeout_secs.map(Duration::from_secs)
    }

    /// Get the socket address the dashboard binds to.
    #[must_use]
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.dashboard.bind_address, self.dashboard.port)
    }
}
