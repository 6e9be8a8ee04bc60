//! The immutable dataset the dashboard serves.
//!
//! A [`Snapshot`] is assembled once at startup from the downloaded sources and
//! is read-only afterwards. Request handlers share it behind an `Arc`.

use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use crate::acquire::{self, Fetcher};
use crate::boundary::{self, Boundary};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::incident::{self, Incident, ZipCode};
use crate::options::Options;

/// Cleaned incidents, their boundaries, and the derived dropdown options.
#[derive(Debug)]
pub struct Snapshot {
    incidents: Vec<Incident>,
    boundaries: Vec<Boundary>,
    geojson: serde_json::Value,
    options: Options,
}

/// Row counts reported by `crimemap summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    /// Number of cleaned incidents.
    pub incidents: usize,
    /// Number of distinct incident ZIP codes.
    pub zip_codes: usize,
    /// Number of boundaries retained for rendering.
    pub boundaries: usize,
    /// Dropdown options and defaults.
    pub options: Options,
}

impl Snapshot {
    /// Assemble a snapshot from cleaned incidents and all loaded boundaries.
    ///
    /// Boundaries whose ZIP never occurs in `incidents` are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDataset`] if there are no incidents.
    pub fn new(
        incidents: Vec<Incident>,
        boundaries: Vec<Boundary>,
        preferred_category: &str,
    ) -> Result<Self> {
        let options = Options::derive(&incidents, preferred_category)?;
        let observed = observed_zips(&incidents);
        let boundaries = boundary::retain_observed(boundaries, &observed);
        let geojson = boundary::feature_collection(&boundaries);

        Ok(Self {
            incidents,
            boundaries,
            geojson,
            options,
        })
    }

    /// Download, clean, and join the configured sources.
    ///
    /// # Errors
    ///
    /// Returns an error if either download fails, the CSV or shapefile
    /// cannot be read, or no incidents survive cleaning.
    pub async fn load(config: &Config, fetcher: &dyn Fetcher) -> Result<Self> {
        let csv = acquire::fetch_incidents(fetcher, &config.sources.incidents_url).await?;
        let cleaning = config.cleaning.clone();
        let incidents = blocking(move || incident::clean(csv.as_slice(), &cleaning)).await?;
        info!(count = incidents.len(), "Loaded incidents");

        let dir = config.shapefile_dir();
        acquire::ensure_shapefile(fetcher, &config.sources.shapefile_url, &dir).await?;

        let path = config.shapefile_path();
        let zip_field = config.cleaning.boundary_zip_field.clone();
        let boundaries = blocking(move || boundary::load_boundaries(&path, &zip_field)).await?;
        info!(count = boundaries.len(), "Loaded boundaries");

        Self::new(incidents, boundaries, &config.dashboard.default_category)
    }

    /// All cleaned incidents.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Boundaries retained for rendering.
    #[must_use]
    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Retained boundaries as a GeoJSON `FeatureCollection`.
    #[must_use]
    pub fn geojson(&self) -> &serde_json::Value {
        &self.geojson
    }

    /// Dropdown options and defaults.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Summarize the snapshot.
    #[must_use]
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            incidents: self.incidents.len(),
            zip_codes: observed_zips(&self.incidents).len(),
            boundaries: self.boundaries.len(),
            options: self.options.clone(),
        }
    }
}

/// The distinct ZIP codes in a set of incidents.
#[must_use]
pub fn observed_zips(incidents: &[Incident]) -> HashSet<ZipCode> {
    incidents.iter().map(|i| i.zip.clone()).collect()
}

/// Run blocking work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("blocking task failed: {e}")))?
}
