//! `crimemap` - Crime incidents by ZIP code
//!
//! This library downloads a crime incident dataset and ZIP code tabulation
//! area boundaries, cleans and joins them, and serves a choropleth dashboard
//! with monthly and hourly trend charts.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod acquire;
pub mod boundary;
pub mod cli;
pub mod config;
pub mod error;
pub mod figure;
pub mod incident;
pub mod logging;
pub mod options;
pub mod server;
pub mod snapshot;
pub mod views;

pub use acquire::{Fetcher, HttpFetcher};
pub use boundary::Boundary;
pub use config::Config;
pub use error::{Error, Result};
pub use incident::{Incident, MonthYear, ZipCode};
pub use logging::init_logging;
pub use options::Options;
pub use snapshot::{Snapshot, SnapshotSummary};
