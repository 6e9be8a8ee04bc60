//! Dropdown options and default selections.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::incident::{Incident, MonthYear};

/// The values offered by the two dashboard dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    /// Distinct categories, sorted lexicographically.
    pub categories: Vec<String>,
    /// Distinct month buckets, sorted chronologically.
    pub months: Vec<MonthYear>,
    /// Category selected on first load.
    pub default_category: String,
    /// Month selected on first load (the earliest month).
    pub default_month: MonthYear,
}

impl Options {
    /// Derive options from cleaned incidents.
    ///
    /// `preferred_category` becomes the default when it occurs in the data;
    /// otherwise the first category is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDataset`] when there are no incidents.
    pub fn derive(incidents: &[Incident], preferred_category: &str) -> Result<Self> {
        let categories: Vec<String> = incidents
            .iter()
            .map(|i| i.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let months: Vec<MonthYear> = incidents
            .iter()
            .map(|i| i.month)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let default_month = *months.first().ok_or(Error::EmptyDataset)?;

        let default_category = if categories.iter().any(|c| c == preferred_category) {
            preferred_category.to_string()
        } else {
            let fallback = categories.first().cloned().ok_or(Error::EmptyDataset)?;
            warn!(
                preferred = %preferred_category,
                fallback = %fallback,
                "Default category not present in data"
            );
            fallback
        };

        Ok(Self {
            categories,
            months,
            default_category,
            default_month,
        })
    }
}
