//! Aggregate views behind the three dashboard charts.
//!
//! Each view is a pure function of the current [`Selection`] and the
//! snapshot, recomputed from scratch on every request.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::incident::{MonthYear, ZipCode};
use crate::options::Options;
use crate::snapshot::Snapshot;

/// Hours in a day; the hourly view always has one entry per hour.
pub const HOURS_PER_DAY: usize = 24;

/// The dashboard's two pieces of UI state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Selected NIBRS category.
    pub category: String,
    /// Selected month bucket.
    pub month: MonthYear,
}

impl Selection {
    /// The selection shown when the page first loads.
    #[must_use]
    pub fn initial(options: &Options) -> Self {
        Self {
            category: options.default_category.clone(),
            month: options.default_month,
        }
    }
}

/// Incident count for one ZIP boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipCount {
    /// The boundary's ZIP code.
    pub zip: ZipCode,
    /// Matching incidents; zero when none matched.
    pub count: u64,
}

/// Incident count for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// The month bucket.
    pub month: MonthYear,
    /// Matching incidents.
    pub count: u64,
}

/// Incident count for one hour of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourCount {
    /// Hour of day, 0 through 23.
    pub hour: u8,
    /// Matching incidents.
    pub count: u64,
}

/// Count incidents of `category` in `month` per ZIP, for every retained
/// boundary, in boundary order. Boundaries without matches get zero.
#[must_use]
pub fn map_view(snapshot: &Snapshot, category: &str, month: MonthYear) -> Vec<ZipCount> {
    let mut counts: HashMap<&ZipCode, u64> = HashMap::new();
    for incident in snapshot
        .incidents()
        .iter()
        .filter(|i| i.category == category && i.month == month)
    {
        *counts.entry(&incident.zip).or_default() += 1;
    }

    snapshot
        .boundaries()
        .iter()
        .map(|b| ZipCount {
            zip: b.zip.clone(),
            count: counts.get(&b.zip).copied().unwrap_or(0),
        })
        .collect()
}

/// Count incidents of `category` per month, in chronological order.
///
/// Only months with at least one incident appear.
#[must_use]
pub fn monthly_trend(snapshot: &Snapshot, category: &str) -> Vec<MonthCount> {
    let mut counts: BTreeMap<MonthYear, u64> = BTreeMap::new();
    for incident in snapshot
        .incidents()
        .iter()
        .filter(|i| i.category == category)
    {
        *counts.entry(incident.month).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(month, count)| MonthCount { month, count })
        .collect()
}

/// Count incidents of `category` per hour of day, for all 24 hours.
#[must_use]
pub fn hourly_trend(snapshot: &Snapshot, category: &str) -> Vec<HourCount> {
    let mut counts = [0u64; HOURS_PER_DAY];
    for incident in snapshot
        .incidents()
        .iter()
        .filter(|i| i.category == category)
    {
        if let Some(count) = counts.get_mut(usize::from(incident.hour)) {
            *count += 1;
        }
    }

    (0u8..)
        .zip(counts)
        .map(|(hour, count)| HourCount { hour, count })
        .collect()
}
