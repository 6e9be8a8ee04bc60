//! Plotly figure specifications for the dashboard charts.
//!
//! Figures are plain JSON handed to `Plotly.react` in the browser.

use serde_json::{json, Value};

use crate::config::MapConfig;
use crate::views::{HourCount, MonthCount, ZipCount};

const INCIDENTS_AXIS: &str = "Number of Incidents";

/// Choropleth of incident counts per ZIP.
///
/// `geojson` must contain one feature per boundary with the ZIP as its `id`.
#[must_use]
pub fn choropleth(counts: &[ZipCount], geojson: &Value, style: &MapConfig) -> Value {
    let zips: Vec<&str> = counts.iter().map(|z| z.zip.as_str()).collect();
    let values: Vec<u64> = counts.iter().map(|z| z.count).collect();

    json!({
        "data": [{
            "type": "choroplethmapbox",
            "geojson": geojson,
            "locations": zips,
            "z": values,
            "zmin": 0,
            "colorscale": style.color_scale,
            "marker": {
                "opacity": style.opacity,
                "line": { "width": style.line_width, "color": style.line_color },
            },
            "hovertext": zips,
            "hovertemplate": "<b>%{hovertext}</b><br>count=%{z}<br>zip=%{location}<extra></extra>",
            "colorbar": { "title": { "text": "count" } },
        }],
        "layout": {
            "mapbox": {
                "style": style.style,
                "center": { "lat": style.center_lat, "lon": style.center_lon },
                "zoom": style.zoom,
            },
            "height": style.height,
            "margin": { "r": 0, "t": 30, "l": 0, "b": 0 },
        },
    })
}

/// Line chart of incidents per month.
#[must_use]
pub fn monthly_line(category: &str, trend: &[MonthCount]) -> Value {
    let months: Vec<String> = trend.iter().map(|m| m.month.to_string()).collect();
    let counts: Vec<u64> = trend.iter().map(|m| m.count).collect();

    json!({
        "data": [line_trace(&json!(months), &json!(counts))],
        "layout": {
            "title": { "text": format!("Monthly Trend for {category}") },
            "xaxis": { "title": { "text": "Month" }, "type": "category" },
            "yaxis": { "title": { "text": INCIDENTS_AXIS } },
        },
    })
}

/// Line chart of incidents per hour of day.
#[must_use]
pub fn hourly_line(category: &str, trend: &[HourCount]) -> Value {
    let hours: Vec<u8> = trend.iter().map(|h| h.hour).collect();
    let counts: Vec<u64> = trend.iter().map(|h| h.count).collect();

    json!({
        "data": [line_trace(&json!(hours), &json!(counts))],
        "layout": {
            "title": { "text": format!("Hourly Crime Pattern: {category}") },
            "xaxis": { "title": { "text": "Hour of Day (0\u{2013}23)" }, "dtick": 1 },
            "yaxis": { "title": { "text": INCIDENTS_AXIS } },
        },
    })
}

fn line_trace(x: &Value, y: &Value) -> Value {
    json!({
        "type": "scatter",
        "mode": "lines+markers",
        "x": x,
        "y": y,
    })
}
