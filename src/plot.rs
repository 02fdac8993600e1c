//! Declarative chart specifications.
//!
//! Serializes a [`HistogramSpec`] or a boxplot summary into chart JSON in
//! one of two dialects ([`Dialect::Vega`] or [`Dialect::VegaLite`]);
//! rendering into pixels is the consumer's job. Axis labels for large
//! values render human-readable ("1k", "2M").

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    config::Dialect,
    error::{Error, Result},
    histogram::HistogramSpec,
};

const CHART_WIDTH: u32 = 450;
const CHART_HEIGHT: u32 = 250;
const BAR_COLOR: &str = "steelblue";

/// Axis label expression shared by both dialects: render thousands and
/// millions compactly.
const LABEL_EXPR: &str = "datum.value >= 1000000 ? (datum.value/1000000) + 'M' : \
     datum.value >= 1000 ? (datum.value/1000) + 'k' : datum.value";

/// Five-number summary backing a boxplot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxplotSummary {
    /// Smallest value.
    pub min: f64,
    /// First quartile.
    pub q1: f64,
    /// Median.
    pub median: f64,
    /// Third quartile.
    pub q3: f64,
    /// Largest value.
    pub max: f64,
}

/// Computes the five-number summary of a numeric column.
///
/// # Errors
///
/// Returns `InvalidOperation` if there are no finite values.
pub fn boxplot_summary(values: &[f64]) -> Result<BoxplotSummary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(Error::invalid_operation(
            "column has no values for a boxplot",
        ));
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    Ok(BoxplotSummary {
        min: sorted[0],
        q1: sorted[n / 4],
        median: sorted[n / 2],
        q3: sorted[3 * n / 4],
        max: sorted[n - 1],
    })
}

/// Formats a count compactly ("950", "12k", "3M").
pub fn human_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{}M", n / 1_000_000)
    } else if n >= 1_000 {
        format!("{}k", n / 1_000)
    } else {
        n.to_string()
    }
}

/// Serializes a histogram spec into chart JSON.
pub fn histogram_chart(spec: &HistogramSpec, dialect: Dialect) -> Value {
    let rows: Vec<Value> = spec
        .bins
        .iter()
        .map(|b| {
            json!({
                "bin_left": b.left,
                "bin_right": b.right,
                "bin_center": b.center,
                "count": b.count,
            })
        })
        .collect();
    let title = format!("Histogram of {}", spec.title);

    match dialect {
        Dialect::VegaLite => json!({
            "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
            "title": title,
            "width": CHART_WIDTH,
            "height": CHART_HEIGHT,
            "data": { "values": rows },
            "mark": { "type": "bar", "color": BAR_COLOR },
            "encoding": {
                "x": {
                    "field": "bin_center",
                    "type": "quantitative",
                    "scale": { "type": "log" },
                    "title": spec.title,
                    "axis": {
                        "values": spec.ticks,
                        "labelExpr": LABEL_EXPR,
                        "labelAngle": -45,
                        "gridColor": "white",
                    },
                },
                "y": {
                    "field": "count",
                    "type": "quantitative",
                    "title": "Count",
                    "axis": { "labelExpr": LABEL_EXPR },
                },
                "tooltip": [
                    { "field": "bin_left", "type": "quantitative" },
                    { "field": "bin_right", "type": "quantitative" },
                    { "field": "count", "type": "quantitative" },
                ],
            },
        }),
        Dialect::Vega => json!({
            "$schema": "https://vega.github.io/schema/vega/v5.json",
            "title": title,
            "width": CHART_WIDTH,
            "height": CHART_HEIGHT,
            "data": [{ "name": "table", "values": rows }],
            "scales": [
                {
                    "name": "x",
                    "type": "log",
                    "range": "width",
                    "domain": { "data": "table", "field": "bin_center" },
                },
                {
                    "name": "y",
                    "type": "linear",
                    "range": "height",
                    "nice": true,
                    "domain": { "data": "table", "field": "count" },
                },
            ],
            "axes": [
                {
                    "orient": "bottom",
                    "scale": "x",
                    "values": spec.ticks,
                    "labelAngle": -45,
                    "title": spec.title,
                },
                { "orient": "left", "scale": "y", "title": "Count" },
            ],
            "marks": [{
                "type": "rect",
                "from": { "data": "table" },
                "encode": {
                    "enter": {
                        "x": { "scale": "x", "field": "bin_left" },
                        "x2": { "scale": "x", "field": "bin_right" },
                        "y": { "scale": "y", "field": "count" },
                        "y2": { "scale": "y", "value": 0 },
                        "fill": { "value": BAR_COLOR },
                    },
                },
            }],
        }),
    }
}

/// Serializes a boxplot summary into chart JSON.
pub fn boxplot_chart(title: &str, summary: &BoxplotSummary, dialect: Dialect) -> Value {
    let chart_title = format!("Boxplot of {title}");
    let row = json!({
        "min": summary.min,
        "q1": summary.q1,
        "median": summary.median,
        "q3": summary.q3,
        "max": summary.max,
    });

    match dialect {
        // Pre-aggregated five-number summaries compose as rule + bar + tick.
        Dialect::VegaLite => json!({
            "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
            "title": chart_title,
            "width": 120,
            "height": CHART_HEIGHT,
            "data": { "values": [row] },
            "layer": [
                {
                    "mark": { "type": "rule" },
                    "encoding": {
                        "y": { "field": "min", "type": "quantitative", "title": title },
                        "y2": { "field": "max" },
                    },
                },
                {
                    "mark": { "type": "bar", "size": 28, "color": BAR_COLOR },
                    "encoding": {
                        "y": { "field": "q1", "type": "quantitative" },
                        "y2": { "field": "q3" },
                    },
                },
                {
                    "mark": { "type": "tick", "size": 28, "color": "white" },
                    "encoding": {
                        "y": { "field": "median", "type": "quantitative" },
                    },
                },
            ],
        }),
        Dialect::Vega => json!({
            "$schema": "https://vega.github.io/schema/vega/v5.json",
            "title": chart_title,
            "width": 120,
            "height": CHART_HEIGHT,
            "data": [{ "name": "summary", "values": [row] }],
            "scales": [{
                "name": "y",
                "type": "linear",
                "range": "height",
                "nice": true,
                "domain": { "data": "summary", "fields": ["min", "max"] },
            }],
            "axes": [{ "orient": "left", "scale": "y", "title": title }],
            "marks": [
                {
                    "type": "rule",
                    "from": { "data": "summary" },
                    "encode": {
                        "enter": {
                            "x": { "value": 60 },
                            "y": { "scale": "y", "field": "min" },
                            "y2": { "scale": "y", "field": "max" },
                        },
                    },
                },
                {
                    "type": "rect",
                    "from": { "data": "summary" },
                    "encode": {
                        "enter": {
                            "xc": { "value": 60 },
                            "width": { "value": 28 },
                            "y": { "scale": "y", "field": "q1" },
                            "y2": { "scale": "y", "field": "q3" },
                            "fill": { "value": BAR_COLOR },
                        },
                    },
                },
                {
                    "type": "rect",
                    "from": { "data": "summary" },
                    "encode": {
                        "enter": {
                            "xc": { "value": 60 },
                            "width": { "value": 28 },
                            "height": { "value": 2 },
                            "yc": { "scale": "y", "field": "median" },
                            "fill": { "value": "white" },
                        },
                    },
                },
            ],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramBinner;

    fn sample_spec() -> HistogramSpec {
        let values: Vec<f64> = (1..=1000).map(|v| v as f64).collect();
        HistogramBinner::new()
            .with_bins(10)
            .bin("token_count", &values)
            .unwrap()
    }

    #[test]
    fn test_boxplot_summary() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let summary = boxplot_summary(&values).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 100.0);
        assert_eq!(summary.median, 51.0);
        assert!(summary.q1 < summary.median);
        assert!(summary.median < summary.q3);
    }

    #[test]
    fn test_boxplot_summary_empty_fails() {
        assert!(boxplot_summary(&[]).is_err());
        assert!(boxplot_summary(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_human_count() {
        assert_eq!(human_count(950), "950");
        assert_eq!(human_count(1_000), "1k");
        assert_eq!(human_count(12_345), "12k");
        assert_eq!(human_count(3_000_000), "3M");
    }

    #[test]
    fn test_vega_lite_histogram_shape() {
        let chart = histogram_chart(&sample_spec(), Dialect::VegaLite);
        assert!(chart["$schema"]
            .as_str()
            .unwrap()
            .contains("vega-lite"));
        assert_eq!(chart["mark"]["type"], "bar");
        assert_eq!(chart["data"]["values"].as_array().unwrap().len(), 10);
        assert_eq!(chart["encoding"]["x"]["scale"]["type"], "log");
        assert!(chart["title"].as_str().unwrap().starts_with("Histogram of"));
    }

    #[test]
    fn test_vega_histogram_shape() {
        let chart = histogram_chart(&sample_spec(), Dialect::Vega);
        let schema = chart["$schema"].as_str().unwrap();
        assert!(schema.contains("/vega/"));
        assert!(chart["scales"].as_array().is_some());
        assert!(chart["marks"].as_array().is_some());
        assert_eq!(chart["data"][0]["name"], "table");
    }

    #[test]
    fn test_histogram_ticks_carried_into_axis() {
        let spec = sample_spec();
        let chart = histogram_chart(&spec, Dialect::VegaLite);
        let axis_values = chart["encoding"]["x"]["axis"]["values"]
            .as_array()
            .unwrap();
        assert_eq!(axis_values.len(), spec.ticks.len());
    }

    #[test]
    fn test_boxplot_charts_in_both_dialects() {
        let summary = boxplot_summary(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let lite = boxplot_chart("token_count", &summary, Dialect::VegaLite);
        assert!(lite["layer"].as_array().is_some());
        let vega = boxplot_chart("token_count", &summary, Dialect::Vega);
        assert!(vega["marks"].as_array().is_some());
        for chart in [lite, vega] {
            assert!(chart["title"]
                .as_str()
                .unwrap()
                .starts_with("Boxplot of"));
        }
    }
}
