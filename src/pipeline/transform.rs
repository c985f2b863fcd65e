//! Mapping of new (x, y) pairs onto a fitted binning

use serde::Serialize;

use super::error::BinningError;
use super::reconstruct::{BinStats, FittedBinning};
use super::segment::{classify, SampleKind};

/// Output produced for every sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Metric {
    /// Mean target of the sample's bin
    #[default]
    Mean,
    /// Ordinal index of the sample's bin
    Indices,
    /// Interval label of the sample's bin
    Bins,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Mean => write!(f, "mean"),
            Metric::Indices => write!(f, "indices"),
            Metric::Bins => write!(f, "bins"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(Metric::Mean),
            "indices" => Ok(Metric::Indices),
            "bins" => Ok(Metric::Bins),
            _ => Err(format!(
                "Unknown metric: '{}'. Use 'mean', 'indices' or 'bins'.",
                s
            )),
        }
    }
}

/// Value substituted for special or missing samples under the mean metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MetricValue {
    /// Mean of the corresponding virtual bin
    Empirical,
    Fixed(f64),
}

impl Default for MetricValue {
    fn default() -> Self {
        MetricValue::Fixed(0.0)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Empirical => write!(f, "empirical"),
            MetricValue::Fixed(v) => write!(f, "{}", v),
        }
    }
}

impl std::str::FromStr for MetricValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("empirical") {
            return Ok(MetricValue::Empirical);
        }
        s.trim()
            .parse::<f64>()
            .map(MetricValue::Fixed)
            .map_err(|_| format!("Invalid metric value: '{}'. Use 'empirical' or a number.", s))
    }
}

impl MetricValue {
    fn resolve(&self, bin: &BinStats) -> f64 {
        match self {
            MetricValue::Empirical => bin.mean,
            MetricValue::Fixed(v) => *v,
        }
    }
}

/// Options of a transform call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransformOptions {
    pub metric: Metric,
    pub metric_special: MetricValue,
    pub metric_missing: MetricValue,
    /// Decimals shown in bin labels
    pub show_digits: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Mean,
            metric_special: MetricValue::default(),
            metric_missing: MetricValue::default(),
            show_digits: 2,
        }
    }
}

/// Transformed values, one per input sample
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    Mean(Vec<f64>),
    Indices(Vec<usize>),
    Bins(Vec<String>),
}

impl Transformed {
    pub fn len(&self) -> usize {
        match self {
            Transformed::Mean(v) => v.len(),
            Transformed::Indices(v) => v.len(),
            Transformed::Bins(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Label `"[lo, hi)"` of a right-open interval
pub fn interval_label(bounds: Option<(f64, f64)>, digits: usize) -> String {
    match bounds {
        Some((lo, hi)) => format!("[{:.*}, {:.*})", digits, lo, digits, hi),
        None => String::new(),
    }
}

/// Label `"[lo, hi) x [lo, hi)"` of a clean bin
pub fn bin_label(bin: &BinStats, digits: usize) -> String {
    format!(
        "{} x {}",
        interval_label(bin.x_interval, digits),
        interval_label(bin.y_interval, digits)
    )
}

/// Map every (x, y) pair to the requested metric of its bin.
pub fn transform(
    fitted: &FittedBinning,
    x: &[f64],
    y: &[f64],
    special_codes_x: &[f64],
    special_codes_y: &[f64],
    options: &TransformOptions,
) -> Result<Transformed, BinningError> {
    if x.len() != y.len() {
        return Err(BinningError::TransformLengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }

    let n_bins = fitted.n_bins();
    let kinds = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (xi, yi, classify(xi, yi, special_codes_x, special_codes_y)));

    let output = match options.metric {
        Metric::Mean => {
            let special = options.metric_special.resolve(fitted.special());
            let missing = options.metric_missing.resolve(fitted.missing());
            Transformed::Mean(
                kinds
                    .map(|(xi, yi, kind)| match kind {
                        SampleKind::Clean => fitted.bins[fitted.bin_of(xi, yi)].mean,
                        SampleKind::Special => special,
                        SampleKind::Missing => missing,
                    })
                    .collect(),
            )
        }
        Metric::Indices => Transformed::Indices(
            kinds
                .map(|(xi, yi, kind)| match kind {
                    SampleKind::Clean => fitted.bin_of(xi, yi),
                    SampleKind::Special => n_bins,
                    SampleKind::Missing => n_bins + 1,
                })
                .collect(),
        ),
        Metric::Bins => {
            let labels: Vec<String> = fitted
                .clean_bins()
                .iter()
                .map(|bin| bin_label(bin, options.show_digits))
                .collect();
            Transformed::Bins(
                kinds
                    .map(|(xi, yi, kind)| match kind {
                        SampleKind::Clean => labels[fitted.bin_of(xi, yi)].clone(),
                        SampleKind::Special => "Special".to_string(),
                        SampleKind::Missing => "Missing".to_string(),
                    })
                    .collect(),
            )
        }
    };

    Ok(output)
}
