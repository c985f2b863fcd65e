//! Monotonic trend constraints along one axis
//!
//! A trend restricts the means of bins that touch along the axis: the bin
//! further along the axis must have a larger (ascending) or smaller
//! (descending) mean, by at least the configured minimum difference.

use serde::Serialize;

/// Monotonic trend of bin means along an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonotonicTrend {
    /// Mean must not decrease as the axis value grows
    Ascending,
    /// Mean must not increase as the axis value grows
    Descending,
}

impl MonotonicTrend {
    /// Whether two adjacent bins break the trend.
    ///
    /// `lower_mean` belongs to the bin that comes first along the axis.
    pub fn violates(&self, lower_mean: f64, upper_mean: f64, min_diff: f64) -> bool {
        match self {
            MonotonicTrend::Ascending => upper_mean - lower_mean < min_diff,
            MonotonicTrend::Descending => lower_mean - upper_mean < min_diff,
        }
    }
}

impl std::fmt::Display for MonotonicTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonotonicTrend::Ascending => write!(f, "ascending"),
            MonotonicTrend::Descending => write!(f, "descending"),
        }
    }
}

impl std::str::FromStr for MonotonicTrend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascending" | "asc" => Ok(MonotonicTrend::Ascending),
            "descending" | "desc" => Ok(MonotonicTrend::Descending),
            _ => Err(format!(
                "Unknown monotonic trend: '{}'. Use 'ascending' or 'descending'.",
                s
            )),
        }
    }
}

/// Parse an optional trend where "none" disables the constraint
pub fn parse_trend(s: &str) -> Result<Option<MonotonicTrend>, String> {
    match s.to_lowercase().as_str() {
        "none" | "" => Ok(None),
        other => other.parse().map(Some),
    }
}
