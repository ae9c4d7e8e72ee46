use std::fmt;

use thiserror::Error;

use crate::constants::{
    HEAVY_THRESHOLD_IN, LIGHT_THRESHOLD_IN, MODERATE_THRESHOLD_IN, TEMPERATURE_PERCENTILES,
    TRACE_THRESHOLD_IN, VERY_HEAVY_THRESHOLD_IN,
};
use crate::table::MemberMatrix;

#[derive(Debug, Error, PartialEq)]
pub enum SummaryError {
    #[error("{0} series is entirely missing")]
    AllMissing(&'static str),
}

/// Severity class of a 3-hour precipitation amount, ordered lightest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntensityBucket {
    NoRain,
    Trace,
    Light,
    Moderate,
    Heavy,
    VeryHeavy,
}

impl IntensityBucket {
    pub const ALL: [Self; 6] = [
        Self::NoRain,
        Self::Trace,
        Self::Light,
        Self::Moderate,
        Self::Heavy,
        Self::VeryHeavy,
    ];

    /// Buckets with a lower bound, heaviest first. Matching walks this order.
    pub const BY_SEVERITY: [Self; 5] = [
        Self::VeryHeavy,
        Self::Heavy,
        Self::Moderate,
        Self::Light,
        Self::Trace,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NoRain => "No Rain",
            Self::Trace => "Trace",
            Self::Light => "Light",
            Self::Moderate => "Moderate",
            Self::Heavy => "Heavy",
            Self::VeryHeavy => "Very Heavy",
        }
    }
}

impl fmt::Display for IntensityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lower bounds in inches per 3 hours.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntensityThresholds {
    pub trace: f64,
    pub light: f64,
    pub moderate: f64,
    pub heavy: f64,
    pub very_heavy: f64,
}

impl Default for IntensityThresholds {
    fn default() -> Self {
        Self {
            trace: TRACE_THRESHOLD_IN,
            light: LIGHT_THRESHOLD_IN,
            moderate: MODERATE_THRESHOLD_IN,
            heavy: HEAVY_THRESHOLD_IN,
            very_heavy: VERY_HEAVY_THRESHOLD_IN,
        }
    }
}

impl IntensityThresholds {
    pub fn lower_bound(&self, bucket: IntensityBucket) -> Option<f64> {
        match bucket {
            IntensityBucket::NoRain => None,
            IntensityBucket::Trace => Some(self.trace),
            IntensityBucket::Light => Some(self.light),
            IntensityBucket::Moderate => Some(self.moderate),
            IntensityBucket::Heavy => Some(self.heavy),
            IntensityBucket::VeryHeavy => Some(self.very_heavy),
        }
    }

    pub fn legend_label(&self, bucket: IntensityBucket) -> String {
        let next = IntensityBucket::ALL
            .get(bucket.index() + 1)
            .and_then(|next| self.lower_bound(*next));
        match (self.lower_bound(bucket), next) {
            (Some(low), Some(high)) => format!("{bucket} ({low:.2} - {high:.2} in/3hr)"),
            (Some(low), None) => format!("{bucket} (>= {low:.2} in/3hr)"),
            (None, _) => bucket.label().to_string(),
        }
    }
}

/// Missing and NaN values are "No Rain"; only real numbers can reach a threshold.
pub fn categorize(value: Option<f64>, thresholds: &IntensityThresholds) -> IntensityBucket {
    let Some(value) = value.filter(|value| !value.is_nan()) else {
        return IntensityBucket::NoRain;
    };
    for bucket in IntensityBucket::BY_SEVERITY {
        if let Some(bound) = thresholds.lower_bound(bucket) {
            if value >= bound {
                return bucket;
            }
        }
    }
    if value > 0.0 {
        IntensityBucket::Trace
    } else {
        IntensityBucket::NoRain
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CumulativePrecip {
    /// Member-major running sums.
    pub per_member: Vec<Vec<Option<f64>>>,
    pub mean: Vec<Option<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntensityDistribution {
    /// Per time step, percent of members in each bucket, indexed by `IntensityBucket::index`.
    pub percentages: Vec<[f64; 6]>,
}

impl IntensityDistribution {
    pub fn series(&self, bucket: IntensityBucket) -> Vec<f64> {
        self.percentages
            .iter()
            .map(|step| step[bucket.index()])
            .collect()
    }

    /// True when some member reaches at least Trace at some step.
    pub fn has_precipitation(&self) -> bool {
        IntensityBucket::BY_SEVERITY
            .iter()
            .any(|bucket| self.percentages.iter().any(|step| step[bucket.index()] > 0.0))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureStats {
    pub mean: Vec<Option<f64>>,
    pub p10: Vec<Option<f64>>,
    pub p25: Vec<Option<f64>>,
    pub p75: Vec<Option<f64>>,
    pub p90: Vec<Option<f64>>,
}

/// Running sum per member. Missing cells stay missing without resetting the sum.
pub fn cumulative_precip(members: &MemberMatrix) -> Result<CumulativePrecip, SummaryError> {
    let per_member: Vec<Vec<Option<f64>>> = (0..members.member_count())
        .map(|member| {
            let mut total = 0.0;
            members
                .member_series(member)
                .map(|value| {
                    value.map(|value| {
                        total += value;
                        total
                    })
                })
                .collect()
        })
        .collect();

    let mean: Vec<Option<f64>> = (0..members.step_count())
        .map(|step| mean_of(per_member.iter().map(|series| series[step])))
        .collect();

    if mean.iter().all(Option::is_none) {
        return Err(SummaryError::AllMissing("cumulative precipitation"));
    }
    Ok(CumulativePrecip { per_member, mean })
}

pub fn intensity_distribution(
    members: &MemberMatrix,
    thresholds: &IntensityThresholds,
) -> IntensityDistribution {
    let member_count = members.member_count();
    let percentages = members
        .values
        .iter()
        .map(|row| {
            let mut shares = [0.0; 6];
            if member_count == 0 {
                return shares;
            }
            for member in 0..member_count {
                let bucket = categorize(row.get(member).copied().flatten(), thresholds);
                shares[bucket.index()] += 1.0;
            }
            for share in shares.iter_mut() {
                *share = *share / member_count as f64 * 100.0;
            }
            shares
        })
        .collect();
    IntensityDistribution { percentages }
}

pub fn temperature_stats(members: &MemberMatrix) -> Result<TemperatureStats, SummaryError> {
    let [q10, q25, q75, q90] = TEMPERATURE_PERCENTILES;
    let mut stats = TemperatureStats {
        mean: Vec::with_capacity(members.step_count()),
        p10: Vec::with_capacity(members.step_count()),
        p25: Vec::with_capacity(members.step_count()),
        p75: Vec::with_capacity(members.step_count()),
        p90: Vec::with_capacity(members.step_count()),
    };

    for row in &members.values {
        let mut present: Vec<f64> = row.iter().flatten().copied().collect();
        present.sort_by(f64::total_cmp);
        stats.mean.push(mean_of(row.iter().copied()));
        stats.p10.push(quantile(&present, q10));
        stats.p25.push(quantile(&present, q25));
        stats.p75.push(quantile(&present, q75));
        stats.p90.push(quantile(&present, q90));
    }

    if stats.mean.iter().all(Option::is_none) {
        return Err(SummaryError::AllMissing("temperature"));
    }
    Ok(stats)
}

pub fn mean_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Linear interpolation between order statistics of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
