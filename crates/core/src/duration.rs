//! Media duration normalization.

use serde::{Deserialize, Serialize};

/// A media duration split into whole minutes and remaining seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDuration {
    pub minutes: i64,
    pub seconds: i64,
}

impl MediaDuration {
    /// Normalize a duration reported in (possibly fractional) seconds.
    ///
    /// The raw value is rounded to the nearest second before being split, so
    /// `99.6` becomes `1:40` rather than `1:39`. Negative and non-finite input
    /// is treated as zero.
    pub fn from_seconds(raw: f64) -> Self {
        let total = if raw.is_finite() && raw > 0.0 {
            raw.round() as i64
        } else {
            0
        };
        Self::from_total_seconds(total)
    }

    pub fn from_total_seconds(total: i64) -> Self {
        let total = total.max(0);
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    pub fn total_seconds(self) -> i64 {
        self.minutes * 60 + self.seconds
    }
}
