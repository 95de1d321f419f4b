//! Sampling granularity of a price series.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar interval, from one-minute intraday bars up to monthly end-of-day bars.
///
/// The string code (`as_code`) is provider-neutral. Each provider client
/// translates the interval into its own query vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub const ALL: [Interval; 9] = [
        Interval::Minute1,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Hour1,
        Interval::Hour4,
        Interval::Daily,
        Interval::Weekly,
        Interval::Monthly,
    ];

    /// Stable code used in cache file names and on the command line.
    pub fn as_code(self) -> &'static str {
        match self {
            Interval::Minute1 => "1min",
            Interval::Minute5 => "5min",
            Interval::Minute15 => "15min",
            Interval::Minute30 => "30min",
            Interval::Hour1 => "1hour",
            Interval::Hour4 => "4hour",
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
        }
    }

    /// True for sub-daily intervals whose bars carry a time of day.
    pub fn is_intraday(self) -> bool {
        !matches!(self, Interval::Daily | Interval::Weekly | Interval::Monthly)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_code() == needle)
            .ok_or_else(|| {
                let valid: Vec<&str> = Interval::ALL.iter().map(|i| i.as_code()).collect();
                format!("unknown interval '{s}'. Valid: {}", valid.join(", "))
            })
    }
}
