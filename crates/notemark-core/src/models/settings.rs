//! Application settings model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How often the sync trigger starts a pass on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncInterval {
    /// Only explicit sync requests start a pass
    #[default]
    ManualOnly,
    Every15Minutes,
    Every30Minutes,
    EveryHour,
}

impl SyncInterval {
    pub const ALL: [Self; 4] = [
        Self::ManualOnly,
        Self::Every15Minutes,
        Self::Every30Minutes,
        Self::EveryHour,
    ];

    /// Period between scheduled passes, `None` for manual only.
    pub const fn period(self) -> Option<Duration> {
        match self {
            Self::ManualOnly => None,
            Self::Every15Minutes => Some(Duration::from_secs(15 * 60)),
            Self::Every30Minutes => Some(Duration::from_secs(30 * 60)),
            Self::EveryHour => Some(Duration::from_secs(60 * 60)),
        }
    }

    /// Stable storage/CLI name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManualOnly => "manual",
            Self::Every15Minutes => "15m",
            Self::Every30Minutes => "30m",
            Self::EveryHour => "1h",
        }
    }

    /// Human-readable label
    pub const fn label(self) -> &'static str {
        match self {
            Self::ManualOnly => "Manual only",
            Self::Every15Minutes => "15 minutes",
            Self::Every30Minutes => "30 minutes",
            Self::EveryHour => "1 hour",
        }
    }
}

impl fmt::Display for SyncInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SyncInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" | "off" | "manual only" => Ok(Self::ManualOnly),
            "15m" | "15" | "15 minutes" => Ok(Self::Every15Minutes),
            "30m" | "30" | "30 minutes" => Ok(Self::Every30Minutes),
            "1h" | "60m" | "60" | "1 hour" => Ok(Self::EveryHour),
            other => Err(format!(
                "unknown sync interval '{other}' (expected manual, 15m, 30m or 1h)"
            )),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Automatic sync cadence
    pub sync_interval: SyncInterval,
}
