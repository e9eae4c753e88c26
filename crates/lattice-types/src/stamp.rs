use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock write stamp in whole seconds since the UNIX epoch.
///
/// Write stamps order registry entries and form the integer component of
/// encoded scores. They reflect the wall clock of whichever writer touched
/// the entry last, so "most recent" is only approximately ordered under
/// clock skew across writers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WriteStamp(u64);

impl WriteStamp {
    /// A stamp for the current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    /// Construct from an explicit unix-seconds value.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The zero stamp (epoch).
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Seconds since the UNIX epoch.
    pub const fn secs(&self) -> u64 {
        self.0
    }

    /// The stamp as a sorted-set score.
    pub fn as_score(&self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Debug for WriteStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WriteStamp({}s)", self.0)
    }
}

impl fmt::Display for WriteStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
