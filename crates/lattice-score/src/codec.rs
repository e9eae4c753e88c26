//! The (timestamp, aux) score codec.
//!
//! A score is `timestamp + aux / 1000`, computed in integer milli-units so
//! the value is exact in an `f64`. The three-digit fractional slot is fixed
//! width: `encode(t, 5)` and `encode(t, 50)` occupy distinct, correctly
//! ordered positions below `encode(t + 1, 0)`.

use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};

/// Width of the fractional slot, in discrete steps per second.
const SLOT_WIDTH: u64 = 1000;

/// Largest auxiliary value the fractional slot can hold.
pub const AUX_MAX: u16 = 999;

/// Largest encodable timestamp.
///
/// `MAX_TIMESTAMP * 1000 + 999` must stay within the range where an `f64`
/// represents every integer exactly (2^53). 2^42 seconds is comfortably
/// inside that and beyond any wall-clock value this codec will ever see.
pub const MAX_TIMESTAMP: u64 = (1 << 42) - 1;

/// A score decoded back into its two components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decoded {
    /// Unix-seconds timestamp (the integer component).
    pub timestamp: u64,
    /// Auxiliary metadata (the fractional slot, 0–999).
    pub aux: u16,
}

/// Encode a (timestamp, aux) pair into a single sortable score.
///
/// Fails with [`ScoreError::AuxOutOfRange`] when `aux > 999` and with
/// [`ScoreError::TimestampOutOfRange`] when the timestamp would lose
/// precision. Out-of-range input is never truncated.
///
/// # Examples
///
/// ```
/// use lattice_score::{decode, encode};
///
/// let score = encode(1_700_000_000, 37).unwrap();
/// let back = decode(score).unwrap();
/// assert_eq!(back.timestamp, 1_700_000_000);
/// assert_eq!(back.aux, 37);
/// ```
pub fn encode(timestamp: u64, aux: u16) -> ScoreResult<f64> {
    if aux > AUX_MAX {
        return Err(ScoreError::AuxOutOfRange { aux, max: AUX_MAX });
    }
    if timestamp > MAX_TIMESTAMP {
        return Err(ScoreError::TimestampOutOfRange {
            timestamp,
            max: MAX_TIMESTAMP,
        });
    }
    let millis = timestamp * SLOT_WIDTH + u64::from(aux);
    Ok(millis as f64 / SLOT_WIDTH as f64)
}

/// Decode a score back into its (timestamp, aux) components.
///
/// Fails with [`ScoreError::MalformedScore`] for negative, non-finite, or
/// out-of-range scores.
pub fn decode(score: f64) -> ScoreResult<Decoded> {
    if !score.is_finite() || score < 0.0 {
        return Err(ScoreError::MalformedScore { score });
    }
    let millis = (score * SLOT_WIDTH as f64).round();
    if millis > (MAX_TIMESTAMP * SLOT_WIDTH + u64::from(AUX_MAX)) as f64 {
        return Err(ScoreError::MalformedScore { score });
    }
    let millis = millis as u64;
    Ok(Decoded {
        timestamp: millis / SLOT_WIDTH,
        aux: (millis % SLOT_WIDTH) as u16,
    })
}
