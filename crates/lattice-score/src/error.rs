use thiserror::Error;

/// Errors produced by score encoding and decoding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    /// The auxiliary value does not fit the fractional slot.
    #[error("auxiliary value {aux} out of range (max {max})")]
    AuxOutOfRange { aux: u16, max: u16 },

    /// The timestamp would lose precision in an f64 encoding.
    #[error("timestamp {timestamp} out of range (max {max})")]
    TimestampOutOfRange { timestamp: u64, max: u64 },

    /// The score is negative, non-finite, or beyond the encodable range.
    #[error("score {score} is not a valid encoded score")]
    MalformedScore { score: f64 },

    /// The decoded auxiliary slot exceeds the permission bitmask range.
    #[error("auxiliary slot {aux} exceeds permission bitmask range (max 255)")]
    PermissionBitsOutOfRange { aux: u16 },
}

/// Result alias for score operations.
pub type ScoreResult<T> = Result<T, ScoreError>;
