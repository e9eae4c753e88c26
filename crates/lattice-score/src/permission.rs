//! Permission bitmasks carried in the score's fractional slot.
//!
//! The permission variant of the codec stores a `u8` bitmask (0–255) in the
//! same three-digit slot the general codec uses for auxiliary metadata. A
//! fixed table of categorical tiers interprets the mask; tier masks are
//! cumulative, so every higher tier is a strict superset of the one below.

use serde::{Deserialize, Serialize};

use crate::codec::{decode, encode, Decoded};
use crate::error::{ScoreError, ScoreResult};

/// Individual permission bits composed into tier masks.
pub mod bits {
    /// Read object fields and collection membership.
    pub const VIEW: u8 = 1;
    /// Create new related content.
    pub const CREATE: u8 = 1 << 1;
    /// Modify existing content.
    pub const EDIT: u8 = 1 << 2;
    /// Remove content.
    pub const DELETE: u8 = 1 << 3;
    /// Change settings and declared relationships.
    pub const CONFIGURE: u8 = 1 << 4;
    /// Grant permissions to others.
    pub const GRANT: u8 = 1 << 5;
    /// Transfer ownership.
    pub const TRANSFER: u8 = 1 << 6;
    /// Unrestricted administrative access.
    pub const ADMIN: u8 = 1 << 7;
}

/// Categorical permission tiers, lowest to highest.
///
/// Each tier's reference mask is a superset of the tier below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionTier {
    /// Can view content.
    Readable,
    /// Can view, create, and edit content.
    ContentEditor,
    /// Full control short of ownership transfer.
    Administrator,
    /// Every bit set.
    Owner,
}

impl PermissionTier {
    /// All tiers, lowest first.
    pub const ALL: [PermissionTier; 4] = [
        PermissionTier::Readable,
        PermissionTier::ContentEditor,
        PermissionTier::Administrator,
        PermissionTier::Owner,
    ];

    /// The tier's cumulative reference mask.
    pub const fn mask(&self) -> u8 {
        match self {
            PermissionTier::Readable => bits::VIEW,
            PermissionTier::ContentEditor => bits::VIEW | bits::CREATE | bits::EDIT,
            PermissionTier::Administrator => {
                bits::VIEW | bits::CREATE | bits::EDIT | bits::DELETE | bits::CONFIGURE | bits::GRANT
            }
            PermissionTier::Owner => u8::MAX,
        }
    }

    /// Whether the bitmask has any overlap with this tier's mask.
    pub const fn intersects(&self, permission_bits: u8) -> bool {
        permission_bits & self.mask() != 0
    }

    /// Whether the bitmask satisfies this tier's full mask.
    pub const fn satisfied_by(&self, permission_bits: u8) -> bool {
        permission_bits & self.mask() == self.mask()
    }

    /// The highest tier whose full mask the bitmask satisfies, if any.
    pub fn of_bits(permission_bits: u8) -> Option<PermissionTier> {
        Self::ALL
            .into_iter()
            .rev()
            .find(|tier| tier.satisfied_by(permission_bits))
    }
}

/// Encode a (timestamp, permission bitmask) pair into a sortable score.
///
/// The bitmask occupies the same fractional slot the general codec uses for
/// auxiliary metadata; `u8` keeps it within 0–255 by construction.
pub fn encode_permission(timestamp: u64, permission_bits: u8) -> ScoreResult<f64> {
    encode(timestamp, u16::from(permission_bits))
}

/// Decode a permission score into (timestamp, bitmask).
///
/// Fails with [`ScoreError::PermissionBitsOutOfRange`] when the fractional
/// slot holds a value above 255 (a score encoded by the general codec, not
/// the permission variant).
pub fn decode_permission(score: f64) -> ScoreResult<(u64, u8)> {
    let Decoded { timestamp, aux } = decode(score)?;
    if aux > u16::from(u8::MAX) {
        return Err(ScoreError::PermissionBitsOutOfRange { aux });
    }
    Ok((timestamp, aux as u8))
}

/// Whether a permission score's bitmask has non-zero intersection with the
/// tier's reference mask.
pub fn has_category(score: f64, tier: PermissionTier) -> ScoreResult<bool> {
    let (_, permission_bits) = decode_permission(score)?;
    Ok(tier.intersects(permission_bits))
}

/// The highest tier a permission score satisfies, or `None`.
pub fn permission_tier(score: f64) -> ScoreResult<Option<PermissionTier>> {
    let (_, permission_bits) = decode_permission(score)?;
    Ok(PermissionTier::of_bits(permission_bits))
}
