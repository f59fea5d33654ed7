//! Role bitmask checks.
//!
//! A role code is read as a bit vector of role membership: bit `i` (counting
//! from the least significant bit, so index 0 is bit 0) set means the player
//! holds role `i`. Routes declare the roles they accept as a vector of 0/1
//! flags in the same order. Access is granted when the two share a set bit.
//!
//! The vector width is the size of the role catalog, so bits at or above
//! `role_count` are ignored.

use crate::error::{AuthError, Result};

/// Widest role catalog a mask can describe.
pub const MAX_ROLES: usize = 64;

/// Set of role indices, one bit per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u64);

impl RoleSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Interpret `role_code` as a membership mask over `width` roles.
    ///
    /// Negative codes carry no membership.
    pub fn from_code(role_code: i32, width: usize) -> Self {
        let Ok(code) = u64::try_from(role_code) else {
            return Self::empty();
        };
        Self(code & width_mask(width))
    }

    /// Build a set from 0/1 route flags; any non-zero flag marks membership.
    pub fn from_flags(flags: &[u8]) -> Self {
        flags
            .iter()
            .take(MAX_ROLES)
            .enumerate()
            .filter(|&(_, &flag)| flag != 0)
            .fold(Self::empty(), |set, (idx, _)| set.with(idx))
    }

    /// Add role `idx`. Indices at or beyond [`MAX_ROLES`] are ignored.
    #[must_use]
    pub const fn with(self, idx: usize) -> Self {
        if idx >= MAX_ROLES {
            return self;
        }
        Self(self.0 | (1 << idx))
    }

    pub const fn contains(&self, idx: usize) -> bool {
        idx < MAX_ROLES && self.0 & (1 << idx) != 0
    }

    pub const fn intersects(&self, other: &Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Keep only the first `width` roles.
    #[must_use]
    pub fn truncate(self, width: usize) -> Self {
        Self(self.0 & width_mask(width))
    }

    /// Expand into a `width`-wide 0/1 vector, index 0 first.
    pub fn to_flags(&self, width: usize) -> Vec<u8> {
        (0..width.min(MAX_ROLES))
            .map(|idx| u8::from(self.contains(idx)))
            .collect()
    }
}

fn width_mask(width: usize) -> u64 {
    match width {
        0 => 0,
        w if w >= MAX_ROLES => u64::MAX,
        w => (1u64 << w) - 1,
    }
}

/// Decide whether `role_code` satisfies a route's `expected` role flags.
///
/// Pure: the result depends only on the code, the catalog size and the flags.
/// Flags past `role_count` are ignored; missing flags count as 0.
pub fn check_roles(role_code: i32, role_count: i64, expected: &[u8]) -> Result<()> {
    let width = usize::try_from(role_count).unwrap_or(0).min(MAX_ROLES);
    let held = RoleSet::from_code(role_code, width);
    let allowed = RoleSet::from_flags(expected).truncate(width);

    if held.intersects(&allowed) {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied)
    }
}
