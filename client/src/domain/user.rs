//! Authenticated user identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric identifier of the authenticated user.
///
/// The push channel's join frame carries this identifier verbatim, so it is
/// kept numeric rather than being normalised to a string like the feed item
/// identifiers.
///
/// # Examples
/// ```
/// use client::domain::UserId;
///
/// let user = UserId::new(7);
/// assert_eq!(user.as_u64(), 7);
/// assert_eq!(user.to_string(), "7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Wrap a raw backend user identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Return the raw numeric identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
