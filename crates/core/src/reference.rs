//! Human-facing reference numbers for quotes and appointments.
//!
//! A reference is `{prefix}-{epoch millis}-{8 uppercase hex}`, e.g.
//! `Q-1760870400000-3FA94C21`. Uniqueness is probabilistic only: two numbers
//! minted in the same millisecond differ by their 32-bit random suffix. The
//! `UNIQUE` constraint on the owning column is the real guarantee, and a
//! violation there must surface as a conflict.

use core::fmt;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which entity a reference number identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Quote,
    Appointment,
}

impl ReferenceKind {
    /// The fixed prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Quote => "Q",
            Self::Appointment => "A",
        }
    }
}

/// A generated quote or appointment number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    /// Mint a new reference using the current time and thread-local randomness.
    #[must_use]
    pub fn generate(kind: ReferenceKind) -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix: u32 = rand::rng().random();
        Self::from_parts(kind, millis, suffix)
    }

    /// Build a reference from explicit parts.
    #[must_use]
    pub fn from_parts(kind: ReferenceKind, millis: i64, suffix: u32) -> Self {
        Self(format!("{}-{millis}-{suffix:08X}", kind.prefix()))
    }

    /// The reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ReferenceNumber> for String {
    fn from(reference: ReferenceNumber) -> Self {
        reference.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_format() {
        let reference = ReferenceNumber::from_parts(ReferenceKind::Quote, 1_760_870_400_000, 0x3FA9_4C21);
        assert_eq!(reference.as_str(), "Q-1760870400000-3FA94C21");

        let padded = ReferenceNumber::from_parts(ReferenceKind::Appointment, 5, 0xAB);
        assert_eq!(padded.as_str(), "A-5-000000AB");
    }

    #[test]
    fn test_generated_shape() {
        let reference = ReferenceNumber::generate(ReferenceKind::Appointment);
        let parts: Vec<&str> = reference.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.first(), Some(&"A"));
        assert!(parts.get(1).is_some_and(|p| p.parse::<i64>().is_ok()));
        assert!(parts.get(2).is_some_and(|p| {
            p.len() == 8 && p.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
        }));
    }

    #[test]
    fn test_same_millisecond_numbers_are_distinct() {
        // Pin the timestamp so only the random suffix separates the numbers.
        let millis = 1_760_870_400_000;
        let mut rng = rand::rng();
        let minted: HashSet<ReferenceNumber> = (0..64)
            .map(|_| ReferenceNumber::from_parts(ReferenceKind::Appointment, millis, rng.random()))
            .collect();
        assert_eq!(minted.len(), 64);

        let a = ReferenceNumber::generate(ReferenceKind::Quote);
        let b = ReferenceNumber::generate(ReferenceKind::Quote);
        assert_ne!(a, b);
    }

    #[test]
    fn test_identical_parts_collide() {
        // The generator alone cannot rule this out; the database constraint must.
        let a = ReferenceNumber::from_parts(ReferenceKind::Quote, 42, 7);
        let b = ReferenceNumber::from_parts(ReferenceKind::Quote, 42, 7);
        assert_eq!(a, b);
    }
}
