//! Status and classification enums for shop entities.
//!
//! Each enum maps to a `PostgreSQL` enum type (with the `postgres` feature)
//! and serializes with the same lowercase/kebab-case spelling used in the
//! database and the JSON API.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an enum value from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// The enum being parsed (e.g. "quote status").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in lifecycle/declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical string form used in the database and the API.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Authorization level of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Storefront customer.
    #[default]
    Customer,
    /// Back-office administrator.
    Admin,
}

string_enum!(UserRole, "user role", {
    Customer => "customer",
    Admin => "admin",
});

impl UserRole {
    /// Whether this role may use the admin API.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Quote lifecycle status.
///
/// ```text
/// pending ──► sent ──► accepted
///    │          ├────► rejected
///    └──────────┴────► expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "quote_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

string_enum!(QuoteStatus, "quote status", {
    Pending => "pending",
    Sent => "sent",
    Accepted => "accepted",
    Rejected => "rejected",
    Expired => "expired",
});

impl QuoteStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Setting the current status again is always allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Pending | Self::Sent | Self::Expired)
                | (
                    Self::Sent,
                    Self::Sent | Self::Accepted | Self::Rejected | Self::Expired
                )
                | (Self::Accepted, Self::Accepted)
                | (Self::Rejected, Self::Rejected)
                | (Self::Expired, Self::Expired)
        )
    }

    /// Accepted quotes are a customer commitment and must be kept.
    #[must_use]
    pub const fn is_deletable(self) -> bool {
        !matches!(self, Self::Accepted)
    }

    /// Whether the quote can be (re)sent to the customer.
    #[must_use]
    pub const fn is_sendable(self) -> bool {
        matches!(self, Self::Pending | Self::Sent)
    }
}

/// Appointment lifecycle status.
///
/// ```text
/// scheduled ──► confirmed ──► in-progress ──► completed
///     │             │              │
///     └─────────────┴──────────────┴────────► cancelled
///     └─────────────┴───────────────────────► no-show
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "appointment_status", rename_all = "kebab-case")
)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

string_enum!(AppointmentStatus, "appointment status", {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    InProgress => "in-progress",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no-show",
});

impl AppointmentStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Setting the current status again is always allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (
                Self::Scheduled,
                Self::Confirmed | Self::Cancelled | Self::NoShow
            ) | (
                Self::Confirmed,
                Self::InProgress | Self::Cancelled | Self::NoShow
            ) | (Self::InProgress, Self::Completed | Self::Cancelled)
        )
    }
}

/// Tire season classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "tire_season", rename_all = "kebab-case")
)]
#[serde(rename_all = "kebab-case")]
pub enum TireSeason {
    Summer,
    Winter,
    AllSeason,
}

string_enum!(TireSeason, "tire season", {
    Summer => "summer",
    Winter => "winter",
    AllSeason => "all-season",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_agree() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.to_string().parse::<AppointmentStatus>().unwrap(), *status);
        }
        for status in QuoteStatus::ALL {
            assert_eq!(status.as_str().parse::<QuoteStatus>().unwrap(), *status);
        }
        assert_eq!(" Admin ".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("ALL-SEASON".parse::<TireSeason>().unwrap(), TireSeason::AllSeason);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "archived".parse::<QuoteStatus>().unwrap_err();
        assert_eq!(err.kind, "quote status");
        assert_eq!(err.to_string(), "invalid quote status: archived");
    }

    #[test]
    fn test_serde_spelling_matches_as_str() {
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::NoShow).unwrap(),
            "\"no-show\""
        );
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<TireSeason>("\"all-season\"").unwrap(),
            TireSeason::AllSeason
        );
    }

    #[test]
    fn test_quote_lifecycle() {
        use QuoteStatus::{Accepted, Expired, Pending, Rejected, Sent};

        assert!(Pending.can_transition_to(Sent));
        assert!(Pending.can_transition_to(Expired));
        assert!(Sent.can_transition_to(Accepted));
        assert!(Sent.can_transition_to(Rejected));
        assert!(Sent.can_transition_to(Expired));
        assert!(Accepted.can_transition_to(Accepted));

        assert!(!Pending.can_transition_to(Accepted));
        assert!(!Accepted.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Sent));
        assert!(!Expired.can_transition_to(Sent));
    }

    #[test]
    fn test_only_accepted_quotes_are_protected() {
        for status in QuoteStatus::ALL {
            assert_eq!(status.is_deletable(), *status != QuoteStatus::Accepted);
        }
    }

    #[test]
    fn test_appointment_lifecycle() {
        use AppointmentStatus::{Cancelled, Completed, Confirmed, InProgress, NoShow, Scheduled};

        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(NoShow));

        assert!(!Scheduled.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(NoShow));
        for terminal in [Completed, Cancelled, NoShow] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(Scheduled));
            assert!(terminal.can_transition_to(terminal));
        }
    }
}
