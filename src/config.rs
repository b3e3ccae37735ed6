use std::collections::BTreeSet;

use crate::identity;

/// Env var holding the comma-separated senior fulfiller emails.
pub const SENIOR_FULFILLERS_ENV: &str = "TASKGATE_SENIOR_FULFILLERS";

/// The configured senior-tier allow-list, loaded once at startup and passed
/// explicitly into the resolvers so the decision functions stay pure.
///
/// Two regimes exist and both are deliberate:
/// - allow-list configured (non-empty): fulfillers on it are senior, everyone
///   else is junior;
/// - no allow-list at all: the organization has not adopted tiering and every
///   fulfiller keeps the historical senior behavior.
///
/// A configured-but-empty list behaves like the second regime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierConfig {
    seniors: BTreeSet<String>,
}

impl TierConfig {
    /// No allow-list: tiering not adopted.
    pub fn untiered() -> Self {
        Self::default()
    }

    pub fn with_seniors<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seniors = emails
            .into_iter()
            .map(|e| identity::normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { seniors }
    }

    /// Parse a comma/semicolon-separated list, e.g. from the env var.
    pub fn parse(raw: &str) -> Self {
        Self::with_seniors(raw.split([',', ';']))
    }

    /// Load from `TASKGATE_SENIOR_FULFILLERS`; an unset var means untiered.
    pub fn from_env() -> Self {
        match std::env::var(SENIOR_FULFILLERS_ENV) {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Self::untiered(),
        }
    }

    /// Whether a non-empty allow-list exists.
    pub fn is_configured(&self) -> bool {
        !self.seniors.is_empty()
    }

    pub fn contains(&self, email: &str) -> bool {
        self.seniors.contains(&identity::normalize(email))
    }

    pub fn seniors(&self) -> impl Iterator<Item = &str> {
        self.seniors.iter().map(String::as_str)
    }
}
