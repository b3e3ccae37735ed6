use serde::{Deserialize, Serialize};

use crate::identity;

/// The three actor classes plus the administrative override role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Submitter,
    Fulfiller,
    Approver,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Submitter => "submitter",
            Role::Fulfiller => "fulfiller",
            Role::Approver => "approver",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match identity::normalize(s).as_str() {
            "submitter" => Ok(Role::Submitter),
            "fulfiller" | "designer" => Ok(Role::Fulfiller),
            "approver" => Ok(Role::Approver),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other:?}")),
        }
    }
}

/// Seniority among fulfillers. Meaningless for other roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Senior,
    Junior,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Senior => "senior",
            Tier::Junior => "junior",
        }
    }
}

/// A requesting user. Identity is the `(id, email)` pair; historical records
/// may have stored either one, so matching code tries both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    /// Explicit tier, when the record carries one. `None` defers to the
    /// configured allow-list (see [`crate::access::tier`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Actor {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: String::new(),
            role,
            tier: None,
            active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn norm_id(&self) -> String {
        identity::normalize(&self.id)
    }

    pub fn norm_email(&self) -> String {
        identity::normalize(&self.email)
    }
}
