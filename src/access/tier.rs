//! Designer-tier resolution.

use crate::config::TierConfig;
use crate::models::{Actor, Role, Tier};

/// Resolve a fulfiller's tier. Non-fulfillers have none.
///
/// Priority order:
/// 1. explicit tier on the actor record;
/// 2. the configured allow-list (member => senior, everyone else junior);
/// 3. no allow-list configured: every fulfiller is senior, matching how the
///    system behaved before tiering existed.
pub fn resolve_tier(actor: &Actor, config: &TierConfig) -> Option<Tier> {
    if actor.role != Role::Fulfiller {
        return None;
    }
    if let Some(tier) = actor.tier {
        return Some(tier);
    }
    if config.is_configured() {
        if config.contains(&actor.email) {
            Some(Tier::Senior)
        } else {
            Some(Tier::Junior)
        }
    } else {
        Some(Tier::Senior)
    }
}

pub fn is_senior(actor: &Actor, config: &TierConfig) -> bool {
    resolve_tier(actor, config) == Some(Tier::Senior)
}

pub fn is_junior(actor: &Actor, config: &TierConfig) -> bool {
    resolve_tier(actor, config) == Some(Tier::Junior)
}
