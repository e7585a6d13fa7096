use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role that bypasses assignee checks in the button and alert projections.
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// The user performing an operation, with their roles.
///
/// Passed explicitly into every lifecycle call; nothing reads an ambient
/// "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub roles: BTreeSet<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMINISTRATOR_ROLE)
    }
}

/// A registered helpdesk user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub full_name: Option<String>,
    pub roles: BTreeSet<String>,
}

impl User {
    #[must_use]
    pub fn to_actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            roles: self.roles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_is_detected() {
        assert!(!Actor::new("bob").is_admin());
        assert!(Actor::new("root").with_role(ADMINISTRATOR_ROLE).is_admin());
        assert!(!Actor::new("carol").with_role("Agent").is_admin());
    }
}
