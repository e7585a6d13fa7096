use serde::{Deserialize, Serialize};

/// A support team tickets can be routed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub created_at_us: i64,
}

/// A product the helpdesk supports, with the team that looks after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub name: String,
    pub description: Option<String>,
    pub team: Option<String>,
    pub modified_at_us: i64,
}
