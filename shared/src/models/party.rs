//! Vendor and customer references carried on a quote

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A vendor or customer as shown on a quote
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Party {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Party {
    pub fn new(id: Uuid, name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email,
        }
    }
}
