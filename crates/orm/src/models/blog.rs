use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::record::Key;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Blog {
    pub id: Key,
    pub title: String,
    pub description: String,
    pub created_date: DateTime<Utc>,
}

impl Entity for Blog {
    fn entity_name() -> &'static str {
        "Blog"
    }

    fn key(&self) -> Key {
        self.id
    }
}
