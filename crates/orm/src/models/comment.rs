use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::record::Key;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Comment {
    pub id: Key,
    pub author: String,
    pub content: String,
    pub created_date: DateTime<Utc>,
    pub post_id: Key,
}

impl Entity for Comment {
    fn entity_name() -> &'static str {
        "Comment"
    }

    fn key(&self) -> Key {
        self.id
    }
}
