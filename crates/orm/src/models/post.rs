use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Entity;
use crate::record::Key;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Post {
    pub id: Key,
    pub title: String,
    pub content: String,
    pub published_date: DateTime<Utc>,
    pub blog_id: Key,
}

impl Entity for Post {
    fn entity_name() -> &'static str {
        "Post"
    }

    fn key(&self) -> Key {
        self.id
    }
}
