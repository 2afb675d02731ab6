use serde::{Deserialize, Serialize};

use super::Entity;
use crate::record::Key;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub id: Key,
    pub name: String,
}

impl Entity for Tag {
    fn entity_name() -> &'static str {
        "Tag"
    }

    fn key(&self) -> Key {
        self.id
    }
}
