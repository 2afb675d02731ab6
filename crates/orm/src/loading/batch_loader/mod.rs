//! Manual batch loading helpers
//!
//! The batch pattern loads a level with one filtered scan (`key IN (...)`)
//! and stitches it onto its parents in memory. These helpers are public so a
//! caller can run the pattern by hand against any [`DataSource`].
//!
//! [`DataSource`]: crate::backends::DataSource

use std::collections::BTreeMap;

use crate::record::{Key, Record};
use crate::relationships::Node;

#[cfg(test)]
mod tests;

/// Group items by a key, keeping their order within each group.
/// Items without a key are dropped.
pub fn group_by_key<T, F>(items: impl IntoIterator<Item = T>, key_of: F) -> BTreeMap<Key, Vec<T>>
where
    F: Fn(&T) -> Option<Key>,
{
    let mut groups: BTreeMap<Key, Vec<T>> = BTreeMap::new();
    for item in items {
        if let Some(key) = key_of(&item) {
            groups.entry(key).or_default().push(item);
        }
    }
    groups
}

/// Group records by an integer attribute, usually a foreign key
pub fn group_by_attribute(records: impl IntoIterator<Item = Record>, attribute: &str) -> BTreeMap<Key, Vec<Record>> {
    group_by_key(records, |record| record.key_of(attribute))
}

/// Mark `relationship` loaded on every parent with the group found under the
/// parent's lookup key. Parents without a group get an empty collection.
pub fn attach<F>(parents: &mut [Node], relationship: &str, groups: &BTreeMap<Key, Vec<Node>>, key_of: F)
where
    F: Fn(&Node) -> Option<Key>,
{
    for parent in parents.iter_mut() {
        let related = key_of(parent)
            .and_then(|key| groups.get(&key))
            .cloned()
            .unwrap_or_default();
        parent.set_loaded(relationship, related);
    }
}
