//! Discovery expansion
//!
//! Turns a node's declared peers and blocks into new frontier entries.

use crate::storage::{Storage, StorageResult};
use crate::url::normalize_node_name;
use std::collections::BTreeSet;

/// Counts from one expansion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Distinct usable candidate names
    pub candidates: usize,
    /// Names that were new to the store
    pub inserted: usize,
}

/// Inserts every candidate not yet known to the store as unclassified
///
/// Existence is checked with a single query over the whole candidate set,
/// against the store's current state. The insert itself is insert-if-absent,
/// so repeated or overlapping expansions never create duplicates.
pub fn expand<'a, S>(
    store: &mut S,
    candidates: impl IntoIterator<Item = &'a String>,
) -> StorageResult<Expansion>
where
    S: Storage + ?Sized,
{
    let names: BTreeSet<String> = candidates
        .into_iter()
        .filter_map(|raw| {
            let name = normalize_node_name(raw);
            if name.is_none() {
                tracing::debug!("Skipping unusable node name {:?}", raw);
            }
            name
        })
        .collect();

    if names.is_empty() {
        return Ok(Expansion::default());
    }

    let names: Vec<String> = names.into_iter().collect();
    let existing = store.existing_names(&names)?;
    let fresh: Vec<String> = names
        .iter()
        .filter(|name| !existing.contains(*name))
        .cloned()
        .collect();

    let inserted = store.insert_many(&fresh)?;

    Ok(Expansion {
        candidates: names.len(),
        inserted,
    })
}
