//! Persistent identifiers for serialized elements.
//!
//! Serialization needs a stable DSL identifier for every element. Elements
//! that already carry one keep it; the rest get a fresh random id. Ids live
//! in a side-table keyed by element id, so emitting never mutates the input.

use crate::model::SceneElement;
use rand::Rng;
use std::collections::HashMap;

/// Length of generated ids.
pub const DEFAULT_ID_LENGTH: usize = 15;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// A random alphanumeric id of `len` characters.
pub fn random_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// Element id → persistent id, assigned at most once per element id.
#[derive(Debug, Default, Clone)]
pub struct PersistentIds {
    by_element: HashMap<String, String>,
    generated: usize,
}

impl PersistentIds {
    /// Assign an id to every element up front, keeping existing ones.
    ///
    /// When several elements share an element id, the first one decides.
    pub fn assign(elements: &[SceneElement], id_len: usize) -> Self {
        let mut ids = Self::default();
        for element in elements {
            if ids.by_element.contains_key(element.id()) {
                continue;
            }
            let pid = match element.persistent_id() {
                Some(existing) if !existing.is_empty() => existing.to_string(),
                _ => {
                    ids.generated += 1;
                    random_id(id_len)
                }
            };
            ids.by_element.insert(element.id().to_string(), pid);
        }
        if ids.generated > 0 {
            log::debug!("generated {} persistent ids", ids.generated);
        }
        ids
    }

    pub fn get(&self, element_id: &str) -> Option<&str> {
        self.by_element.get(element_id).map(String::as_str)
    }

    /// Number of ids that were freshly generated.
    pub fn generated(&self) -> usize {
        self.generated
    }

    /// Write the assigned ids back onto `elements`, for callers that want
    /// later serializations to reuse them.
    pub fn apply(&self, elements: &mut [SceneElement]) {
        for element in elements {
            if let Some(pid) = self.by_element.get(element.id()) {
                if element.persistent_id() != Some(pid.as_str()) {
                    element.set_persistent_id(pid.clone());
                }
            }
        }
    }
}
