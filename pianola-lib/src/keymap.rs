//! Translation from song action ids to actuator key names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const DEFAULT_KEYS: [&str; 15] = [
    "y", "u", "i", "o", "p", "h", "j", "k", "l", ";", "n", "m", ",", ".", "/",
];

/// Index table used to resolve ids such as `1Key5` to a key name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMapping {
    keys: BTreeMap<u32, String>,
}

impl Default for KeyMapping {
    /// The 15-key layout: three rows of five keys.
    fn default() -> Self {
        Self::from_keys(DEFAULT_KEYS.iter().enumerate().map(|(i, k)| (i as u32, *k)))
    }
}

impl KeyMapping {
    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = (u32, K)>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(|(i, k)| (i, k.into())).collect(),
        }
    }

    /// Resolve an action id of the form `<prefix>Key<index>`.
    ///
    /// Returns `None` when the id is malformed or the index has no key.
    pub fn resolve(&self, action_id: &str) -> Option<&str> {
        let mut parts = action_id.split("Key");
        let (_prefix, index, rest) = (parts.next()?, parts.next()?, parts.next());
        if rest.is_some() {
            return None;
        }
        let index = index.trim();
        if index.is_empty() {
            return None;
        }
        let index = index.parse::<u32>().ok()?;
        self.keys.get(&index).map(String::as_str)
    }

    /// Every key name this mapping can produce.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
