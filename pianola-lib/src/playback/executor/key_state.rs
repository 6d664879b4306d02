//! Held/not-held bookkeeping for actuator keys.

use std::collections::HashMap;

/// Which keys the executor currently believes are pressed.
#[derive(Debug, Default)]
pub struct KeyState {
    held: HashMap<String, bool>,
}

impl KeyState {
    pub fn is_held(&self, key: &str) -> bool {
        self.held.get(key).copied().unwrap_or(false)
    }

    pub(super) fn set_held(&mut self, key: &str, held: bool) {
        match self.held.get_mut(key) {
            Some(entry) => *entry = held,
            None => {
                self.held.insert(key.to_string(), held);
            }
        }
    }

    /// Keys currently marked as held, sorted by name.
    pub fn held_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .held
            .iter()
            .filter(|(_, held)| **held)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}
