//! Persisted UI preferences (currently the dark-mode flag).

use std::sync::{Arc, RwLock};

use anyhow::Result;
use serde::Serialize;

use crate::storage::KeyValueStore;

pub const DARK_MODE_KEY: &str = "darkMode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreferencesView {
    pub dark_mode: bool,
}

pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    dark_mode: RwLock<bool>,
}

impl Preferences {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let dark_mode = store
            .get(DARK_MODE_KEY)
            .and_then(|raw| serde_json::from_str::<bool>(&raw).ok())
            .unwrap_or(false);
        Self {
            store,
            dark_mode: RwLock::new(dark_mode),
        }
    }

    pub fn view(&self) -> PreferencesView {
        PreferencesView {
            dark_mode: self.dark_mode(),
        }
    }

    pub fn dark_mode(&self) -> bool {
        *self.dark_mode.read().expect("preferences rwlock poisoned")
    }

    pub fn set_dark_mode(&self, on: bool) -> Result<bool> {
        let mut g = self.dark_mode.write().expect("preferences rwlock poisoned");
        self.store.set(DARK_MODE_KEY, if on { "true" } else { "false" })?;
        *g = on;
        Ok(on)
    }

    pub fn toggle_dark_mode(&self) -> Result<bool> {
        let next = !self.dark_mode();
        self.set_dark_mode(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_to_light_and_persists_toggle() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let p = Preferences::load(store.clone());
        assert!(!p.dark_mode());
        assert!(p.toggle_dark_mode().unwrap());
        assert_eq!(store.get(DARK_MODE_KEY).as_deref(), Some("true"));
        assert!(Preferences::load(store).dark_mode());
    }

    #[test]
    fn garbage_value_falls_back_to_false() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(DARK_MODE_KEY, "maybe").unwrap();
        assert!(!Preferences::load(store).dark_mode());
    }
}
