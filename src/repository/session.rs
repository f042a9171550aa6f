//! UI-state storage scoped per operator (one backend user session).

use dashmap::DashMap;

/// Key under which the collapsed/expanded state of the score panel is kept.
pub const COLLAPSED_KEY: &str = "sitescore_collapsed";

pub trait SessionStore: Send + Sync {
    fn get_flag(&self, scope: &str, key: &str) -> Option<bool>;
    fn set_flag(&self, scope: &str, key: &str, value: bool);
}

/// Process-local session store. State is lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    flags: DashMap<(String, String), bool>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_flag(&self, scope: &str, key: &str) -> Option<bool> {
        self.flags
            .get(&(scope.to_string(), key.to_string()))
            .map(|entry| *entry.value())
    }

    fn set_flag(&self, scope: &str, key: &str, value: bool) {
        self.flags.insert((scope.to_string(), key.to_string()), value);
    }
}
