use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::{GeminiBackend, MistralBackend, ScoringBackend};
use crate::config::BackendSettings;
use crate::error::{AppError, Result};

/// Builds a backend from the backend configuration section.
pub type BackendFactory =
    Arc<dyn Fn(&BackendSettings) -> Result<Arc<dyn ScoringBackend>> + Send + Sync>;

/// Registry of named backend factories. Gemini is the default.
///
/// Hosts add their own providers with [`BackendSelector::register`] before
/// resolving; the configured `backend.provider` picks one by name.
#[derive(Clone)]
pub struct BackendSelector {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendSelector {
    pub const DEFAULT: &'static str = GeminiBackend::NAME;

    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the built-in Gemini and Mistral backends.
    pub fn with_builtins() -> Self {
        let mut selector = Self::empty();
        selector.register(GeminiBackend::NAME, |settings: &BackendSettings| {
            let backend = GeminiBackend::new(
                settings.gemini.clone(),
                Duration::from_secs(settings.timeout_secs),
            )?;
            Ok(Arc::new(backend) as Arc<dyn ScoringBackend>)
        });
        selector.register(MistralBackend::NAME, |settings: &BackendSettings| {
            let backend = MistralBackend::new(
                settings.mistral.clone(),
                Duration::from_secs(settings.timeout_secs),
            )?;
            Ok(Arc::new(backend) as Arc<dyn ScoringBackend>)
        });
        selector
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&BackendSettings) -> Result<Arc<dyn ScoringBackend>> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.trim().to_lowercase(), Arc::new(factory));
        self
    }

    /// Register an already constructed backend under `name`.
    pub fn register_instance(&mut self, name: &str, backend: Arc<dyn ScoringBackend>) -> &mut Self {
        self.register(name, move |_| Ok(backend.clone()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Resolve the configured provider. A blank provider means the default.
    pub fn resolve(&self, settings: &BackendSettings) -> Result<Arc<dyn ScoringBackend>> {
        let requested = settings.provider.trim().to_lowercase();
        let name = if requested.is_empty() {
            Self::DEFAULT.to_string()
        } else {
            requested
        };

        let factory = self.factories.get(&name).ok_or_else(|| {
            AppError::configuration(format!(
                "Unknown scoring backend \"{}\" (available: {})",
                name,
                self.names().join(", ")
            ))
        })?;

        let backend = factory(settings)?;
        tracing::info!("Using scoring backend: {}", backend.name());
        Ok(backend)
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::with_builtins()
    }
}
