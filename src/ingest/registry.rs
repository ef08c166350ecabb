use std::collections::HashMap;

use crate::error::CaptureError;

use super::{CaptureBackend, CaptureDevice};

/// Identifier that resolves to the registry default (auto-detect).
pub const ANY_BACKEND: &str = "any";

/// Registry of capture backends.
///
/// Single-threaded: the frame source is the only caller, so backends are held
/// by plain `Box` rather than behind a lock.
pub struct CaptureRegistry {
    backends: HashMap<String, Box<dyn CaptureBackend>>,
    default_name: Option<String>,
}

impl CaptureRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: CaptureBackend + 'static>(&mut self, backend: B) {
        let name = backend.id().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Box::new(backend));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<(), CaptureError> {
        if !self.backends.contains_key(name) {
            return Err(CaptureError::BackendNotRegistered(name.to_string()));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Name of the default backend.
    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Resolve an identifier, mapping `any` to the default backend.
    pub fn resolve(&self, name: &str) -> Result<&dyn CaptureBackend, CaptureError> {
        let key = if name == ANY_BACKEND {
            self.default_name
                .as_deref()
                .ok_or_else(|| CaptureError::BackendNotRegistered(name.to_string()))?
        } else {
            name
        };
        self.backends
            .get(key)
            .map(|backend| backend.as_ref())
            .ok_or_else(|| CaptureError::BackendNotRegistered(name.to_string()))
    }

    /// Open `index` on the named backend.
    pub fn open(&self, name: &str, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        self.resolve(name)?.open(index)
    }

    /// List registered backends.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl Default for CaptureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::SyntheticBackend;

    #[test]
    fn any_resolves_to_first_registered() {
        let mut registry = CaptureRegistry::new();
        registry.register(SyntheticBackend::new(4, 4).with_id("first"));
        registry.register(SyntheticBackend::new(4, 4).with_id("second"));

        assert_eq!(registry.default_name(), Some("first"));
        assert_eq!(registry.resolve(ANY_BACKEND).unwrap().id(), "first");

        registry.set_default("second").unwrap();
        assert_eq!(registry.resolve(ANY_BACKEND).unwrap().id(), "second");
        assert_eq!(registry.list(), vec!["first", "second"]);
    }

    #[test]
    fn unknown_backend_is_reported() {
        let registry = CaptureRegistry::new();
        assert!(matches!(
            registry.resolve("v4l2"),
            Err(CaptureError::BackendNotRegistered(name)) if name == "v4l2"
        ));
        assert!(registry.resolve(ANY_BACKEND).is_err());
        assert!(registry.is_empty());
    }
}
