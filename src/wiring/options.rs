use std::{
    any::{Any, type_name},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use super::WiringError;

type Entry = Arc<dyn Any + Send + Sync>;

/// Key-value context shared by plugins during startup assembly.
///
/// Values are stored type-erased and recovered with a checked downcast, so a
/// lookup either yields the exact type asked for or a [`WiringError`].
#[derive(Default)]
pub struct PluginOptions {
    entries: HashMap<String, (Entry, &'static str)>,
}

impl PluginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store `value` under `key`. Each key can be set only once.
    pub fn set<T>(&mut self, key: impl Into<String>, value: Arc<T>) -> Result<(), WiringError>
    where
        T: Any + Send + Sync,
    {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(WiringError::AlreadyProvided { key });
        }
        let entry: Entry = value;
        self.entries.insert(key, (entry, type_name::<T>()));
        Ok(())
    }

    /// Look up `key` as a `T`.
    pub fn get<T>(&self, key: &str) -> Result<Arc<T>, WiringError>
    where
        T: Any + Send + Sync,
    {
        let (entry, found) = self
            .entries
            .get(key)
            .ok_or_else(|| WiringError::MissingDependency {
                key: key.to_string(),
            })?;

        entry
            .clone()
            .downcast::<T>()
            .map_err(|_| WiringError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
                found: *found,
            })
    }
}

impl fmt::Debug for PluginOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, (_, ty))| (k, ty)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_stored_value() {
        let mut options = PluginOptions::new();
        options.set("answer", Arc::new(42u32)).unwrap();

        assert_eq!(*options.get::<u32>("answer").unwrap(), 42);
        assert!(options.contains("answer"));
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_missing_key() {
        let options = PluginOptions::new();
        let err = options.get::<u32>("answer").unwrap_err();
        assert!(matches!(err, WiringError::MissingDependency { key } if key == "answer"));
    }

    #[test]
    fn test_wrong_type() {
        let mut options = PluginOptions::new();
        options.set("answer", Arc::new("forty-two".to_string())).unwrap();

        let err = options.get::<u32>("answer").unwrap_err();
        match err {
            WiringError::TypeMismatch {
                key,
                expected,
                found,
            } => {
                assert_eq!(key, "answer");
                assert_eq!(expected, "u32");
                assert!(found.ends_with("String"));
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_set_twice_rejected() {
        let mut options = PluginOptions::new();
        options.set("answer", Arc::new(1u32)).unwrap();

        let err = options.set("answer", Arc::new(2u32)).unwrap_err();
        assert!(matches!(err, WiringError::AlreadyProvided { .. }));
        assert_eq!(*options.get::<u32>("answer").unwrap(), 1);
    }
}
