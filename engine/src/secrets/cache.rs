use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An in-memory cache in front of `SecretManager`.
///
/// Connectors look their key up on every call; this keeps those lookups off
/// the keychain after the first hit. Absent keys are cached too, so a missing
/// credential costs one keychain lookup per run rather than one per call.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, Option<SecretString>>>>,
}

impl SecretCache {
    /// Creates a new SecretCache wrapping the provided SecretManager
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Looks a secret up, consulting the memory cache first.
    pub fn lookup(&self, key: &str) -> Option<SecretString> {
        let key = key.to_uppercase();
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }

        let secret = self.manager.lookup(&key).map(SecretString::new);

        {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            cache.insert(key, secret.clone());
        }

        secret
    }

    /// Retrieves a required secret.
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        self.lookup(key)
            .ok_or_else(|| EngineError::MissingCredential(key.to_uppercase()))
    }

    /// Pre-loads a set of keys, failing on the first missing one.
    pub fn preload(&self, keys: &[&str]) -> Result<(), EngineError> {
        for key in keys {
            self.get_secret(key)?;
        }
        Ok(())
    }
}
