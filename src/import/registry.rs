//! Process-wide importer registry.
//!
//! The original design relies on load-time side effects; here the table is
//! populated once, explicitly, by the application's composition root via
//! `ImporterRegistry::register`. Registering the same `registry_type`
//! twice is a programmer error and fails fast.

use std::sync::Arc;

use dashmap::DashMap;
use reqwest::Client;

use crate::error::DirectoryError;

use super::config::ImportConfig;
use super::fetcher::RegistryClient;

pub type ImporterConstructor =
    Arc<dyn Fn(Client, &ImportConfig) -> Result<Arc<dyn RegistryClient>, DirectoryError> + Send + Sync>;

/// A table of `registry_type -> constructor`. Not a global: the
/// composition root owns one instance and threads it through explicitly,
/// so registration never depends on module load order.
#[derive(Default)]
pub struct ImporterRegistry {
    constructors: DashMap<String, ImporterConstructor>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        ImporterRegistry::default()
    }

    /// Fails fast if `registry_type` is already registered.
    pub fn register(
        &self,
        registry_type: impl Into<String>,
        constructor: ImporterConstructor,
    ) -> Result<(), DirectoryError> {
        let registry_type = registry_type.into();
        if self.constructors.contains_key(&registry_type) {
            return Err(DirectoryError::validation(format!(
                "registry type already registered: {registry_type}"
            )));
        }
        self.constructors.insert(registry_type, constructor);
        Ok(())
    }

    pub fn create(
        &self,
        client: Client,
        config: &ImportConfig,
    ) -> Result<Arc<dyn RegistryClient>, DirectoryError> {
        config.validate()?;
        let constructor = self.constructors.get(&config.registry_type).ok_or_else(|| {
            DirectoryError::validation(format!(
                "no importer registered for registry type: {}",
                config.registry_type
            ))
        })?;
        constructor(client, config)
    }
}
