//! Model name resolution.
//!
//! [`MultiProvider`] routes `prefix/model` names through a prefix table with
//! one reserved default provider for unprefixed names.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::defaults::{ProviderDefaults, provider_defaults};
use crate::errors::{ModelError, ModelResult};
use crate::model::Model;

/// Resolves model names to [`Model`] instances.
pub trait ModelProvider: Send + Sync {
    /// Resolve `name`, or the provider's default model when `None`.
    fn get_model(&self, name: Option<&str>) -> ModelResult<Arc<dyn Model>>;
}

/// A provider backed by a constructor closure.
///
/// The closure receives the model name and the process defaults at resolution
/// time, so later calls to the default mutators take effect.
pub struct FnModelProvider<F> {
    build: F,
}

impl<F> FnModelProvider<F>
where
    F: Fn(&str, &ProviderDefaults) -> ModelResult<Arc<dyn Model>> + Send + Sync,
{
    /// Wrap a constructor.
    pub fn new(build: F) -> Self {
        Self { build }
    }
}

impl<F> ModelProvider for FnModelProvider<F>
where
    F: Fn(&str, &ProviderDefaults) -> ModelResult<Arc<dyn Model>> + Send + Sync,
{
    fn get_model(&self, name: Option<&str>) -> ModelResult<Arc<dyn Model>> {
        let defaults = provider_defaults();
        let name = name.unwrap_or(&defaults.default_model).to_owned();
        (self.build)(&name, &defaults)
    }
}

/// Prefix-routing provider.
///
/// `"acme/large"` resolves `"large"` through the provider registered as
/// `acme`; unprefixed names go to the default provider. Unknown prefixes are
/// a configuration error.
pub struct MultiProvider {
    default: Arc<dyn ModelProvider>,
    by_prefix: HashMap<String, Arc<dyn ModelProvider>>,
}

impl MultiProvider {
    /// Create with the provider for unprefixed names.
    pub fn new(default: Arc<dyn ModelProvider>) -> Self {
        Self {
            default,
            by_prefix: HashMap::new(),
        }
    }

    /// Register a provider for `prefix`.
    #[must_use]
    pub fn with_provider(mut self, prefix: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        let _ = self.by_prefix.insert(prefix.into(), provider);
        self
    }

    /// Registered prefixes, sorted.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.by_prefix.keys().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }
}

impl ModelProvider for MultiProvider {
    fn get_model(&self, name: Option<&str>) -> ModelResult<Arc<dyn Model>> {
        let Some(name) = name else {
            return self.default.get_model(None);
        };
        match name.split_once('/') {
            Some((prefix, model)) => {
                let provider = self
                    .by_prefix
                    .get(prefix)
                    .ok_or_else(|| ModelError::UnknownProvider {
                        prefix: prefix.to_owned(),
                    })?;
                debug!(prefix, model, "routing model through prefixed provider");
                provider.get_model(Some(model))
            }
            None => self.default.get_model(Some(name)),
        }
    }
}

impl fmt::Debug for MultiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiProvider")
            .field("prefixes", &self.prefixes())
            .finish_non_exhaustive()
    }
}
