//! Dynamic options providers.
//!
//! A multiselect field can name a provider in `optionsProviderClass`; the
//! provider then supplies the option catalog for a given context instead of
//! the static `options` list. Providers are registered by name and injected
//! into the operations that consult them.

use std::collections::HashMap;
use std::sync::Arc;

use objdef_proto::SelectOption;
use parking_lot::RwLock;
use thiserror::Error;

use crate::field::Multiselect;

/// Context handed to an options provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionsContext {
    /// Id of the object being edited, if any.
    pub object_id: Option<u64>,
    /// Class of the object being edited, if any.
    pub class_name: Option<String>,
    /// Field the options are for.
    pub field_name: String,
    /// Purpose of the request (e.g. `editmode`, `gridview`).
    pub purpose: Option<String>,
}

impl OptionsContext {
    /// Context naming only the field.
    pub fn for_field(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Default::default()
        }
    }

    /// Set the object.
    pub fn with_object(mut self, object_id: u64, class_name: impl Into<String>) -> Self {
        self.object_id = Some(object_id);
        self.class_name = Some(class_name.into());
        self
    }

    /// Set the purpose.
    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }
}

/// Failure inside an options provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("options provider {provider} failed: {message}")]
pub struct OptionsProviderError {
    /// Provider name.
    pub provider: String,
    /// Failure description.
    pub message: String,
}

impl OptionsProviderError {
    /// Create a provider error.
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Supplies the option catalog of a multiselect field.
pub trait OptionsProvider: Send + Sync {
    /// Options for the field in this context.
    fn get_options(
        &self,
        context: &OptionsContext,
        definition: &Multiselect,
    ) -> Result<Vec<SelectOption>, OptionsProviderError>;
}

/// Providers by name.
#[derive(Default)]
pub struct OptionsProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn OptionsProvider>>>,
}

impl OptionsProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under a name, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn OptionsProvider>) {
        self.providers.write().insert(name.into(), provider);
    }

    /// Register a provider, builder style.
    pub fn with_provider(self, name: impl Into<String>, provider: Arc<dyn OptionsProvider>) -> Self {
        self.register(name, provider);
        self
    }

    /// Provider for a configured name; `None` for no name or an unknown one.
    pub fn resolve(&self, name: Option<&str>) -> Option<Arc<dyn OptionsProvider>> {
        let name = name.map(str::trim).filter(|n| !n.is_empty())?;
        self.providers.read().get(name).cloned()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Whether no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

impl std::fmt::Debug for OptionsProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.providers.read().keys().cloned().collect();
        f.debug_struct("OptionsProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}

/// Provider returning a fixed catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticOptionsProvider {
    options: Vec<SelectOption>,
}

impl StaticOptionsProvider {
    /// Create a provider for a fixed catalog.
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self { options }
    }
}

impl OptionsProvider for StaticOptionsProvider {
    fn get_options(
        &self,
        _context: &OptionsContext,
        _definition: &Multiselect,
    ) -> Result<Vec<SelectOption>, OptionsProviderError> {
        Ok(self.options.clone())
    }
}
