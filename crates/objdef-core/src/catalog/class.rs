//! Class definitions: a named, ordered set of field definitions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RequestContext;
use crate::error::{Error, Result};

use super::definition::FieldDefinition;
use super::options::OptionsProviderRegistry;

/// A class definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefinition {
    name: String,
    #[serde(default)]
    field_definitions: Vec<FieldDefinition>,
}

impl ClassDefinition {
    /// Create an empty class definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_definitions: Vec::new(),
        }
    }

    /// Add a field definition.
    pub fn with_field(mut self, field: impl Into<FieldDefinition>) -> Self {
        self.field_definitions.push(field.into());
        self
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field definitions in declaration order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.field_definitions
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field_definitions.iter().find(|f| f.name() == name)
    }

    /// Get a field by name, failing when absent.
    pub fn field(&self, name: &str) -> Result<&FieldDefinition> {
        self.get_field(name)
            .ok_or_else(|| Error::UnknownField(format!("{}.{}", self.name, name)))
    }

    /// Get a field by name, mutable.
    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.field_definitions.iter_mut().find(|f| f.name() == name)
    }

    /// Run definition-save checks on the class and every field.
    ///
    /// Nothing is persisted by this layer; callers persist the definition only
    /// after this returns `Ok`.
    pub fn save_definition(&self, providers: &OptionsProviderRegistry) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Definition {
                field: String::new(),
                message: "class name must not be empty".into(),
            });
        }

        let mut seen = HashSet::new();
        for field in &self.field_definitions {
            let name = field.name();
            if name.trim().is_empty() {
                return Err(Error::Definition {
                    field: name.to_string(),
                    message: "field name must not be empty".into(),
                });
            }
            if !seen.insert(name) {
                return Err(Error::Definition {
                    field: name.to_string(),
                    message: format!("duplicate field in class {}", self.name),
                });
            }
            field.pre_save(providers)?;
        }

        debug!(
            class = %self.name,
            fields = self.field_definitions.len(),
            "class definition passed pre-save checks"
        );
        Ok(())
    }

    /// Parse a class definition from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON, as seen by the given request.
    pub fn to_json(&self, request: &RequestContext) -> Result<String> {
        let export = ClassDefinition {
            name: self.name.clone(),
            field_definitions: self
                .field_definitions
                .iter()
                .map(|f| f.for_serialization(request))
                .collect(),
        };
        serde_json::to_string_pretty(&export).map_err(|e| Error::Serialization(e.to_string()))
    }
}
