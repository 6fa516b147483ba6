use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::types::{display_value, CellType, STANDARD_TYPES};
use crate::error::RegistryError;

/// A host supplied cell type.
///
/// Providers are validated once, when registered, so that column resolution
/// can rely on a fixed set of capabilities.
pub trait CellTypeProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Type attributes the provider understands; others are dropped
    fn type_attributes(&self) -> &[&str] {
        &[]
    }

    fn editable(&self) -> bool {
        false
    }

    fn actionable_elements(&self) -> usize {
        0
    }

    fn format(&self, value: &Value, _attributes: &Map<String, Value>) -> String {
        display_value(value)
    }

    fn validate(&self, _value: &Value) -> bool {
        true
    }
}

#[derive(Clone, Default)]
pub struct CellTypeRegistry {
    providers: HashMap<String, Arc<dyn CellTypeProvider>>,
}

impl fmt::Debug for CellTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.providers.keys().collect();
        names.sort();
        f.debug_struct("CellTypeRegistry").field("providers", &names).finish()
    }
}

impl CellTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn CellTypeProvider>) -> Result<(), RegistryError> {
        let name = provider.name().trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if STANDARD_TYPES.contains(&name.as_str()) {
            return Err(RegistryError::ReservedName(name));
        }
        if self.providers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        if provider.type_attributes().iter().any(|a| a.trim().is_empty()) {
            return Err(RegistryError::EmptyAttribute { name });
        }
        debug!(cell_type = %name, "registered custom cell type");
        self.providers.insert(name, provider);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CellTypeProvider>> {
        self.providers.get(name)
    }

    pub fn provider_for(&self, cell_type: &CellType) -> Option<&Arc<dyn CellTypeProvider>> {
        match cell_type {
            CellType::Custom(name) => self.get(name),
            _ => None,
        }
    }

    /// Resolve a declared type name; unknown types fall back to text
    pub fn resolve(&self, type_name: Option<&str>) -> CellType {
        let Some(name) = type_name.map(str::trim).filter(|n| !n.is_empty()) else {
            return CellType::Text;
        };
        if let Some(t) = CellType::from_standard_name(name) {
            return t;
        }
        if self.providers.contains_key(name) {
            return CellType::Custom(name.to_string());
        }
        warn!(cell_type = name, fallback = "text", "unknown cell type");
        CellType::Text
    }

    pub fn editable(&self, cell_type: &CellType) -> bool {
        match self.provider_for(cell_type) {
            Some(p) => p.editable(),
            None => cell_type.supports_inline_edit(),
        }
    }

    pub fn actionable_elements(&self, cell_type: &CellType) -> usize {
        match self.provider_for(cell_type) {
            Some(p) => p.actionable_elements(),
            None => cell_type.actionable_elements(),
        }
    }

    pub fn format(&self, cell_type: &CellType, value: &Value, attributes: &Map<String, Value>) -> String {
        match self.provider_for(cell_type) {
            Some(p) => p.format(value, attributes),
            None => display_value(value),
        }
    }

    pub fn validate(&self, cell_type: &CellType, value: &Value) -> bool {
        match self.provider_for(cell_type) {
            Some(p) => p.validate(value),
            None => super::types::value_is_valid(cell_type, value),
        }
    }

    /// Keep only the type attributes a custom provider declares
    pub fn filter_type_attributes(&self, cell_type: &CellType, attributes: &Map<String, Value>) -> Map<String, Value> {
        let Some(provider) = self.provider_for(cell_type) else {
            return attributes.clone();
        };
        let allowed = provider.type_attributes();
        attributes
            .iter()
            .filter(|(name, _)| {
                let keep = allowed.contains(&name.as_str());
                if !keep {
                    warn!(cell_type = cell_type.name(), attribute = %name, "dropping undeclared type attribute");
                }
                keep
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
