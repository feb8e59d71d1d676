use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::definition::EffectDefinition;

/// Catalog table compiled into the binary.
const BUILTIN_CATALOG: &str = include_str!("../effects.toml");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("effect '{0}' is not registered in the catalog")]
    NotFound(String),
    #[error("failed to parse effect catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid effect catalog: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: u32,
    #[serde(default, rename = "effect")]
    effects: Vec<EffectDefinition>,
}

/// Read-only registry of effect definitions keyed by id.
///
/// Registration order is preserved so selection controls list effects in the
/// order they appear in the table.
#[derive(Debug, Clone)]
pub struct EffectCatalog {
    effects: Vec<Arc<EffectDefinition>>,
    index: HashMap<String, usize>,
}

impl EffectCatalog {
    /// Parses the catalog shipped with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(input)?;
        if file.version != 1 {
            return Err(CatalogError::Invalid(format!(
                "unsupported catalog version {}; expected 1",
                file.version
            )));
        }
        Self::from_definitions(file.effects)
    }

    pub fn from_definitions(definitions: Vec<EffectDefinition>) -> Result<Self, CatalogError> {
        if definitions.is_empty() {
            return Err(CatalogError::Invalid(
                "catalog must register at least one effect".into(),
            ));
        }

        let mut effects = Vec::with_capacity(definitions.len());
        let mut index = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let issues = definition.validate();
            if !issues.is_empty() {
                return Err(CatalogError::Invalid(issues.join("; ")));
            }
            if index.contains_key(&definition.id) {
                return Err(CatalogError::Invalid(format!(
                    "effect id '{}' is registered more than once",
                    definition.id
                )));
            }
            index.insert(definition.id.clone(), effects.len());
            effects.push(Arc::new(definition));
        }

        tracing::debug!(count = effects.len(), "loaded effect catalog");
        Ok(Self { effects, index })
    }

    pub fn get(&self, id: &str) -> Result<Arc<EffectDefinition>, CatalogError> {
        self.index
            .get(id)
            .map(|&position| Arc::clone(&self.effects[position]))
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> &[Arc<EffectDefinition>] {
        &self.effects
    }

    /// First registered effect; the catalog is never empty.
    pub fn default_effect(&self) -> Arc<EffectDefinition> {
        Arc::clone(&self.effects[0])
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads_in_registration_order() {
        let catalog = EffectCatalog::builtin().expect("builtin catalog");
        let ids: Vec<&str> = catalog.list().iter().map(|def| def.id.as_str()).collect();
        assert_eq!(ids, ["plasma", "aurora", "liquid", "grid", "vortex"]);
        assert_eq!(catalog.default_effect().id, "plasma");
    }

    #[test]
    fn plasma_declares_frequency_with_default_three() {
        let catalog = EffectCatalog::builtin().unwrap();
        let plasma = catalog.get("plasma").unwrap();
        let frequency = plasma.custom_parameter("frequency").expect("frequency");
        assert_eq!(frequency.default, 3.0);
        assert_eq!(frequency.uniform_name, "u_frequency");
    }

    #[test]
    fn unknown_id_is_reported_as_not_found() {
        let catalog = EffectCatalog::builtin().unwrap();
        let err = catalog.get("does-not-exist").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(id) if id == "does-not-exist"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let table = r#"
version = 1

[[effect]]
id = "twin"
name = "Twin"
fragment = "vec4 effect(vec2 fragCoord) { return vec4(1.0); }"

[[effect]]
id = "twin"
name = "Twin again"
fragment = "vec4 effect(vec2 fragCoord) { return vec4(0.0); }"
"#;
        let err = EffectCatalog::from_toml_str(table).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(message) if message.contains("twin")));
    }

    #[test]
    fn rejects_empty_catalog() {
        let err = EffectCatalog::from_toml_str("version = 1").unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }
}
