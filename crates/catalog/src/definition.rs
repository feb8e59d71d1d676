//! Schema for a single effect entry in the catalog table.
//!
//! Types:
//!
//! - `EffectDefinition` captures identity, the opaque fragment body, and the
//!   ordered custom parameters the effect exposes.
//! - `CustomParameter` describes one extra float uniform with its range and
//!   default.
//!
//! Functions:
//!
//! - `EffectDefinition::validate` returns human-readable issues so the catalog
//!   loader can reject inconsistent entries without panicking.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::uniforms;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EffectDefinition {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Body of the fragment program. It must define `vec4 effect(vec2 fragCoord)`
    /// and may reference the shared uniforms plus its own custom uniforms.
    #[serde(rename = "fragment")]
    pub fragment_source: String,
    #[serde(default, rename = "parameters")]
    pub custom_parameters: Vec<CustomParameter>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CustomParameter {
    pub name: String,
    pub label: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    #[serde(rename = "uniform")]
    pub uniform_name: String,
}

impl EffectDefinition {
    pub fn custom_parameter(&self, name: &str) -> Option<&CustomParameter> {
        self.custom_parameters.iter().find(|param| param.name == name)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.id.trim().is_empty() {
            issues.push("effect id must not be empty".to_string());
        }
        if !self
            .id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            issues.push(format!(
                "effect id '{}' may only contain ASCII letters, digits, '-' and '_'",
                self.id
            ));
        }
        if !self.fragment_source.contains("effect(") {
            issues.push(format!(
                "effect '{}' fragment source does not define effect(vec2)",
                self.id
            ));
        }

        let mut names = HashSet::new();
        let mut uniform_names = HashSet::new();
        for param in &self.custom_parameters {
            if !names.insert(param.name.as_str()) {
                issues.push(format!(
                    "effect '{}' declares parameter '{}' more than once",
                    self.id, param.name
                ));
            }
            if !uniform_names.insert(param.uniform_name.as_str()) {
                issues.push(format!(
                    "effect '{}' binds uniform '{}' more than once",
                    self.id, param.uniform_name
                ));
            }
            if uniforms::is_builtin(&param.uniform_name) {
                issues.push(format!(
                    "effect '{}' parameter '{}' shadows built-in uniform '{}'",
                    self.id, param.name, param.uniform_name
                ));
            }
            if !is_glsl_identifier(&param.uniform_name) {
                issues.push(format!(
                    "effect '{}' parameter '{}' uses invalid uniform name '{}'",
                    self.id, param.name, param.uniform_name
                ));
            }
            if !(param.min <= param.default && param.default <= param.max) {
                issues.push(format!(
                    "effect '{}' parameter '{}' default {} lies outside [{}, {}]",
                    self.id, param.name, param.default, param.min, param.max
                ));
            }
        }
        issues
    }
}

fn is_glsl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    !name.starts_with("gl_") && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(params: Vec<CustomParameter>) -> EffectDefinition {
        EffectDefinition {
            id: "demo".into(),
            display_name: "Demo".into(),
            description: None,
            fragment_source: "vec4 effect(vec2 fragCoord) { return vec4(1.0); }".into(),
            custom_parameters: params,
        }
    }

    fn param(name: &str, uniform: &str, default: f32) -> CustomParameter {
        CustomParameter {
            name: name.into(),
            label: name.into(),
            min: 0.0,
            max: 10.0,
            default,
            uniform_name: uniform.into(),
        }
    }

    #[test]
    fn accepts_well_formed_definition() {
        let def = definition(vec![param("frequency", "u_frequency", 3.0)]);
        assert!(def.validate().is_empty());
        assert_eq!(def.custom_parameter("frequency").unwrap().default, 3.0);
    }

    #[test]
    fn rejects_duplicate_uniform_names() {
        let def = definition(vec![
            param("a", "u_shared", 1.0),
            param("b", "u_shared", 1.0),
        ]);
        let issues = def.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("u_shared"));
    }

    #[test]
    fn rejects_builtin_shadowing_and_out_of_range_default() {
        let def = definition(vec![param("speedy", "u_speed", 42.0)]);
        let issues = def.validate();
        assert!(issues.iter().any(|issue| issue.contains("shadows")));
        assert!(issues.iter().any(|issue| issue.contains("outside")));
    }
}
