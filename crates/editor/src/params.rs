use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use catalog::{CatalogError, CustomParameter, EffectCatalog, EffectDefinition, PALETTE_SIZE};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

pub const DEFAULT_PALETTE: [Rgb; PALETTE_SIZE] = [
    Rgb::new(0x0b, 0x10, 0x26),
    Rgb::new(0xff, 0x2e, 0x97),
    Rgb::new(0xcc, 0xff, 0x00),
    Rgb::new(0x00, 0xe5, 0xff),
    Rgb::new(0xf5, 0xf5, 0xf5),
];

#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("effect '{effect}' does not declare a parameter named '{name}'")]
    UnknownParameter { effect: String, name: String },
    #[error("palette slot {0} is out of range; the palette has five colors")]
    PaletteIndex(usize),
}

/// The four global scalars every effect receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarField {
    Complexity,
    Zoom,
    Speed,
    Distortion,
}

impl ScalarField {
    pub const ALL: [ScalarField; 4] = [
        ScalarField::Zoom,
        ScalarField::Complexity,
        ScalarField::Speed,
        ScalarField::Distortion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarField::Complexity => "complexity",
            ScalarField::Zoom => "zoom",
            ScalarField::Speed => "speed",
            ScalarField::Distortion => "distortion",
        }
    }

    /// Uniform the field is bound to.
    pub fn uniform_name(self) -> &'static str {
        match self {
            ScalarField::Complexity => catalog::uniforms::COMPLEXITY,
            ScalarField::Zoom => catalog::uniforms::ZOOM,
            ScalarField::Speed => catalog::uniforms::SPEED,
            ScalarField::Distortion => catalog::uniforms::DISTORTION,
        }
    }
}

impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "complexity" => Ok(ScalarField::Complexity),
            "zoom" => Ok(ScalarField::Zoom),
            "speed" => Ok(ScalarField::Speed),
            "distortion" => Ok(ScalarField::Distortion),
            other => Err(format!(
                "unknown parameter '{other}'; expected complexity, zoom, speed, or distortion"
            )),
        }
    }
}

/// Live parameter state read by the render loop and by exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderParameters {
    pub palette: [Rgb; PALETTE_SIZE],
    pub complexity: f32,
    pub zoom: f32,
    pub speed: f32,
    pub distortion: f32,
    /// Sparse overrides keyed by custom parameter name.
    #[serde(rename = "custom")]
    pub custom_values: BTreeMap<String, f32>,
}

impl Default for ShaderParameters {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE,
            complexity: 3.0,
            zoom: 1.0,
            speed: 1.0,
            distortion: 0.5,
            custom_values: BTreeMap::new(),
        }
    }
}

impl ShaderParameters {
    pub fn scalar(&self, field: ScalarField) -> f32 {
        match field {
            ScalarField::Complexity => self.complexity,
            ScalarField::Zoom => self.zoom,
            ScalarField::Speed => self.speed,
            ScalarField::Distortion => self.distortion,
        }
    }

    fn scalar_mut(&mut self, field: ScalarField) -> &mut f32 {
        match field {
            ScalarField::Complexity => &mut self.complexity,
            ScalarField::Zoom => &mut self.zoom,
            ScalarField::Speed => &mut self.speed,
            ScalarField::Distortion => &mut self.distortion,
        }
    }

    /// Override if present, otherwise the declared default.
    pub fn resolved_custom(&self, parameter: &CustomParameter) -> f32 {
        self.custom_values
            .get(&parameter.name)
            .copied()
            .unwrap_or(parameter.default)
    }
}

/// What a consumer has to do after a parameter mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterChange {
    /// The selected effect changed; the GPU program must be rebuilt.
    Rebuild,
    /// Only uniform values changed; the next frame picks them up.
    Uniforms,
}

/// Owns the live `ShaderParameters` and the selected effect.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    parameters: ShaderParameters,
    selection: Arc<EffectDefinition>,
    epoch: u64,
}

impl ParameterStore {
    pub fn new(selection: Arc<EffectDefinition>) -> Self {
        Self {
            parameters: ShaderParameters::default(),
            selection,
            epoch: 0,
        }
    }

    /// Restores a store from persisted state, rejecting overrides for
    /// parameters the effect does not declare.
    pub fn with_parameters(
        selection: Arc<EffectDefinition>,
        parameters: ShaderParameters,
    ) -> Result<Self, ParameterError> {
        if let Some(name) = parameters
            .custom_values
            .keys()
            .find(|name| selection.custom_parameter(name).is_none())
        {
            return Err(ParameterError::UnknownParameter {
                effect: selection.id.clone(),
                name: name.clone(),
            });
        }
        Ok(Self {
            parameters,
            selection,
            epoch: 0,
        })
    }

    pub fn parameters(&self) -> &ShaderParameters {
        &self.parameters
    }

    pub fn selection(&self) -> &Arc<EffectDefinition> {
        &self.selection
    }

    /// Incremented on every selection change so the render loop can detect a
    /// pending rebuild before binding uniforms.
    pub fn selection_epoch(&self) -> u64 {
        self.epoch
    }

    pub fn set_selection(
        &mut self,
        catalog: &EffectCatalog,
        id: &str,
    ) -> Result<ParameterChange, ParameterError> {
        let definition = catalog.get(id)?;
        self.selection = definition;
        self.parameters.custom_values.clear();
        self.epoch += 1;
        tracing::debug!(effect = id, epoch = self.epoch, "selected effect");
        Ok(ParameterChange::Rebuild)
    }

    pub fn set_scalar(&mut self, field: ScalarField, value: f32) -> ParameterChange {
        *self.parameters.scalar_mut(field) = value;
        ParameterChange::Uniforms
    }

    pub fn set_custom_value(
        &mut self,
        name: &str,
        value: f32,
    ) -> Result<ParameterChange, ParameterError> {
        if self.selection.custom_parameter(name).is_none() {
            return Err(ParameterError::UnknownParameter {
                effect: self.selection.id.clone(),
                name: name.to_string(),
            });
        }
        self.parameters
            .custom_values
            .insert(name.to_string(), value);
        Ok(ParameterChange::Uniforms)
    }

    pub fn set_palette_slot(
        &mut self,
        index: usize,
        color: Rgb,
    ) -> Result<ParameterChange, ParameterError> {
        let slot = self
            .parameters
            .palette
            .get_mut(index)
            .ok_or(ParameterError::PaletteIndex(index))?;
        *slot = color;
        Ok(ParameterChange::Uniforms)
    }

    /// Value bound for a custom parameter of the selected effect.
    pub fn custom_value(&self, name: &str) -> Option<f32> {
        self.selection
            .custom_parameter(name)
            .map(|parameter| self.parameters.resolved_custom(parameter))
    }

    pub fn snapshot(&self) -> ShaderParameters {
        self.parameters.clone()
    }
}
