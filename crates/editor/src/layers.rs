//! Overlay elements positioned in percent-of-viewport coordinates.
//!
//! `LayerModel` keeps an ordered, never-empty list of layers plus the id of
//! the active one. Deleting the last remaining layer is a silent no-op rather
//! than an error. `css_declarations` is the single mapping from a layer to its
//! on-screen style and is shared by the editor overlay and exported artifacts.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::fonts::{FontLoadOutcome, FontLoadTicket, FontResourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Text,
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const CENTER: Position = Position { x: 50.0, y: 50.0 };

    pub fn clamped(x: f32, y: f32) -> Self {
        Self {
            x: clamp_percent(x),
            y: clamp_percent(y),
        }
    }
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetWindow {
    #[serde(rename = "_self")]
    SameWindow,
    #[default]
    #[serde(rename = "_blank")]
    NewWindow,
}

impl TargetWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetWindow::SameWindow => "_self",
            TargetWindow::NewWindow => "_blank",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonStyle {
    pub width: f32,
    pub height: f32,
    pub background_color: String,
    pub border_radius: f32,
    pub border_width: f32,
    pub border_color: String,
    pub target_url: String,
    #[serde(default)]
    pub target_window: TargetWindow,
}

impl Default for ButtonStyle {
    fn default() -> Self {
        Self {
            width: 180.0,
            height: 52.0,
            background_color: "#ccff00".into(),
            border_radius: 26.0,
            border_width: 0.0,
            border_color: "#ffffff".into(),
            target_url: "https://example.com".into(),
            target_window: TargetWindow::NewWindow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub kind: LayerKind,
    pub text: String,
    pub position: Position,
    pub size: f32,
    pub font_family: String,
    pub font_weight: u16,
    pub opacity: f32,
    #[serde(default)]
    pub rotation_degrees: f32,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_resource_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_style: Option<ButtonStyle>,
}

impl Layer {
    /// Fresh layer of the given kind with kind-appropriate defaults.
    pub fn with_defaults(id: String, kind: LayerKind) -> Self {
        match kind {
            LayerKind::Text => Self {
                id,
                kind,
                text: "New text".into(),
                position: Position::CENTER,
                size: 48.0,
                font_family: "Inter".into(),
                font_weight: 700,
                opacity: 1.0,
                rotation_degrees: 0.0,
                color: "#ffffff".into(),
                letter_spacing: None,
                font_resource_url: None,
                button_style: None,
            },
            LayerKind::Button => Self {
                id,
                kind,
                text: "Get started".into(),
                position: Position { x: 50.0, y: 65.0 },
                size: 18.0,
                font_family: "Inter".into(),
                font_weight: 600,
                opacity: 1.0,
                rotation_degrees: 0.0,
                color: "#0b1026".into(),
                letter_spacing: None,
                font_resource_url: None,
                button_style: Some(ButtonStyle::default()),
            },
        }
    }
}

/// Partial update merged into a layer by [`LayerModel::update`].
///
/// Optional layer fields use a nested `Option` so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerPatch {
    pub text: Option<String>,
    pub position: Option<Position>,
    pub size: Option<f32>,
    pub font_family: Option<String>,
    pub font_weight: Option<u16>,
    pub opacity: Option<f32>,
    pub rotation_degrees: Option<f32>,
    pub color: Option<String>,
    pub letter_spacing: Option<Option<f32>>,
    pub font_resource_url: Option<Option<String>>,
    pub button_style: Option<ButtonStyle>,
}

impl LayerPatch {
    fn apply(self, layer: &mut Layer) {
        if let Some(text) = self.text {
            layer.text = text;
        }
        if let Some(position) = self.position {
            layer.position = position;
        }
        if let Some(size) = self.size {
            layer.size = size;
        }
        if let Some(family) = self.font_family {
            layer.font_family = family;
        }
        if let Some(weight) = self.font_weight {
            layer.font_weight = weight;
        }
        if let Some(opacity) = self.opacity {
            layer.opacity = opacity;
        }
        if let Some(rotation) = self.rotation_degrees {
            layer.rotation_degrees = rotation;
        }
        if let Some(color) = self.color {
            layer.color = color;
        }
        if let Some(spacing) = self.letter_spacing {
            layer.letter_spacing = spacing;
        }
        if let Some(url) = self.font_resource_url {
            layer.font_resource_url = url;
        }
        if let Some(style) = self.button_style {
            if layer.kind == LayerKind::Button {
                layer.button_style = Some(style);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerError {
    #[error("a composition needs at least one layer")]
    Empty,
    #[error("layer id '{0}' is used more than once")]
    DuplicateId(String),
    #[error("button layer '{0}' is missing its button style")]
    MissingButtonStyle(String),
}

#[derive(Debug, Clone)]
pub struct LayerModel {
    layers: Vec<Layer>,
    active: String,
    next_id: u64,
}

impl Default for LayerModel {
    fn default() -> Self {
        let first = Layer::with_defaults("layer-1".into(), LayerKind::Text);
        Self {
            active: first.id.clone(),
            layers: vec![first],
            next_id: 2,
        }
    }
}

impl LayerModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_layers(layers: Vec<Layer>) -> Result<Self, LayerError> {
        let first = layers.first().ok_or(LayerError::Empty)?;
        let active = first.id.clone();

        let mut seen = HashSet::new();
        for layer in &layers {
            if !seen.insert(layer.id.as_str()) {
                return Err(LayerError::DuplicateId(layer.id.clone()));
            }
            if layer.kind == LayerKind::Button && layer.button_style.is_none() {
                return Err(LayerError::MissingButtonStyle(layer.id.clone()));
            }
        }

        let next_id = layers
            .iter()
            .filter_map(|layer| layer.id.strip_prefix("layer-"))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        Ok(Self {
            layers,
            active,
            next_id,
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn active(&self) -> Option<&Layer> {
        self.get(&self.active)
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.active = id.to_string();
            true
        } else {
            false
        }
    }

    /// Appends a layer with a fresh id and makes it the active one.
    pub fn add(&mut self, kind: LayerKind) -> &Layer {
        let id = self.fresh_id();
        tracing::debug!(layer = %id, ?kind, "added layer");
        self.active = id.clone();
        self.layers.push(Layer::with_defaults(id, kind));
        &self.layers[self.layers.len() - 1]
    }

    /// Merges `patch` into the layer; returns false when the id is unknown.
    pub fn update(&mut self, id: &str, patch: LayerPatch) -> bool {
        match self.layers.iter_mut().find(|layer| layer.id == id) {
            Some(layer) => {
                patch.apply(layer);
                true
            }
            None => false,
        }
    }

    /// Same as `update` with the position clamped to [0, 100] per axis.
    pub fn reposition(&mut self, id: &str, x: f32, y: f32) -> bool {
        self.update(
            id,
            LayerPatch {
                position: Some(Position::clamped(x, y)),
                ..LayerPatch::default()
            },
        )
    }

    /// Removes a layer unless it is the last one. Returns whether anything was
    /// removed.
    pub fn delete(&mut self, id: &str) -> bool {
        if self.layers.len() <= 1 {
            return false;
        }
        let Some(index) = self.layers.iter().position(|layer| layer.id == id) else {
            return false;
        };
        self.layers.remove(index);
        if self.active == id {
            let neighbour = index.min(self.layers.len() - 1);
            self.active = self.layers[neighbour].id.clone();
        }
        tracing::debug!(layer = id, remaining = self.layers.len(), "deleted layer");
        true
    }

    /// Records the font resource URL on the layer and returns the ticket the
    /// loader must hand back on completion.
    pub fn begin_font_load(&mut self, id: &str, url: &str) -> Option<FontLoadTicket> {
        let layer = self.layers.iter_mut().find(|layer| layer.id == id)?;
        layer.font_resource_url = Some(url.to_string());
        Some(FontLoadTicket {
            layer_id: id.to_string(),
            url: url.to_string(),
        })
    }

    /// Applies a finished font load. On failure the layer keeps its prior
    /// family and the error is returned for display.
    pub fn complete_font_load(
        &mut self,
        ticket: FontLoadTicket,
        outcome: FontLoadOutcome,
    ) -> Result<(), FontResourceError> {
        let FontLoadTicket { layer_id, url } = ticket;
        let layer = self
            .layers
            .iter_mut()
            .find(|layer| layer.id == layer_id)
            .ok_or_else(|| FontResourceError::LayerMissing(layer_id.clone()))?;
        if layer.font_resource_url.as_deref() != Some(url.as_str()) {
            return Err(FontResourceError::Superseded {
                layer: layer_id,
                url,
            });
        }
        match outcome {
            FontLoadOutcome::Loaded { family } => {
                tracing::debug!(layer = %layer_id, %family, "applied loaded font");
                layer.font_family = family;
                Ok(())
            }
            FontLoadOutcome::Failed { reason } => {
                Err(FontResourceError::LoadFailed { url, reason })
            }
        }
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let candidate = format!("layer-{}", self.next_id);
            self.next_id += 1;
            if self.get(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

/// CSS declarations placing a layer over the effect canvas.
///
/// The anchor is the layer centre: `left`/`top` carry the percent position and
/// the transform recentres and rotates around it.
pub fn css_declarations(layer: &Layer) -> Vec<(&'static str, String)> {
    let mut declarations = vec![
        ("position", "absolute".to_string()),
        ("left", format!("{}%", layer.position.x)),
        ("top", format!("{}%", layer.position.y)),
        (
            "transform",
            format!("translate(-50%, -50%) rotate({}deg)", layer.rotation_degrees),
        ),
        ("font-family", css_font_family(&layer.font_family)),
        ("font-size", format!("{}px", layer.size)),
        ("font-weight", layer.font_weight.to_string()),
        ("color", layer.color.clone()),
        ("opacity", layer.opacity.to_string()),
        ("white-space", "nowrap".to_string()),
    ];
    if let Some(spacing) = layer.letter_spacing {
        declarations.push(("letter-spacing", format!("{spacing}px")));
    }
    if let Some(style) = layer.button_style.as_ref() {
        declarations.extend([
            ("display", "inline-flex".to_string()),
            ("align-items", "center".to_string()),
            ("justify-content", "center".to_string()),
            ("box-sizing", "border-box".to_string()),
            ("width", format!("{}px", style.width)),
            ("height", format!("{}px", style.height)),
            ("background", style.background_color.clone()),
            ("border-radius", format!("{}px", style.border_radius)),
            (
                "border",
                format!("{}px solid {}", style.border_width, style.border_color),
            ),
            ("text-decoration", "none".to_string()),
            ("cursor", "pointer".to_string()),
        ]);
    }
    declarations
}

/// Inline `style` attribute text for a layer.
pub fn style_attribute(layer: &Layer) -> String {
    css_declarations(layer)
        .into_iter()
        .map(|(property, value)| format!("{property}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quotes a family name as a CSS string. Control characters become hex
/// escapes (`\a ` for a newline) so the string cannot end early.
fn css_font_family(family: &str) -> String {
    let mut quoted = String::with_capacity(family.len() + 16);
    quoted.push('"');
    for ch in family.chars() {
        match ch {
            '\\' | '"' => {
                quoted.push('\\');
                quoted.push(ch);
            }
            _ if ch.is_control() => quoted.push_str(&format!("\\{:x} ", u32::from(ch))),
            _ => quoted.push(ch),
        }
    }
    quoted.push_str("\", sans-serif");
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleting_never_empties_the_model() {
        let mut model = LayerModel::new();
        model.add(LayerKind::Button);
        model.add(LayerKind::Text);
        for _ in 0..3 {
            let ids: Vec<String> = model.layers().iter().map(|l| l.id.clone()).collect();
            for id in ids {
                model.delete(&id);
                assert!(model.len() >= 1);
            }
        }
        assert_eq!(model.len(), 1);
        let last = model.layers()[0].id.clone();
        assert!(!model.delete(&last));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn add_assigns_unique_ids_and_activates() {
        let mut model = LayerModel::new();
        let button_id = model.add(LayerKind::Button).id.clone();
        assert_eq!(button_id, "layer-2");
        assert_eq!(model.active_id(), "layer-2");
        let button = model.get(&button_id).unwrap();
        assert!(button.button_style.is_some());
        let text_id = model.add(LayerKind::Text).id.clone();
        assert_ne!(text_id, button_id);
    }

    #[test]
    fn deleting_active_layer_selects_neighbour() {
        let mut model = LayerModel::new();
        model.add(LayerKind::Text);
        model.add(LayerKind::Text);
        assert!(model.delete("layer-3"));
        assert_eq!(model.active_id(), "layer-2");
    }

    #[test]
    fn reposition_clamps_each_axis() {
        let mut model = LayerModel::new();
        assert!(model.reposition("layer-1", -12.0, 140.0));
        let layer = model.get("layer-1").unwrap();
        assert_eq!(layer.position, Position { x: 0.0, y: 100.0 });
        assert!(!model.reposition("missing", 10.0, 10.0));
    }

    #[test]
    fn update_merges_only_provided_fields() {
        let mut model = LayerModel::new();
        let patch = LayerPatch {
            text: Some("Hello".into()),
            letter_spacing: Some(Some(2.0)),
            ..LayerPatch::default()
        };
        assert!(model.update("layer-1", patch));
        let layer = model.get("layer-1").unwrap();
        assert_eq!(layer.text, "Hello");
        assert_eq!(layer.letter_spacing, Some(2.0));
        assert_eq!(layer.size, 48.0);
        assert!(!model.update("missing", LayerPatch::default()));
    }

    #[test]
    fn from_layers_continues_id_sequence() {
        let layers = vec![
            Layer::with_defaults("layer-4".into(), LayerKind::Text),
            Layer::with_defaults("hero".into(), LayerKind::Text),
        ];
        let mut model = LayerModel::from_layers(layers).unwrap();
        assert_eq!(model.add(LayerKind::Text).id, "layer-5");
        assert_eq!(LayerModel::from_layers(Vec::new()).unwrap_err(), LayerError::Empty);
    }

    #[test]
    fn font_load_applies_once_and_keeps_family_on_failure() {
        let mut model = LayerModel::new();
        let ticket = model
            .begin_font_load("layer-1", "https://fonts.example/a.css")
            .unwrap();
        model
            .complete_font_load(ticket, FontLoadOutcome::Loaded { family: "Anton".into() })
            .unwrap();
        assert_eq!(model.get("layer-1").unwrap().font_family, "Anton");

        let ticket = model
            .begin_font_load("layer-1", "https://fonts.example/b.css")
            .unwrap();
        let err = model
            .complete_font_load(ticket, FontLoadOutcome::Failed { reason: "404".into() })
            .unwrap_err();
        assert!(matches!(err, FontResourceError::LoadFailed { .. }));
        assert_eq!(model.get("layer-1").unwrap().font_family, "Anton");
    }

    #[test]
    fn stale_font_ticket_is_ignored() {
        let mut model = LayerModel::new();
        let stale = model.begin_font_load("layer-1", "https://a.example/x.css").unwrap();
        model.begin_font_load("layer-1", "https://a.example/y.css").unwrap();
        let err = model
            .complete_font_load(stale, FontLoadOutcome::Loaded { family: "Old".into() })
            .unwrap_err();
        assert!(matches!(err, FontResourceError::Superseded { .. }));
        assert_eq!(model.get("layer-1").unwrap().font_family, "Inter");
    }

    #[test]
    fn style_maps_position_and_button_box() {
        let mut layer = Layer::with_defaults("b".into(), LayerKind::Button);
        layer.position = Position { x: 25.0, y: 75.5 };
        layer.rotation_degrees = -8.0;
        let style = style_attribute(&layer);
        assert!(style.starts_with("position: absolute; left: 25%; top: 75.5%;"));
        assert!(style.contains("transform: translate(-50%, -50%) rotate(-8deg);"));
        assert!(style.contains("width: 180px;"));
        assert!(style.contains("border: 0px solid #ffffff;"));
        assert!(style.contains("font-family: \"Inter\", sans-serif;"));
    }

    #[test]
    fn font_family_stays_inside_its_css_string() {
        let mut layer = Layer::with_defaults("layer-1".into(), LayerKind::Text);
        layer.font_family = "Evil\"; color: red\nInter\\".into();
        let family = css_declarations(&layer)
            .into_iter()
            .find(|(property, _)| *property == "font-family")
            .map(|(_, value)| value)
            .unwrap();
        assert_eq!(family, "\"Evil\\\"; color: red\\a Inter\\\\\", sans-serif");
        assert!(!style_attribute(&layer).contains('\n'));
    }
}
