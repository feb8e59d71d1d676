//! Validation pre-pass run before anything is generated.
//!
//! Every check runs to completion so a single `SchemaViolation` reports all
//! failing fields of all failing layers at once.

use std::collections::HashSet;
use std::fmt;

use catalog::EffectDefinition;
use editor::{is_css_color, Layer, LayerKind, ScalarField, ShaderParameters};
use url::Url;

pub const FONT_WEIGHT_RANGE: std::ops::RangeInclusive<u16> = 100..=900;

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// `None` for violations in the parameter snapshot.
    pub layer_id: Option<String>,
    pub layer_index: Option<usize>,
    /// Dotted field path, e.g. `text` or `button_style.width`.
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.layer_id, self.layer_index) {
            (Some(id), Some(index)) => {
                write!(f, "layer '{id}' (#{index}) {}: {}", self.field, self.message)
            }
            _ => write!(f, "parameters {}: {}", self.field, self.message),
        }
    }
}

/// All field violations found in one export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub violations: Vec<FieldViolation>,
}

impl SchemaViolation {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|violation| violation.field.as_str())
    }

    pub fn for_layer<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a FieldViolation> {
        self.violations
            .iter()
            .filter(move |violation| violation.layer_id.as_deref() == Some(id))
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaViolation {}

struct Collector {
    violations: Vec<FieldViolation>,
}

impl Collector {
    fn layer(&mut self, index: usize, layer: &Layer, field: &str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            layer_id: Some(layer.id.clone()),
            layer_index: Some(index),
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn parameter(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            layer_id: None,
            layer_index: None,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// Checks the layer list and parameter snapshot against the export schema.
pub fn validate(
    definition: &EffectDefinition,
    parameters: &ShaderParameters,
    layers: &[Layer],
) -> Result<(), SchemaViolation> {
    let mut collector = Collector {
        violations: Vec::new(),
    };

    if layers.is_empty() {
        collector.parameter("layers", "at least one layer is required");
    }
    let mut seen = HashSet::new();
    for (index, layer) in layers.iter().enumerate() {
        if !seen.insert(layer.id.as_str()) {
            collector.layer(index, layer, "id", "duplicates an earlier layer id");
        }
        validate_layer(&mut collector, index, layer);
    }
    validate_parameters(&mut collector, definition, parameters);

    if collector.violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaViolation {
            violations: collector.violations,
        })
    }
}

fn validate_layer(out: &mut Collector, index: usize, layer: &Layer) {
    if layer.id.trim().is_empty() {
        out.layer(index, layer, "id", "must not be empty");
    }
    if layer.text.trim().is_empty() {
        out.layer(index, layer, "text", "must not be empty");
    }
    for (field, value) in [("position.x", layer.position.x), ("position.y", layer.position.y)] {
        if !(0.0..=100.0).contains(&value) {
            out.layer(index, layer, field, format!("{value} is outside 0..=100"));
        }
    }
    if !(layer.size.is_finite() && layer.size > 0.0) {
        out.layer(index, layer, "size", format!("{} must be positive", layer.size));
    }
    if !(0.0..=1.0).contains(&layer.opacity) {
        out.layer(index, layer, "opacity", format!("{} is outside 0..=1", layer.opacity));
    }
    if !FONT_WEIGHT_RANGE.contains(&layer.font_weight) {
        out.layer(
            index,
            layer,
            "font_weight",
            format!("{} is outside 100..=900", layer.font_weight),
        );
    }
    if layer.font_family.trim().is_empty() {
        out.layer(index, layer, "font_family", "must not be empty");
    } else if layer.font_family.chars().any(char::is_control) {
        out.layer(index, layer, "font_family", "must not contain control characters");
    }
    if !layer.rotation_degrees.is_finite() {
        out.layer(index, layer, "rotation_degrees", "must be finite");
    }
    if !is_css_color(&layer.color) {
        out.layer(index, layer, "color", format!("'{}' is not a CSS color", layer.color));
    }
    if let Some(spacing) = layer.letter_spacing {
        if !spacing.is_finite() {
            out.layer(index, layer, "letter_spacing", "must be finite");
        }
    }
    if let Some(url) = layer.font_resource_url.as_deref() {
        if !is_absolute_url(url) {
            out.layer(
                index,
                layer,
                "font_resource_url",
                format!("'{url}' is not an absolute http(s) URL"),
            );
        }
    }

    match (layer.kind, layer.button_style.as_ref()) {
        (LayerKind::Button, None) => out.layer(index, layer, "button_style", "buttons need a style"),
        (LayerKind::Button, Some(style)) => {
            for (field, value) in [
                ("button_style.width", style.width),
                ("button_style.height", style.height),
            ] {
                if !(value.is_finite() && value > 0.0) {
                    out.layer(index, layer, field, format!("{value} must be positive"));
                }
            }
            for (field, value) in [
                ("button_style.border_radius", style.border_radius),
                ("button_style.border_width", style.border_width),
            ] {
                if !(value.is_finite() && value >= 0.0) {
                    out.layer(index, layer, field, format!("{value} must not be negative"));
                }
            }
            for (field, value) in [
                ("button_style.background_color", &style.background_color),
                ("button_style.border_color", &style.border_color),
            ] {
                if !is_css_color(value) {
                    out.layer(index, layer, field, format!("'{value}' is not a CSS color"));
                }
            }
            if !is_link_target(&style.target_url) {
                out.layer(
                    index,
                    layer,
                    "button_style.target_url",
                    format!("'{}' must be an absolute URL or a rooted path", style.target_url),
                );
            }
        }
        (LayerKind::Text, _) => {}
    }
}

fn validate_parameters(out: &mut Collector, definition: &EffectDefinition, parameters: &ShaderParameters) {
    for field in ScalarField::ALL {
        let value = parameters.scalar(field);
        if !value.is_finite() {
            out.parameter(field.as_str(), format!("{value} must be finite"));
        }
    }
    for (name, value) in &parameters.custom_values {
        let field = format!("custom.{name}");
        if definition.custom_parameter(name).is_none() {
            out.parameter(field, format!("effect '{}' declares no such parameter", definition.id));
        } else if !value.is_finite() {
            out.parameter(field, format!("{value} must be finite"));
        }
    }
}

/// An `http(s)` URL that parses with a host, written without whitespace or
/// quoting characters.
pub(crate) fn is_absolute_url(value: &str) -> bool {
    if value
        .chars()
        .any(|ch| ch.is_whitespace() || ch.is_control() || matches!(ch, '"' | '\'' | '<' | '>' | '\\' | '`'))
    {
        return false;
    }
    match Url::parse(value) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

fn is_link_target(value: &str) -> bool {
    if value.starts_with('/') && !value.starts_with("//") {
        return !value
            .chars()
            .any(|ch| ch.is_whitespace() || ch.is_control() || matches!(ch, '"' | '\'' | '<' | '>'));
    }
    is_absolute_url(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::EffectCatalog;
    use editor::{ButtonStyle, Position};

    fn plasma() -> std::sync::Arc<EffectDefinition> {
        EffectCatalog::builtin().unwrap().get("plasma").unwrap()
    }

    fn text_layer(id: &str) -> Layer {
        Layer::with_defaults(id.into(), LayerKind::Text)
    }

    #[test]
    fn accepts_default_layers() {
        let layers = vec![
            text_layer("layer-1"),
            Layer::with_defaults("layer-2".into(), LayerKind::Button),
        ];
        assert!(validate(&plasma(), &ShaderParameters::default(), &layers).is_ok());
    }

    #[test]
    fn reports_every_failing_field_of_every_layer() {
        let mut first = text_layer("layer-1");
        first.text = "   ".into();
        first.position = Position { x: 120.0, y: 50.0 };
        first.opacity = 1.5;
        let mut second = Layer::with_defaults("layer-2".into(), LayerKind::Button);
        second.font_weight = 950;
        second.color = "tomato".into();
        second.font_resource_url = Some("fonts.example.com/inter.css".into());
        second.button_style = Some(ButtonStyle {
            width: 0.0,
            target_url: "javascript:alert(1)".into(),
            ..ButtonStyle::default()
        });

        let err = validate(&plasma(), &ShaderParameters::default(), &[first, second]).unwrap_err();
        let first_fields: Vec<&str> = err.for_layer("layer-1").map(|v| v.field.as_str()).collect();
        assert_eq!(first_fields, ["text", "position.x", "opacity"]);
        let second_fields: Vec<&str> = err.for_layer("layer-2").map(|v| v.field.as_str()).collect();
        assert_eq!(
            second_fields,
            [
                "font_weight",
                "color",
                "font_resource_url",
                "button_style.width",
                "button_style.target_url"
            ]
        );
        assert!(err.to_string().starts_with("8 invalid field(s)"));
    }

    #[test]
    fn flags_duplicate_ids_and_unknown_custom_values() {
        let mut parameters = ShaderParameters::default();
        parameters.custom_values.insert("bands".into(), 2.0);
        parameters.zoom = f32::NAN;
        let err = validate(&plasma(), &parameters, &[text_layer("a"), text_layer("a")]).unwrap_err();
        let fields: Vec<&str> = err.fields().collect();
        assert_eq!(fields, ["id", "zoom", "custom.bands"]);
    }

    #[test]
    fn rejects_malformed_font_urls() {
        for url in [
            "https://example.com:99999/font.css",
            "https://[::1/font.css",
            "https://user@/font.css",
        ] {
            let mut layer = text_layer("layer-1");
            layer.font_resource_url = Some(url.into());
            let err = validate(&plasma(), &ShaderParameters::default(), &[layer]).unwrap_err();
            let fields: Vec<&str> = err.fields().collect();
            assert_eq!(fields, ["font_resource_url"], "{url}");
        }
    }

    #[test]
    fn rejects_control_characters_in_font_family() {
        let mut layer = text_layer("layer-1");
        layer.font_family = "Inter\n} body { display: none".into();
        let err = validate(&plasma(), &ShaderParameters::default(), &[layer]).unwrap_err();
        let fields: Vec<&str> = err.fields().collect();
        assert_eq!(fields, ["font_family"]);
    }

    #[test]
    fn url_checks() {
        assert!(is_absolute_url("https://fonts.googleapis.com/css2?family=Inter"));
        assert!(is_absolute_url("http://localhost:8080/font.css"));
        assert!(!is_absolute_url("https://"));
        assert!(!is_absolute_url("https://?q=1"));
        assert!(!is_absolute_url("ftp://example.com/font.css"));
        assert!(!is_absolute_url("https://example.com/a b"));
        assert!(!is_absolute_url("https://example.com:99999/font.css"));
        assert!(!is_absolute_url("https://[::1/font.css"));
        assert!(!is_absolute_url("https://user@/font.css"));
        assert!(is_link_target("https://example.com/signup"));
        assert!(!is_link_target("https://example.com:70000/signup"));
        assert!(is_link_target("/pricing"));
        assert!(!is_link_target("//evil.example.com"));
    }
}
