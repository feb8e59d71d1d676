//! Turns an editor snapshot into a standalone WebGL2 custom element.
//!
//! The pipeline is a pure function of its inputs:
//!
//! ```text
//!   ExportRequest ─▶ validate ─▶ derive_names ─▶ BakedParameters::resolve
//!                                                      │
//!                 ExportArtifact ◀─ Template::render ◀─┘
//! ```
//!
//! Nothing is written to disk here; callers decide where `ExportArtifact::text`
//! goes. A rejected request leaves no partial output behind.

mod bake;
mod error;
mod ident;
mod shader;
mod template;
mod validate;

use std::collections::BTreeMap;
use std::sync::Arc;

use catalog::EffectDefinition;
use chrono::{DateTime, SecondsFormat, Utc};
use editor::{style_attribute, EditorSession, Layer, ShaderParameters};
use serde::Serialize;

pub use bake::{number_literal, BakedParameters};
pub use error::ExportError;
pub use ident::{derive_names, ArtifactNames};
pub use shader::{es_portability_issues, fragment_source_es, PortabilityIssue, VERTEX_SOURCE_ES};
pub use template::{Template, COMPONENT_TEMPLATE};
pub use validate::{validate, FieldViolation, SchemaViolation, FONT_WEIGHT_RANGE};

/// Snapshot handed to [`compile`].
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub component_name: Option<String>,
    pub effect: Arc<EffectDefinition>,
    pub parameters: ShaderParameters,
    pub layers: Vec<Layer>,
    /// When set, the banner records the generation time. Leave unset for
    /// byte-identical output across exports.
    pub generated_at: Option<DateTime<Utc>>,
}

impl ExportRequest {
    pub fn from_session(session: &EditorSession) -> Self {
        Self {
            component_name: session.component_name().map(str::to_string),
            effect: Arc::clone(session.params().selection()),
            parameters: session.params().snapshot(),
            layers: session.layers().layers().to_vec(),
            generated_at: None,
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }
}

/// The generated module plus the inputs it was built from.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub names: ArtifactNames,
    pub effect_id: String,
    pub vertex_source: String,
    pub fragment_source: String,
    pub baked: BakedParameters,
    pub layers: Vec<Layer>,
    pub font_urls: Vec<String>,
    pub text: String,
}

impl ExportArtifact {
    pub fn component_name(&self) -> &str {
        &self.names.component_name
    }

    pub fn tag_name(&self) -> &str {
        &self.names.tag_name
    }

    pub fn file_name(&self) -> &str {
        &self.names.file_name
    }
}

/// Layer as the artifact's overlay consumes it.
#[derive(Debug, Serialize)]
struct OverlayLayer<'a> {
    id: &'a str,
    text: &'a str,
    style: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    href: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'static str>,
}

impl<'a> OverlayLayer<'a> {
    fn from_layer(layer: &'a Layer) -> Self {
        let button = layer.button_style.as_ref();
        Self {
            id: &layer.id,
            text: &layer.text,
            style: style_attribute(layer),
            href: button.map(|style| style.target_url.as_str()),
            target: button.map(|style| style.target_window.as_str()),
        }
    }
}

/// Validates `request` and assembles the module text.
pub fn compile(request: &ExportRequest) -> Result<ExportArtifact, ExportError> {
    let definition = &request.effect;
    if let Err(violation) = validate(definition, &request.parameters, &request.layers) {
        tracing::warn!(
            effect = %definition.id,
            violations = violation.violations.len(),
            "export rejected"
        );
        return Err(violation.into());
    }

    let names = derive_names(request.component_name.as_deref(), &definition.id)?;
    let baked = BakedParameters::resolve(definition, &request.parameters);
    let vertex_source = VERTEX_SOURCE_ES.to_string();
    let fragment_source = fragment_source_es(definition);
    let font_urls = font_urls(&request.layers);

    let overlay: Vec<OverlayLayer<'_>> = request.layers.iter().map(OverlayLayer::from_layer).collect();
    let mut values = BTreeMap::new();
    values.insert("banner", banner(&names, definition, request.generated_at));
    values.insert("component_name", names.component_name.clone());
    values.insert("tag_name", names.tag_name.clone());
    values.insert("vertex_source", serde_json::to_string(&vertex_source)?);
    values.insert("fragment_source", serde_json::to_string(&fragment_source)?);
    values.insert("palette", baked.palette_literal());
    values.insert(
        "palette_uniforms",
        serde_json::to_string(&BakedParameters::palette_uniforms())?,
    );
    values.insert("scalars", baked.scalars_literal());
    values.insert("custom", baked.custom_literal());
    values.insert("layers", serde_json::to_string_pretty(&overlay)?);
    values.insert("font_injections", font_injections(&font_urls)?);

    let text = Template::component().render(&values)?;
    tracing::info!(
        effect = %definition.id,
        component = %names.component_name,
        layers = request.layers.len(),
        bytes = text.len(),
        "compiled export artifact"
    );

    Ok(ExportArtifact {
        names,
        effect_id: definition.id.clone(),
        vertex_source,
        fragment_source,
        baked,
        layers: request.layers.clone(),
        font_urls,
        text,
    })
}

fn banner(names: &ArtifactNames, definition: &EffectDefinition, at: Option<DateTime<Utc>>) -> String {
    let mut lines = vec![
        format!(
            "// {}: <{}> generated by shaderdeck from effect \"{}\".",
            names.component_name, names.tag_name, definition.id
        ),
        "// Parameters and layers are baked in; this module has no runtime dependencies.".to_string(),
    ];
    if let Some(at) = at {
        lines.push(format!(
            "// Generated at {}.",
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    lines.join("\n")
}

/// Distinct font resource URLs in layer order.
fn font_urls(layers: &[Layer]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in layers.iter().filter_map(|layer| layer.font_resource_url.as_ref()) {
        if !urls.contains(url) {
            urls.push(url.clone());
        }
    }
    urls
}

fn font_injections(urls: &[String]) -> Result<String, ExportError> {
    if urls.is_empty() {
        return Ok("  // No font resources.".to_string());
    }
    let statements = urls
        .iter()
        .map(|url| Ok(format!("  injectStylesheet({});", serde_json::to_string(url)?)))
        .collect::<Result<Vec<_>, ExportError>>()?;
    Ok(statements.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::EffectCatalog;
    use chrono::TimeZone;
    use editor::{LayerKind, LayerModel, LayerPatch};

    fn session() -> EditorSession {
        EditorSession::new(EffectCatalog::builtin().unwrap())
    }

    fn request() -> ExportRequest {
        ExportRequest::from_session(&session())
    }

    fn line_with<'a>(text: &'a str, prefix: &str) -> &'a str {
        text.lines()
            .find(|line| line.starts_with(prefix))
            .unwrap_or_else(|| panic!("no line starting with {prefix}"))
    }

    #[test]
    fn empty_text_aborts_with_violation_naming_text() {
        let mut request = request();
        request.layers[0].text.clear();
        let err = compile(&request).unwrap_err();
        let violation = err.violations().expect("schema violation");
        assert_eq!(violation.fields().collect::<Vec<_>>(), ["text"]);
        assert_eq!(violation.violations[0].layer_index, Some(0));
    }

    #[test]
    fn identical_snapshots_give_identical_artifacts() {
        let request = request();
        let first = compile(&request).unwrap();
        let second = compile(&request).unwrap();
        assert_eq!(first.text, second.text);

        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let stamped = compile(&request.clone().with_timestamp(at)).unwrap();
        assert!(stamped.text.contains("// Generated at 2026-10-18T09:30:00Z."));
        let without_stamp: Vec<&str> = stamped
            .text
            .lines()
            .filter(|line| !line.starts_with("// Generated at"))
            .collect();
        assert_eq!(without_stamp, first.text.lines().collect::<Vec<_>>());
    }

    #[test]
    fn baked_literals_match_snapshot_exactly() {
        let mut session = session();
        session.params_mut().set_custom_value("frequency", 1.0 / 3.0).unwrap();
        session
            .params_mut()
            .set_scalar(editor::ScalarField::Zoom, 0.1);
        let artifact = compile(&ExportRequest::from_session(&session)).unwrap();

        let custom = line_with(&artifact.text, "const CUSTOM = ");
        let literal = custom
            .trim_start_matches("const CUSTOM = { \"u_frequency\": ")
            .trim_end_matches(" };");
        assert_eq!(literal.parse::<f32>().unwrap(), 1.0 / 3.0);

        let scalars = line_with(&artifact.text, "const SCALARS = ");
        assert!(scalars.contains("\"u_zoom\": 0.1,"));
        let palette = line_with(&artifact.text, "const PALETTE = ");
        // Default third slot is #ccff00.
        assert!(palette.contains("[0.8, 1, 0]"));
    }

    #[test]
    fn artifact_is_named_after_the_effect() {
        let artifact = compile(&request()).unwrap();
        assert_eq!(artifact.component_name(), "PlasmaShader");
        assert_eq!(artifact.file_name(), "PlasmaShader.js");
        assert!(artifact.text.contains("class PlasmaShader extends HTMLElement"));
        assert!(artifact
            .text
            .contains("customElements.define(\"plasma-shader\", PlasmaShader);"));
        assert!(artifact.text.ends_with("export default PlasmaShader;\n"));
        assert!(!artifact.text.contains("{{"));
    }

    #[test]
    fn font_urls_become_single_injections() {
        let mut session = session();
        let url = "https://fonts.googleapis.com/css2?family=Space+Grotesk";
        let first = session.layers().active_id().to_string();
        let second = session.layers_mut().add(LayerKind::Button).id.clone();
        for id in [&first, &second] {
            session.layers_mut().update(
                id,
                LayerPatch {
                    font_resource_url: Some(Some(url.to_string())),
                    ..LayerPatch::default()
                },
            );
        }
        let artifact = compile(&ExportRequest::from_session(&session)).unwrap();
        let injection = format!("injectStylesheet(\"{url}\");");
        assert_eq!(artifact.text.matches(&injection).count(), 1);
        assert_eq!(artifact.font_urls, [url]);
        assert!(artifact.text.contains("\"href\": \"https://example.com\""));
        assert!(artifact.text.contains("\"target\": \"_blank\""));
    }

    #[test]
    fn overlay_reuses_editor_style_mapping() {
        let layers = LayerModel::new();
        let layer = &layers.layers()[0];
        let artifact = compile(&request()).unwrap();
        let style = serde_json::to_string(&style_attribute(layer)).unwrap();
        assert!(artifact.text.contains(&format!("\"style\": {style}")));
        assert!(artifact.text.contains("// No font resources."));
    }
}
