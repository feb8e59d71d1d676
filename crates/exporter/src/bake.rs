//! Parameter snapshot frozen into literal constants.

use catalog::{uniforms, EffectDefinition, PALETTE_SIZE};
use editor::{ScalarField, ShaderParameters};

/// Values the artifact binds every frame, resolved at export time.
#[derive(Debug, Clone, PartialEq)]
pub struct BakedParameters {
    /// Palette slots already divided by 255.
    pub palette: [[f32; 3]; PALETTE_SIZE],
    /// Global scalars keyed by uniform name, in binding order.
    pub scalars: Vec<(String, f32)>,
    /// Custom parameters of the effect keyed by uniform name, override or
    /// declared default.
    pub custom: Vec<(String, f32)>,
}

impl BakedParameters {
    pub fn resolve(definition: &EffectDefinition, parameters: &ShaderParameters) -> Self {
        Self {
            palette: parameters.palette.map(|color| color.normalized()),
            scalars: ScalarField::ALL
                .iter()
                .map(|field| (field.uniform_name().to_string(), parameters.scalar(*field)))
                .collect(),
            custom: definition
                .custom_parameters
                .iter()
                .map(|parameter| {
                    (
                        parameter.uniform_name.clone(),
                        parameters.resolved_custom(parameter),
                    )
                })
                .collect(),
        }
    }

    /// `[[r, g, b], ...]` in palette order.
    pub fn palette_literal(&self) -> String {
        let slots: Vec<String> = self
            .palette
            .iter()
            .map(|rgb| {
                format!(
                    "[{}, {}, {}]",
                    number_literal(rgb[0]),
                    number_literal(rgb[1]),
                    number_literal(rgb[2])
                )
            })
            .collect();
        format!("[{}]", slots.join(", "))
    }

    pub fn scalars_literal(&self) -> String {
        table_literal(&self.scalars)
    }

    pub fn custom_literal(&self) -> String {
        table_literal(&self.custom)
    }

    /// Names of the palette uniforms in slot order.
    pub fn palette_uniforms() -> [&'static str; PALETTE_SIZE] {
        uniforms::PALETTE
    }
}

/// Shortest decimal that parses back to exactly `value` as an `f32`.
///
/// Callers guarantee finiteness through validation.
pub fn number_literal(value: f32) -> String {
    if value == 0.0 {
        // Drops the sign of -0.0, which a uniform cannot observe.
        return "0".to_string();
    }
    value.to_string()
}

fn table_literal(entries: &[(String, f32)]) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let body: Vec<String> = entries
        .iter()
        .map(|(name, value)| format!("\"{name}\": {}", number_literal(*value)))
        .collect();
    format!("{{ {} }}", body.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::EffectCatalog;
    use editor::Rgb;

    #[test]
    fn palette_is_normalized_at_export_time() {
        let definition = EffectCatalog::builtin().unwrap().get("plasma").unwrap();
        let mut parameters = ShaderParameters::default();
        parameters.palette[0] = "#ccff00".parse::<Rgb>().unwrap();
        let baked = BakedParameters::resolve(&definition, &parameters);
        assert_eq!(baked.palette[0], [0.8, 1.0, 0.0]);
        assert!(baked.palette_literal().starts_with("[[0.8, 1, 0], "));
    }

    #[test]
    fn literals_parse_back_exactly() {
        for value in [0.1_f32, 1.0 / 3.0, 3.0, 1e-7, 12345.678, -2.5, f32::MAX, f32::MIN_POSITIVE] {
            let literal = number_literal(value);
            assert_eq!(literal.parse::<f32>().unwrap(), value, "{literal}");
        }
        assert_eq!(number_literal(-0.0), "0");
    }

    #[test]
    fn custom_values_fall_back_to_defaults() {
        let definition = EffectCatalog::builtin().unwrap().get("aurora").unwrap();
        let mut parameters = ShaderParameters::default();
        parameters.custom_values.insert("shimmer".into(), 0.9);
        let baked = BakedParameters::resolve(&definition, &parameters);
        assert_eq!(
            baked.custom,
            vec![("u_band_count".to_string(), 4.0), ("u_shimmer".to_string(), 0.9)]
        );
        assert_eq!(baked.custom_literal(), "{ \"u_band_count\": 4, \"u_shimmer\": 0.9 }");
        assert_eq!(
            baked.scalars_literal(),
            "{ \"u_zoom\": 1, \"u_complexity\": 3, \"u_speed\": 1, \"u_distortion\": 0.5 }"
        );
    }
}
