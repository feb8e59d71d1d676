//! Minimal `{{name}}` substitution for the embedded module template.
//!
//! Values are inserted verbatim and never rescanned, so a value containing
//! braces cannot introduce new placeholders. A placeholder without a value is
//! an error rather than an empty string.

use std::collections::BTreeMap;

use crate::ExportError;

pub const COMPONENT_TEMPLATE: &str = include_str!("../templates/component.js");

pub struct Template<'a> {
    source: &'a str,
}

impl<'a> Template<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    pub fn component() -> Self {
        Self::new(COMPONENT_TEMPLATE)
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&'a str> {
        let mut names = Vec::new();
        let mut rest = self.source;
        while let Some((_, name, after)) = next_placeholder(rest) {
            if !names.contains(&name) {
                names.push(name);
            }
            rest = after;
        }
        names
    }

    pub fn render(&self, values: &BTreeMap<&str, String>) -> Result<String, ExportError> {
        let mut out = String::with_capacity(self.source.len() + values.values().map(String::len).sum::<usize>());
        let mut rest = self.source;
        while let Some((before, name, after)) = next_placeholder(rest) {
            out.push_str(before);
            let value = values.get(name).ok_or_else(|| ExportError::Template {
                placeholder: name.to_string(),
            })?;
            out.push_str(value);
            rest = after;
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Splits `input` around the next `{{identifier}}`. Braces that do not
/// enclose a lowercase identifier are left as text.
fn next_placeholder(input: &str) -> Option<(&str, &str, &str)> {
    let mut offset = 0;
    while let Some(start) = input[offset..].find("{{") {
        let open = offset + start;
        let body_start = open + 2;
        if let Some(len) = input[body_start..].find("}}") {
            let name = &input[body_start..body_start + len];
            if !name.is_empty()
                && name
                    .chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
            {
                return Some((&input[..open], name, &input[body_start + len + 2..]));
            }
        }
        offset = body_start;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn substitutes_every_occurrence() {
        let template = Template::new("class {{name}} {} define('{{tag}}', {{name}});");
        let out = template
            .render(&values(&[("name", "PlasmaShader"), ("tag", "plasma-shader")]))
            .unwrap();
        assert_eq!(out, "class PlasmaShader {} define('plasma-shader', PlasmaShader);");
    }

    #[test]
    fn values_are_not_rescanned() {
        let template = Template::new("a {{x}} b");
        let out = template.render(&values(&[("x", "{{y}}")])).unwrap();
        assert_eq!(out, "a {{y}} b");
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = Template::new("{{present}} {{absent}}")
            .render(&values(&[("present", "1")]))
            .unwrap_err();
        assert!(matches!(err, ExportError::Template { placeholder } if placeholder == "absent"));
    }

    #[test]
    fn ignores_non_identifier_braces() {
        let template = Template::new("const o = {{ a: 1 }}; {{k}}");
        assert_eq!(template.placeholders(), ["k"]);
    }

    #[test]
    fn component_template_placeholders_are_known() {
        let names = Template::component().placeholders();
        for expected in [
            "banner",
            "component_name",
            "tag_name",
            "vertex_source",
            "fragment_source",
            "palette",
            "palette_uniforms",
            "scalars",
            "custom",
            "layers",
            "font_injections",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }
}
