use std::fmt::{self, Write as _};

use catalog::{uniforms, EffectDefinition};

/// Pass-through vertex stage for the full-screen quad, attribute 0.
pub const VERTEX_SOURCE_ES: &str = "#version 300 es
layout(location = 0) in vec2 a_position;
out vec2 v_uv;

void main() {
    v_uv = a_position * 0.5 + 0.5;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Wraps an effect body into a GLSL ES 3.00 fragment shader with loose
/// uniforms, the form WebGL2 binds by name.
pub fn fragment_source_es(definition: &EffectDefinition) -> String {
    let mut source = String::from("#version 300 es\nprecision highp float;\n\n");
    let _ = writeln!(source, "uniform vec2 {};", uniforms::RESOLUTION);
    for name in [
        uniforms::TIME,
        uniforms::ZOOM,
        uniforms::COMPLEXITY,
        uniforms::SPEED,
        uniforms::DISTORTION,
    ] {
        let _ = writeln!(source, "uniform float {name};");
    }
    for name in uniforms::PALETTE {
        let _ = writeln!(source, "uniform vec3 {name};");
    }
    for parameter in &definition.custom_parameters {
        let _ = writeln!(source, "uniform float {};", parameter.uniform_name);
    }
    source.push_str("\nin vec2 v_uv;\nout vec4 fragColor;\n\n");
    source.push_str(definition.fragment_source.trim_end());
    // WebGL already has a bottom-left gl_FragCoord origin.
    source.push_str("\n\nvoid main() {\n    fragColor = effect(gl_FragCoord.xy);\n}\n");
    source
}

/// A bare integer literal in a float context. GLSL 4.50 converts these
/// implicitly but GLSL ES 3.00 rejects them, so such a body builds for the
/// preview and fails in every exported artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortabilityIssue {
    pub line: usize,
    pub literal: String,
}

impl fmt::Display for PortabilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: integer literal `{}` outside an integer context; write `{}.0` for GLSL ES 3.00",
            self.line, self.literal, self.literal
        )
    }
}

const INTEGER_TYPES: &[&str] = &[
    "int", "ivec2", "ivec3", "ivec4", "uint", "uvec2", "uvec3", "uvec4",
];
const FLOAT_TYPES: &[&str] = &[
    "float", "vec2", "vec3", "vec4", "mat2", "mat3", "mat4",
];
const QUALIFIERS: &[&str] = &["const", "highp", "mediump", "lowp"];

/// Scans an effect body for integer literals used outside `for` headers,
/// subscripts, integer constructors and integer declarations.
pub fn es_portability_issues(body: &str) -> Vec<PortabilityIssue> {
    let chars: Vec<char> = body.chars().collect();
    let mut issues = Vec::new();
    let mut line = 1;
    // One entry per open `(` or `[`: whether integers are allowed inside.
    let mut groups: Vec<bool> = Vec::new();
    let mut statement_start = true;
    let mut statement_is_integer = false;
    let mut last_word = String::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        let next = chars.get(index + 1).copied();
        match ch {
            '\n' => {
                line += 1;
                index += 1;
            }
            '/' if next == Some('/') => {
                while index < chars.len() && chars[index] != '\n' {
                    index += 1;
                }
            }
            '/' if next == Some('*') => {
                index += 2;
                while index < chars.len() && !(chars[index] == '*' && chars.get(index + 1) == Some(&'/')) {
                    if chars[index] == '\n' {
                        line += 1;
                    }
                    index += 1;
                }
                index += 2;
            }
            '#' if statement_start => {
                while index < chars.len() && chars[index] != '\n' {
                    index += 1;
                }
            }
            '(' | '[' => {
                let enclosing = groups.last().copied().unwrap_or(statement_is_integer);
                let integer = ch == '['
                    || last_word == "for"
                    || INTEGER_TYPES.contains(&last_word.as_str())
                    || (enclosing && !FLOAT_TYPES.contains(&last_word.as_str()));
                groups.push(integer);
                last_word.clear();
                index += 1;
            }
            ')' | ']' => {
                groups.pop();
                last_word.clear();
                index += 1;
            }
            ';' | '{' | '}' => {
                if groups.is_empty() {
                    statement_start = true;
                    statement_is_integer = false;
                }
                last_word.clear();
                index += 1;
            }
            _ if ch.is_ascii_alphabetic() || ch == '_' => {
                let start = index;
                while index < chars.len() && (chars[index].is_ascii_alphanumeric() || chars[index] == '_') {
                    index += 1;
                }
                let word: String = chars[start..index].iter().collect();
                if statement_start && groups.is_empty() && !QUALIFIERS.contains(&word.as_str()) {
                    statement_is_integer = INTEGER_TYPES.contains(&word.as_str());
                    statement_start = false;
                }
                last_word = word;
            }
            _ if ch.is_ascii_digit() || (ch == '.' && next.is_some_and(|c| c.is_ascii_digit())) => {
                let start = index;
                while index < chars.len() {
                    let current = chars[index];
                    let exponent_sign = matches!(current, '+' | '-')
                        && matches!(chars[index - 1], 'e' | 'E')
                        && !chars[start..index].contains(&'x');
                    if current.is_ascii_alphanumeric() || current == '.' || exponent_sign {
                        index += 1;
                    } else {
                        break;
                    }
                }
                let literal: String = chars[start..index].iter().collect();
                let hex = literal.starts_with("0x") || literal.starts_with("0X");
                let float = !hex && literal.contains(['.', 'e', 'E']);
                let integer_context = groups.last().copied().unwrap_or(statement_is_integer);
                if !float && !integer_context {
                    issues.push(PortabilityIssue { line, literal });
                }
                statement_start = false;
                last_word.clear();
            }
            _ => {
                if !ch.is_whitespace() {
                    last_word.clear();
                }
                index += 1;
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::EffectCatalog;

    #[test]
    fn declares_shared_and_custom_uniforms() {
        let definition = EffectCatalog::builtin().unwrap().get("aurora").unwrap();
        let source = fragment_source_es(&definition);
        assert!(source.starts_with("#version 300 es\nprecision highp float;"));
        assert!(source.contains("uniform vec2 u_resolution;"));
        assert!(source.contains("uniform vec3 u_color5;"));
        assert!(source.contains("uniform float u_band_count;"));
        assert!(source.contains("uniform float u_shimmer;"));
        assert!(source.contains("vec4 effect(vec2 fragCoord)"));
        assert!(source.trim_end().ends_with("fragColor = effect(gl_FragCoord.xy);\n}"));
    }

    #[test]
    fn catalog_bodies_are_portable_to_glsl_es() {
        let catalog = EffectCatalog::builtin().unwrap();
        for definition in catalog.list() {
            let issues = es_portability_issues(&definition.fragment_source);
            assert!(issues.is_empty(), "{}: {issues:?}", definition.id);
        }
    }

    #[test]
    fn flags_integer_literals_in_float_expressions() {
        let body = "vec4 effect(vec2 fragCoord) {\n    // 3 is fine in a comment\n    float t = 2 * u_time;\n    vec3 c = vec3(1, 0.5, 0.0);\n    return vec4(c, 1.0);\n}\n";
        let issues = es_portability_issues(body);
        let found: Vec<(usize, &str)> = issues.iter().map(|issue| (issue.line, issue.literal.as_str())).collect();
        assert_eq!(found, [(3, "2"), (4, "1")]);
        assert!(issues[0].to_string().contains("write `2.0`"));
    }

    #[test]
    fn allows_integers_in_integer_contexts() {
        let body = "float f(float v[4]) {\n    int n = 3;\n    for (int i = 0; i < 8; i++) {\n        if (i >= n) { break; }\n    }\n    return v[2] * 1e3 + float(ivec2(1, 2).x) + 2.5e-1;\n}\n";
        assert!(es_portability_issues(body).is_empty());
    }
}
