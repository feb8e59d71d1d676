//! Names for the generated module: the exported class, the custom element tag
//! and the file name.

use crate::ExportError;

/// Names the class may not take: JavaScript reserved words, host globals the
/// module touches and the module's own top-level bindings.
const RESERVED: &[&str] = &[
    "Array", "Boolean", "Class", "Date", "Document", "Element", "Error", "Float32Array",
    "Function", "HTMLElement", "Infinity", "JSON", "Math", "NaN", "Number", "Object", "Promise",
    "ResizeObserver", "String", "Symbol", "WebGL2RenderingContext", "WebGLBuffer",
    "WebGLProgram", "WebGLShader", "WebGLUniformLocation", "Window", "CUSTOM", "LAYERS",
    "PALETTE", "PALETTE_UNIFORMS", "QUAD", "SCALARS", "VERTEX_SOURCE", "FRAGMENT_SOURCE",
];

/// Hyphenated names HTML refuses as custom element tags.
const RESERVED_TAGS: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Identifiers derived for one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub component_name: String,
    pub tag_name: String,
    pub file_name: String,
}

/// Derives the artifact names from an explicit component name, falling back
/// to the effect id.
///
/// An explicit name that is already a PascalCase identifier is kept verbatim;
/// anything else is split on non-alphanumeric characters and recased. Names
/// derived from an effect id always end in `Shader`.
pub fn derive_names(requested: Option<&str>, effect_id: &str) -> Result<ArtifactNames, ExportError> {
    let requested = requested.map(str::trim).filter(|name| !name.is_empty());
    let mut component = match requested {
        Some(name) if is_pascal_identifier(name) => name.to_string(),
        Some(name) => pascal_case(name)
            .ok_or_else(|| ExportError::InvalidName(format!("'{name}' has no letters or digits")))?,
        None => {
            let base = pascal_case(effect_id).unwrap_or_else(|| "Effect".to_string());
            if base.ends_with("Shader") && base != "Shader" {
                base
            } else {
                format!("{base}Shader")
            }
        }
    };
    if RESERVED.contains(&component.as_str()) {
        component.push_str("Element");
    }

    let mut tag_name = kebab_case(&component);
    if !tag_name.contains('-') || RESERVED_TAGS.contains(&tag_name.as_str()) {
        tag_name.push_str("-element");
    }
    let file_name = format!("{component}.js");
    Ok(ArtifactNames {
        component_name: component,
        tag_name,
        file_name,
    })
}

fn is_pascal_identifier(name: &str) -> bool {
    name.starts_with(|ch: char| ch.is_ascii_uppercase())
        && name.chars().all(|ch| ch.is_ascii_alphanumeric())
}

fn pascal_case(source: &str) -> Option<String> {
    let mut out = String::new();
    for segment in source
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|segment| !segment.is_empty())
    {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    if out.is_empty() {
        return None;
    }
    if out.starts_with(|ch: char| ch.is_ascii_digit()) {
        out.insert_str(0, "Fx");
    }
    Some(out)
}

/// `WebGLShader` → `web-gl-shader`.
fn kebab_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (index, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() && index > 0 {
            let prev = chars[index - 1];
            let next_lower = chars
                .get(index + 1)
                .is_some_and(|next| next.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower)
            {
                out.push('-');
            }
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}
