use std::fmt::Write as _;

use catalog::EffectDefinition;
use wgpu::naga;

use crate::uniforms::UniformLayout;

/// Pipeline stage a shader object is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

/// Triangle-strip corners of the full-screen quad in clip space.
pub const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Pass-through vertex shader shared by every effect.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_position * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Name of the uniform block instance; effect bodies reach its members
/// through the `#define` aliases emitted by [`wrap_fragment`].
const BLOCK_INSTANCE: &str = "fx";

/// Produces a complete GLSL 4.50 fragment shader for an effect.
///
/// 1. Declares every input in one std140 block ordered as `layout`, with
///    members prefixed by `_` and aliased back to their public names.
/// 2. Appends the effect body, which must define `vec4 effect(vec2)`.
/// 3. Appends a `main` that flips `gl_FragCoord` to a bottom-left origin.
pub fn wrap_fragment(definition: &EffectDefinition, layout: &UniformLayout) -> String {
    let mut source = String::from(
        "#version 450\n\
         layout(location = 0) in vec2 v_uv;\n\
         layout(location = 0) out vec4 outColor;\n\n\
         layout(std140, set = 0, binding = 0) uniform EffectUniforms {\n",
    );
    for slot in layout.slots() {
        let _ = writeln!(source, "    {} _{};", slot.kind.glsl_type(), slot.name);
    }
    let _ = writeln!(source, "}} {BLOCK_INSTANCE};\n");
    for slot in layout.slots() {
        let _ = writeln!(source, "#define {0} {BLOCK_INSTANCE}._{0}", slot.name);
    }
    source.push_str("\n#line 1\n");
    source.push_str(definition.fragment_source.trim_end());
    source.push_str(FOOTER);
    source
}

const FOOTER: &str = r"

void main() {
    vec2 fragCoord = vec2(gl_FragCoord.x, u_resolution.y - gl_FragCoord.y);
    outColor = effect(fragCoord);
}
";

/// Parses and validates GLSL with naga, returning the IR module.
///
/// The error string carries the formatted diagnostic with source spans.
pub fn validate_glsl(stage: ShaderStage, source: &str) -> Result<naga::Module, String> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(stage.to_naga());
    let module = frontend
        .parse(&options, source)
        .map_err(|err| err.emit_to_string(source))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| err.emit_to_string(source))?;
    Ok(module)
}

/// User-defined locations written by a vertex entry point, or read by a
/// fragment entry point.
pub(crate) fn interface_locations(module: &naga::Module, stage: ShaderStage) -> Vec<u32> {
    let Some(entry) = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage.to_naga())
    else {
        return Vec::new();
    };

    let mut locations = Vec::new();
    match stage {
        ShaderStage::Vertex => {
            if let Some(result) = entry.function.result.as_ref() {
                collect_locations(module, result.ty, result.binding.as_ref(), &mut locations);
            }
        }
        ShaderStage::Fragment => {
            for argument in &entry.function.arguments {
                collect_locations(module, argument.ty, argument.binding.as_ref(), &mut locations);
            }
        }
    }
    locations.sort_unstable();
    locations.dedup();
    locations
}

fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push(*location),
        Some(_) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::EffectCatalog;

    fn plasma() -> std::sync::Arc<EffectDefinition> {
        EffectCatalog::builtin().unwrap().get("plasma").unwrap()
    }

    #[test]
    fn wrap_aliases_every_uniform() {
        let definition = plasma();
        let layout = UniformLayout::for_effect(&definition);
        let wrapped = wrap_fragment(&definition, &layout);
        assert!(wrapped.contains("    vec3 _u_color5;"));
        assert!(wrapped.contains("#define u_frequency fx._u_frequency"));
        assert!(wrapped.contains("outColor = effect(fragCoord);"));
        assert!(wrapped.starts_with("#version 450"));
    }

    #[test]
    fn vertex_and_wrapped_fragment_validate() {
        let definition = plasma();
        let layout = UniformLayout::for_effect(&definition);
        let vertex = validate_glsl(ShaderStage::Vertex, VERTEX_SHADER_GLSL).unwrap();
        let fragment =
            validate_glsl(ShaderStage::Fragment, &wrap_fragment(&definition, &layout)).unwrap();
        assert_eq!(interface_locations(&vertex, ShaderStage::Vertex), vec![0]);
        let inputs = interface_locations(&fragment, ShaderStage::Fragment);
        assert!(inputs.iter().all(|location| *location == 0));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = validate_glsl(ShaderStage::Vertex, "#version 450\nvoid main() { oops }\n")
            .unwrap_err();
        assert!(!err.is_empty());
    }
}
