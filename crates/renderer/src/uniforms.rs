use catalog::uniforms as names;
use catalog::EffectDefinition;

/// GLSL type of a uniform slot. Every effect input is a float vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
}

impl UniformKind {
    pub fn glsl_type(self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
        }
    }

    fn size(self) -> u32 {
        match self {
            UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
        }
    }

    fn std140_alignment(self) -> u32 {
        match self {
            UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 16,
        }
    }
}

/// Value bound to a uniform location for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
        }
    }

    pub(crate) fn components(&self) -> &[f32] {
        match self {
            UniformValue::Float(value) => std::slice::from_ref(value),
            UniformValue::Vec2(value) => value,
            UniformValue::Vec3(value) => value,
        }
    }

    /// Writes the value into a std140 staging block at `offset`.
    pub(crate) fn write_std140(&self, block: &mut [u8], offset: u32) {
        let bytes: &[u8] = bytemuck::cast_slice(self.components());
        let start = offset as usize;
        if let Some(target) = block.get_mut(start..start + bytes.len()) {
            target.copy_from_slice(bytes);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u32,
}

/// std140 layout of the single uniform block every effect program reads.
///
/// The built-in inputs come first in a fixed order so their offsets are the
/// same for every effect; custom parameters follow in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    slots: Vec<UniformSlot>,
    size: u32,
}

impl UniformLayout {
    pub fn for_effect(definition: &EffectDefinition) -> Self {
        let mut layout = Self {
            slots: Vec::with_capacity(names::BUILTIN.len() + definition.custom_parameters.len()),
            size: 0,
        };
        layout.push(names::RESOLUTION, UniformKind::Vec2);
        layout.push(names::TIME, UniformKind::Float);
        layout.push(names::ZOOM, UniformKind::Float);
        layout.push(names::COMPLEXITY, UniformKind::Float);
        layout.push(names::SPEED, UniformKind::Float);
        layout.push(names::DISTORTION, UniformKind::Float);
        for name in names::PALETTE {
            layout.push(name, UniformKind::Vec3);
        }
        for parameter in &definition.custom_parameters {
            layout.push(&parameter.uniform_name, UniformKind::Float);
        }
        layout.size = round_up(layout.size, 16);
        layout
    }

    fn push(&mut self, name: &str, kind: UniformKind) {
        let offset = round_up(self.size, kind.std140_alignment());
        self.slots.push(UniformSlot {
            name: name.to_string(),
            kind,
            offset,
        });
        self.size = offset + kind.size();
    }

    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// Block size in bytes, padded to a 16-byte multiple.
    pub fn size(&self) -> u32 {
        self.size
    }
}

fn round_up(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::EffectCatalog;

    #[test]
    fn builtin_offsets_follow_std140() {
        let catalog = EffectCatalog::builtin().unwrap();
        let layout = UniformLayout::for_effect(&catalog.get("vortex").unwrap());
        let offset = |name: &str| layout.slot(name).unwrap().offset;
        assert_eq!(offset("u_resolution"), 0);
        assert_eq!(offset("u_time"), 8);
        assert_eq!(offset("u_distortion"), 24);
        assert_eq!(offset("u_color1"), 32);
        assert_eq!(offset("u_color5"), 96);
        assert_eq!(layout.size(), 112);
    }

    #[test]
    fn custom_parameters_pack_after_palette() {
        let catalog = EffectCatalog::builtin().unwrap();
        let layout = UniformLayout::for_effect(&catalog.get("aurora").unwrap());
        assert_eq!(layout.slot("u_band_count").unwrap().offset, 108);
        assert_eq!(layout.slot("u_shimmer").unwrap().offset, 112);
        assert_eq!(layout.size(), 128);
    }

    #[test]
    fn std140_writes_land_at_offset() {
        let mut block = vec![0u8; 16];
        UniformValue::Vec2([1.0, 2.0]).write_std140(&mut block, 8);
        let floats: Vec<f32> = block
            .chunks_exact(4)
            .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        assert_eq!(floats, vec![0.0, 0.0, 1.0, 2.0]);
    }
}
