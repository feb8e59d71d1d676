/// Adapter power preference forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

/// Presentation pacing for the preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentPreference {
    /// Wait for vertical blank (Fifo).
    #[default]
    Vsync,
    /// Present as soon as a frame is ready when the surface allows it.
    Immediate,
}

/// What we learned about the adapter wgpu picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: String,
    pub software: bool,
}

impl AdapterProfile {
    pub(crate) fn from_wgpu(info: &wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name.clone(),
            backend: format!("{:?}", info.backend),
            software: info.device_type == wgpu::DeviceType::Cpu,
        }
    }
}

/// Immutable configuration for the interactive preview window.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    pub power: GpuPowerPreference,
    pub present: PresentPreference,
    /// Seconds to hold the clock at; `None` animates in real time.
    pub still_time: Option<f32>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "shaderdeck preview".into(),
            power: GpuPowerPreference::default(),
            present: PresentPreference::default(),
            still_time: None,
        }
    }
}
