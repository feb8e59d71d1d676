use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::context::SurfaceSize;
use crate::types::{AdapterProfile, GpuPowerPreference, PresentPreference};

/// Callback fired from wgpu when the device goes away for a reason other
/// than our own teardown.
pub type DeviceLostHook = Arc<dyn Fn(String) + Send + Sync>;

/// Device, queue and configured surface for one acquisition. Dropping it
/// releases every GPU object it owns.
pub(crate) struct DeviceState {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub adapter_profile: AdapterProfile,
}

impl DeviceState {
    pub(crate) fn new<W>(
        target: Arc<W>,
        size: SurfaceSize,
        power: GpuPowerPreference,
        present: PresentPreference,
        lost_hook: Option<DeviceLostHook>,
    ) -> Result<Self, String>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(target)
            .map_err(|err| format!("failed to create rendering surface: {err}"))?;

        let power_preference = match power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| format!("failed to find a suitable GPU adapter: {err}"))?;

        let adapter_profile = AdapterProfile::from_wgpu(&adapter.get_info());
        tracing::debug!(
            name = %adapter_profile.name,
            backend = %adapter_profile.backend,
            software = adapter_profile.software,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let width = size.width.max(1);
        let height = size.height.max(1);
        if width > limits.max_texture_dimension_2d || height > limits.max_texture_dimension_2d {
            return Err(format!(
                "GPU max texture dimension is {}, requested surface is {width}x{height}",
                limits.max_texture_dimension_2d
            ));
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("shaderdeck device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| format!("failed to create GPU device: {err}"))?;

        if let Some(hook) = lost_hook {
            device.set_device_lost_callback(move |reason, message| {
                if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                    return;
                }
                hook(message);
            });
        }

        let caps = surface.get_capabilities(&adapter);
        // Effect colors are authored gamma-encoded, as in the exported WebGL
        // canvas, so prefer a non-sRGB swapchain.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| "surface reports no supported formats".to_string())?;
        if format.is_srgb() {
            tracing::warn!(?format, "no linear surface format available; colors will be brighter");
        }

        let wanted_mode = match present {
            PresentPreference::Vsync => wgpu::PresentMode::Fifo,
            PresentPreference::Immediate => wgpu::PresentMode::Immediate,
        };
        let present_mode = caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wanted_mode)
            .unwrap_or(wgpu::PresentMode::Fifo);
        tracing::debug!(?present_mode, ?format, "configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effect uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            uniform_layout,
            adapter_profile,
        })
    }

    pub(crate) fn resize(&mut self, size: SurfaceSize) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}
