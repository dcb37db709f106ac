use anyhow::{Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::TextureFormatFeatureFlags;

use super::{Antialiasing, GpuOptions};

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    pub msaa_view: Option<wgpu::TextureView>,
}

impl GpuContext {
    pub(crate) fn new<T>(target: T, size: (u32, u32), options: &GpuOptions) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(target)
            .context("failed to create rendering surface")?;

        let power_preference = if options.low_power {
            wgpu::PowerPreference::LowPower
        } else {
            wgpu::PowerPreference::HighPerformance
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        let is_software = adapter_info.device_type == wgpu::DeviceType::Cpu;
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            is_software,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        let width = size.0.max(1);
        let height = size.1.max(1);
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}"
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;

        let format_features = adapter.get_texture_format_features(surface_format);
        let adapter_specific = adapter
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);
        let sample_count = select_sample_count(
            options.antialiasing,
            format_features.flags.supported_sample_counts(),
            SampleSupport {
                can_resolve: format_features
                    .flags
                    .contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE),
                adapter_specific,
                is_software,
            },
        );

        let mut required_features = wgpu::Features::empty();
        if needs_adapter_specific_formats(sample_count) {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("lineframe device"),
            required_features,
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured wgpu error");
        }));

        let present_mode = select_present_mode(options.vsync, &surface_caps.present_modes);
        tracing::debug!(?present_mode, sample_count, ?surface_format, "configuring surface");

        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let msaa_view = multisample_view(&device, &config, sample_count);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            sample_count,
            surface_format,
            msaa_view,
        })
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.msaa_view = multisample_view(&self.device, &self.config, self.sample_count);
    }

    /// Reconfigures the surface with its current size, used after `Lost` or
    /// `Outdated` acquisitions.
    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}

/// Adapter capabilities that bound the MSAA sample count.
#[derive(Debug, Clone, Copy)]
struct SampleSupport {
    can_resolve: bool,
    /// `TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES` is available.
    adapter_specific: bool,
    is_software: bool,
}

/// Sample counts other than 1 and 4 are adapter-specific in wgpu.
fn needs_adapter_specific_formats(sample_count: u32) -> bool {
    !matches!(sample_count, 1 | 4)
}

/// Resolves the antialiasing policy against what the surface format supports.
fn select_sample_count(
    policy: Antialiasing,
    mut supported: Vec<u32>,
    support: SampleSupport,
) -> u32 {
    if !support.adapter_specific {
        supported.retain(|&count| !needs_adapter_specific_formats(count));
    }
    if !supported.contains(&1) {
        supported.push(1);
    }
    supported.sort_unstable();
    supported.dedup();
    let at_most = |limit: u32| {
        supported
            .iter()
            .copied()
            .filter(|&count| count <= limit)
            .max()
            .unwrap_or(1)
    };

    let samples = match policy {
        Antialiasing::Off => 1,
        Antialiasing::Auto => at_most(4),
        Antialiasing::Samples(requested) if supported.contains(&requested) => requested,
        Antialiasing::Samples(requested) => {
            let fallback = at_most(requested);
            tracing::warn!(
                requested,
                fallback,
                ?supported,
                "MSAA sample count not supported; lowering"
            );
            fallback
        }
    };

    if samples > 1 && !support.can_resolve {
        tracing::warn!("surface format cannot resolve multisampled targets; MSAA off");
        return 1;
    }
    if samples > 1 && support.is_software {
        tracing::warn!(samples, "software adapter; MSAA off");
        return 1;
    }
    samples
}

/// Fifo with vsync; otherwise the lowest-latency mode the surface offers.
fn select_present_mode(vsync: bool, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

fn multisample_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> Option<wgpu::TextureView> {
    if sample_count <= 1 {
        return None;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("msaa color target"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}
