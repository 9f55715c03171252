use std::sync::Arc;

use anyhow::{Context, Result};
use wgpu::{Adapter, Device, DeviceDescriptor, Features, Instance, Limits, Queue, Surface};
use winit::window::Window;

/// GPU handles shared by the window presenter and its egui renderer
///
/// Device and queue are reference counted so the presenter can hand them to
/// helpers without tying their lifetimes together.
#[derive(Clone)]
pub struct GpuContext {
    adapter: Arc<Adapter>,
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl GpuContext {
    /// Create a surface for `window` and a device compatible with it
    pub async fn for_window(window: Arc<Window>) -> Result<(Self, Surface<'static>)> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create window surface")?;
        let adapter = Self::request_adapter(&instance, &surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let context = Self {
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        };
        Ok((context, surface))
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    async fn request_adapter(instance: &Instance, surface: &Surface<'_>) -> Result<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow::anyhow!("failed to find an appropriate adapter: {e:?}"))
    }

    async fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
        let supported_features = adapter.features();
        let mut requested_features = Features::empty();

        if supported_features.contains(Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES) {
            requested_features |= Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        adapter
            .request_device(&DeviceDescriptor {
                label: Some("Viewport Device"),
                required_features: requested_features,
                required_limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| anyhow::anyhow!("failed to create device: {e:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_semantics() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<GpuContext>();
    }
}
