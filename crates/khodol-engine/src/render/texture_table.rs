use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Result, ensure};

use super::common::{create_sampler, sampled_texture_entry, sampler_entry, upload_image};
use crate::device::{bindless_features, require_features};
use crate::records::TextureId;
use crate::stage::{Image, Sampler, TextureError};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Texture table sizing and sampling.
#[derive(Debug, Clone, Copy)]
pub struct TextureTableConfig {
    /// Number of array slots bound at group 1, binding 0.
    pub capacity: u32,
    pub sampler: Sampler,
}

impl Default for TextureTableConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            sampler: Sampler::default(),
        }
    }
}

/// GPU texture array indexed by per-instance [`TextureId`]s.
///
/// Slots are handed out in registration order. Slots past [`len`](Self::len)
/// are bound to a 1×1 white image, so every index below `capacity` names a
/// valid texture; draws still reject ids at or past `len`.
pub struct GpuTextureTable {
    id: u64,
    capacity: u32,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fallback: wgpu::TextureView,
    views: Vec<wgpu::TextureView>,

    bind_group: Option<wgpu::BindGroup>,
}

impl GpuTextureTable {
    /// Fails when the device was created without the bindless features or
    /// with a binding-array limit below `config.capacity`.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, config: TextureTableConfig) -> Result<Self> {
        require_features(device.features(), bindless_features(), "texture table")?;
        ensure!(config.capacity > 0, "texture table capacity must be non-zero");

        let limit = device.limits().max_binding_array_elements_per_shader_stage;
        ensure!(
            config.capacity <= limit,
            "texture table capacity {} exceeds device limit {limit}; request it with GpuInit::bindless",
            config.capacity
        );

        let count = NonZeroU32::new(config.capacity);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("khodol texture table layout"),
            entries: &[sampled_texture_entry(0, count), sampler_entry(1)],
        });

        let sampler = create_sampler(device, config.sampler, "khodol texture table sampler");
        let white = Image::solid(1, 1, glam::Vec4::ONE);
        let (_, fallback) = upload_image(device, queue, &white, "khodol fallback texture");

        log::debug!("texture table: {} slots, {:?}", config.capacity, config.sampler);

        Ok(Self {
            id: NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed),
            capacity: config.capacity,
            layout,
            sampler,
            fallback,
            views: Vec::new(),
            bind_group: None,
        })
    }

    /// Uploads `image` into the next free slot.
    pub fn register(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &Image,
    ) -> std::result::Result<TextureId, TextureError> {
        if self.views.len() as u32 >= self.capacity {
            return Err(TextureError::TableFull { capacity: self.capacity });
        }

        let id = TextureId::new(self.views.len() as u32);
        let label = format!("khodol texture {}", id.slot());
        let (_, view) = upload_image(device, queue, image, &label);
        self.views.push(view);
        self.bind_group = None;

        log::debug!("registered {}x{} texture as id {}", image.width(), image.height(), id.slot());
        Ok(id)
    }

    /// Registered textures.
    #[inline]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Process-unique id; pipelines built against this table's layout are
    /// keyed on it.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Bind group for the current contents, rebuilt after a registration.
    pub fn bind_group(&mut self, device: &wgpu::Device) -> &wgpu::BindGroup {
        self.bind_group.get_or_insert_with(|| {
            let views: Vec<&wgpu::TextureView> = (0..self.capacity as usize)
                .map(|slot| self.views.get(slot).unwrap_or(&self.fallback))
                .collect();

            log::debug!("texture table: rebuilding bind group ({} registered)", self.views.len());
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("khodol texture table"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureViewArray(&views),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            })
        })
    }
}

// ── single image ──────────────────────────────────────────────────────────

/// One uploaded image with its own sampler, for draws that never vary the
/// texture per instance.
pub struct GpuImage {
    id: u64,
    width: u32,
    height: u32,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl GpuImage {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, image: &Image, sampler: Sampler) -> Self {
        let id = NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed);
        let (_, view) = upload_image(device, queue, image, "khodol image");
        let sampler = create_sampler(device, sampler, "khodol image sampler");
        Self {
            id,
            width: image.width(),
            height: image.height(),
            view,
            sampler,
        }
    }

    /// Process-unique id; renderers key cached bind groups on it.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(super) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(super) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}
