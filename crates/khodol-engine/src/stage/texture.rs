//! CPU texture table and sampler.
//!
//! The table is the reference for the GPU `binding_array<texture_2d<f32>>`:
//! one shared sampler, images addressed by slot. Lookups go through
//! [`ArrayIndex`], which records whether the index is constant across a draw
//! or may differ per invocation.

use glam::{Vec2, Vec4};

use super::error::TextureError;
use crate::records::TextureId;

// ── images ────────────────────────────────────────────────────────────────

/// RGBA image with linear `f32` texels, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl Image {
    pub fn new(width: u32, height: u32, texels: Vec<Vec4>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self { width, height, texels })
    }

    /// Decodes 8-bit sRGB-encoded RGBA (alpha stays linear).
    pub fn from_rgba8_srgb(width: u32, height: u32, bytes: &[u8]) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }
        let texels = bytes
            .chunks_exact(4)
            .map(|px| {
                Vec4::new(
                    srgb_to_linear(px[0] as f32 / 255.0),
                    srgb_to_linear(px[1] as f32 / 255.0),
                    srgb_to_linear(px[2] as f32 / 255.0),
                    px[3] as f32 / 255.0,
                )
            })
            .collect();
        Self::new(width, height, texels)
    }

    /// Single-color image. Zero dimensions are bumped to one.
    pub fn solid(width: u32, height: u32, color: Vec4) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            texels: vec![color; width as usize * height as usize],
        }
    }

    /// `size`×`size` checkerboard with `cells` squares per side.
    pub fn checkerboard(size: u32, cells: u32, a: Vec4, b: Vec4) -> Self {
        let size = size.max(1);
        let cell = (size / cells.max(1)).max(1);
        let texels = (0..size)
            .flat_map(|y| (0..size).map(move |x| if (x / cell + y / cell) % 2 == 0 { a } else { b }))
            .collect();
        Self { width: size, height: size, texels }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Texel at integer coordinates; caller keeps them in range.
    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.texels[y as usize * self.width as usize + x as usize]
    }

    /// Encodes to 8-bit sRGB RGBA for upload.
    pub fn to_rgba8_srgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.texels.len() * 4);
        for t in &self.texels {
            out.push(unorm8(linear_to_srgb(t.x)));
            out.push(unorm8(linear_to_srgb(t.y)));
            out.push(unorm8(linear_to_srgb(t.z)));
            out.push(unorm8(t.w));
        }
        out
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn unorm8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

// ── sampler ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum AddressMode {
    #[default]
    Repeat,
    ClampToEdge,
}

impl AddressMode {
    /// Brings a texel-space coordinate into `[0, extent]` before it is
    /// converted to an integer. Non-finite coordinates land on 0 under repeat.
    #[inline]
    fn fold(self, x: f32, extent: u32) -> f32 {
        let n = extent as f32;
        match self {
            AddressMode::Repeat if x.is_finite() => x.rem_euclid(n),
            AddressMode::Repeat => 0.0,
            AddressMode::ClampToEdge if x.is_nan() => 0.0,
            AddressMode::ClampToEdge => x.clamp(0.0, n),
        }
    }

    #[inline]
    fn resolve(self, i: i64, extent: u32) -> u32 {
        let n = extent as i64;
        match self {
            AddressMode::Repeat => i.rem_euclid(n) as u32,
            AddressMode::ClampToEdge => i.clamp(0, n - 1) as u32,
        }
    }
}

/// Filter and addressing shared by every image of a table. No mipmaps.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Sampler {
    pub filter: Filter,
    pub address: AddressMode,
}

impl Sampler {
    pub const fn new(filter: Filter, address: AddressMode) -> Self {
        Self { filter, address }
    }

    /// Texel centers sit at `(i + 0.5) / extent`.
    pub fn sample(&self, image: &Image, uv: Vec2) -> Vec4 {
        let x = self.address.fold(uv.x * image.width as f32, image.width);
        let y = self.address.fold(uv.y * image.height as f32, image.height);

        match self.filter {
            Filter::Nearest => {
                let xi = self.address.resolve(x.floor() as i64, image.width);
                let yi = self.address.resolve(y.floor() as i64, image.height);
                image.texel(xi, yi)
            }
            Filter::Linear => {
                let (x, y) = (x - 0.5, y - 0.5);
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);

                let xa = self.address.resolve(x0, image.width);
                let xb = self.address.resolve(x0 + 1, image.width);
                let ya = self.address.resolve(y0, image.height);
                let yb = self.address.resolve(y0 + 1, image.height);

                let top = lerp(image.texel(xa, ya), image.texel(xb, ya), fx);
                let bottom = lerp(image.texel(xa, yb), image.texel(xb, yb), fx);
                lerp(top, bottom, fy)
            }
        }
    }
}

// Exact when both ends agree, so solid images sample back unchanged.
#[inline]
fn lerp(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    a + (b - a) * t
}

// ── array indexing ────────────────────────────────────────────────────────

/// How an array index may vary across invocations of one draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Access {
    /// Same value for every invocation of the draw.
    Uniform,
    /// May differ per invocation; lowered to `nonuniformEXT`-style access.
    NonUniform,
}

/// Index into a [`TextureTable`] tagged with its [`Access`] mode.
///
/// Uniform indices can be built from any `u32`. Non-uniform ones only come
/// from [`TextureId::non_uniform`], which is the single path from a
/// per-invocation id to a table lookup.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ArrayIndex {
    slot: u32,
    access: Access,
}

impl ArrayIndex {
    #[inline]
    pub const fn uniform(slot: u32) -> Self {
        Self { slot, access: Access::Uniform }
    }

    #[inline]
    pub(crate) const fn non_uniform(slot: u32) -> Self {
        Self { slot, access: Access::NonUniform }
    }

    #[inline]
    pub const fn slot(self) -> u32 {
        self.slot
    }

    #[inline]
    pub const fn access(self) -> Access {
        self.access
    }
}

// ── table ─────────────────────────────────────────────────────────────────

/// Runtime-sized image table addressed by texture id.
#[derive(Debug, Clone, Default)]
pub struct TextureTable {
    images: Vec<Image>,
    sampler: Sampler,
}

impl TextureTable {
    pub fn new(sampler: Sampler) -> Self {
        Self { images: Vec::new(), sampler }
    }

    /// Appends an image and returns its slot.
    pub fn push(&mut self, image: Image) -> TextureId {
        let id = TextureId::new(self.images.len() as u32);
        self.images.push(image);
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, id: TextureId) -> Option<&Image> {
        self.images.get(id.slot() as usize)
    }

    #[inline]
    pub fn sampler(&self) -> Sampler {
        self.sampler
    }

    /// Samples the image at `index`.
    ///
    /// Draws validate ids up front, so an out-of-range index here is a bug in
    /// the caller: debug builds assert, release builds return transparent black.
    pub fn sample(&self, index: ArrayIndex, uv: Vec2) -> Vec4 {
        let Some(image) = self.images.get(index.slot() as usize) else {
            debug_assert!(
                false,
                "texture index {} outside table of {}",
                index.slot(),
                self.images.len()
            );
            return Vec4::ZERO;
        };
        self.sampler.sample(image, uv)
    }
}
