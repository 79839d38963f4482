use glam::Vec4;

/// Color attachment blending.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// Fragment color overwrites the attachment.
    Replace,
    /// Straight alpha: `src * src.a + dst * (1 - src.a)` on all four channels.
    #[default]
    AlphaBlend,
}

impl BlendMode {
    #[inline]
    pub fn apply(self, src: Vec4, dst: Vec4) -> Vec4 {
        match self {
            BlendMode::Replace => src,
            BlendMode::AlphaBlend => src * src.w + dst * (1.0 - src.w),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum DepthTest {
    Disabled,
    /// Pass when `new <= stored`, then write `new`.
    #[default]
    LessEqual,
}

impl DepthTest {
    #[inline]
    pub fn passes(self, depth: f32, stored: f32) -> bool {
        match self {
            DepthTest::Disabled => true,
            DepthTest::LessEqual => depth <= stored,
        }
    }

    #[inline]
    pub fn writes(self) -> bool {
        matches!(self, DepthTest::LessEqual)
    }
}

/// Fixed-function state of the software executor.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct RasterState {
    pub blend: BlendMode,
    pub depth: DepthTest,
}

impl RasterState {
    /// Instanced-mesh pipeline: alpha blending, depth `LessEqual`.
    pub const fn mesh() -> Self {
        Self { blend: BlendMode::AlphaBlend, depth: DepthTest::LessEqual }
    }

    /// Flat pipeline: alpha blending, no depth.
    pub const fn flat() -> Self {
        Self { blend: BlendMode::AlphaBlend, depth: DepthTest::Disabled }
    }
}

/// Color + depth target, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Vec4>,
    depth: Vec<f32>,
}

impl Framebuffer {
    /// Color cleared to `clear`, depth cleared to 1.0.
    pub fn new(width: u32, height: u32, clear: Vec4) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![clear; len],
            depth: vec![1.0; len],
        }
    }

    pub fn clear(&mut self, color: Vec4) {
        self.color.fill(color);
        self.depth.fill(1.0);
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
    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.color[self.offset(x, y)]
    }

    #[inline]
    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.depth[self.offset(x, y)]
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.color
    }

    /// Number of pixels equal to `color`.
    pub fn count(&self, color: Vec4) -> usize {
        self.color.iter().filter(|c| **c == color).count()
    }

    /// Depth test, blend and write one fragment. Returns whether it landed.
    pub(crate) fn write(&mut self, x: u32, y: u32, depth: f32, color: Vec4, state: RasterState) -> bool {
        let i = self.offset(x, y);
        if !state.depth.passes(depth, self.depth[i]) {
            return false;
        }
        if state.depth.writes() {
            self.depth[i] = depth;
        }
        self.color[i] = state.blend.apply(color, self.color[i]);
        true
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
