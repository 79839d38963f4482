use anyhow::{Result, bail};

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Features the adapter must expose. Checked before the device is requested.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Defaults plus what the instanced pipeline needs: sampled texture
    /// arrays, non-uniform indexing into them, and room for `slots` array
    /// elements per shader stage.
    pub fn bindless(slots: u32) -> Self {
        let mut init = Self::default();
        init.required_features = init.required_features | bindless_features();
        init.required_limits.max_binding_array_elements_per_shader_stage = init
            .required_limits
            .max_binding_array_elements_per_shader_stage
            .max(slots);
        init
    }
}

/// Device features required to index a texture array with a per-instance id.
pub fn bindless_features() -> wgpu::Features {
    wgpu::Features::TEXTURE_BINDING_ARRAY
        | wgpu::Features::SAMPLED_TEXTURE_AND_STORAGE_BUFFER_ARRAY_NON_UNIFORM_INDEXING
}

/// Fails with the list of missing features.
pub fn require_features(available: wgpu::Features, required: wgpu::Features, what: &str) -> Result<()> {
    let missing = required - available;
    if !missing.is_empty() {
        bail!("{what} requires unsupported device features: {missing:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindless_adds_features_and_limits() {
        let init = GpuInit::bindless(64);
        assert!(init.required_features.contains(bindless_features()));
        assert!(init.required_limits.max_binding_array_elements_per_shader_stage >= 64);
        assert!(GpuInit::default().required_features.is_empty());
    }

    #[test]
    fn missing_features_are_named() {
        let err = require_features(
            wgpu::Features::TEXTURE_BINDING_ARRAY,
            bindless_features(),
            "instanced mesh pipeline",
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("instanced mesh pipeline"), "{err}");
        assert!(err.contains("NON_UNIFORM_INDEXING"), "{err}");
        assert!(require_features(bindless_features(), bindless_features(), "x").is_ok());
    }
}
