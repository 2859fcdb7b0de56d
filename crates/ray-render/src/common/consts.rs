pub const APPLICATION_NAME: &str = "Ray";
pub const ENGINE_NAME: &str = "Ray Engine";

/// Swapchain length asked for before clamping to the surface limits.
pub const DESIRED_SWAPCHAIN_IMAGES: u32 = 2;

/// Combined image sampler slots in both the draw and lighting sets.
pub const MAX_TEXTURES: usize = 8;

/// Elements in the per-draw uniform array, one per indirect draw.
pub const UNIFORM_INSTANCES: usize = 2;

pub const FENCE_TIMEOUT: u64 = u64::MAX;
