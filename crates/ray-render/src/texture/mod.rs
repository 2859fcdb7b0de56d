pub mod texture;
pub mod texture_sampler;
