pub mod commands;
mod deferred;
pub mod descriptors;
pub mod gbuffer;
pub mod pipeline;
pub mod render_pass;
pub mod scene;
pub mod uniforms;

pub use deferred::DeferredRenderer;
