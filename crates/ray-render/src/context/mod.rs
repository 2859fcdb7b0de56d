mod device_context;
mod render_context;
mod window_context;

pub use device_context::{
    DeviceContext,
    Queues,
};
pub use render_context::RenderContext;
pub use window_context::WindowContext;
