use anyhow::Result;
use winit::{
    dpi::PhysicalSize,
    event_loop::ActiveEventLoop,
    window::{
        Window,
        WindowAttributes,
    },
};

pub fn create_window(event_loop: &ActiveEventLoop, window_size: PhysicalSize<u32>) -> Result<Window> {
    let window_attributes = WindowAttributes::default()
        .with_title("Ray")
        .with_inner_size(window_size)
        .with_resizable(false);
    Ok(event_loop.create_window(window_attributes)?)
}
