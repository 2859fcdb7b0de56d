pub mod allocator;
pub mod buffer;
pub mod command_buffer;
pub mod command_pool;
pub mod consts;
pub mod debug;
pub mod descriptor_pool;
pub mod descriptor_set;
pub mod descriptor_set_layout;
pub mod device;
pub mod extension;
pub mod framebuffer;
pub mod graphics_pipeline;
pub mod image;
pub mod image_view;
pub mod instance;
pub mod layer;
pub mod memory;
pub mod physical_device;
pub mod pipeline_layout;
pub mod queue_family;
pub mod render_pass;
pub mod storage_buffer;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod uniform_buffer;
pub mod vertex;
