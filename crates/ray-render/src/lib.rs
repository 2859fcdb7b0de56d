pub mod app;
mod common;
pub mod context;
pub mod draw;
pub mod error;
mod shader;
mod texture;
mod utils;
