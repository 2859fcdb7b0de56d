pub mod app;
mod camera;
mod input;
mod window;
