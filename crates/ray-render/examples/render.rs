use anyhow::{
    Context as _,
    Result,
};
use ray_base::path::{
    get_project_root,
    get_render_config_path,
    get_shader_spv_root,
};
use ray_render::{
    app::app::{
        App,
        AppSettings,
        ShaderSources,
        TextureImage,
    },
    error::status_of,
};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Configs {
    width: u32,
    height: u32,
    #[serde(default)]
    textures: Vec<String>,
    #[serde(default = "default_validation")]
    validation: bool,
}

fn default_validation() -> bool {
    cfg!(debug_assertions)
}

fn read_spv(spv_root: &Path, name: &str) -> Result<Vec<u8>> {
    let path = spv_root.join("deferred").join(format!("{name}.spv"));
    std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_texture(path: &Path) -> Result<TextureImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    log::info!("loaded {} ({}x{})", path.display(), width, height);
    Ok(TextureImage {
        width,
        height,
        pixels: image.into_raw(),
    })
}

fn settings() -> Result<AppSettings> {
    log::info!("Parsing configs");
    let configs: Configs =
        serde_json::from_str(&std::fs::read_to_string(get_render_config_path()?)?)?;

    log::info!("Compiling shaders");
    ray_shader::command::compile_all()?;

    let spv_root = get_shader_spv_root()?;
    let shaders = ShaderSources {
        geometry_vertex: read_spv(&spv_root, "geometry.vert")?,
        geometry_fragment: read_spv(&spv_root, "geometry.frag")?,
        lighting_vertex: read_spv(&spv_root, "lighting.vert")?,
        lighting_fragment: read_spv(&spv_root, "lighting.frag")?,
    };

    // a missing image leaves its slot on the default white texture
    let project_root = get_project_root()?;
    let textures = configs
        .textures
        .iter()
        .map(|texture| {
            load_texture(&project_root.join(texture))
                .map_err(|error| log::warn!("{error:#}"))
                .ok()
        })
        .collect();

    Ok(AppSettings {
        window_size: winit::dpi::PhysicalSize::new(configs.width, configs.height),
        validation: configs.validation,
        shaders,
        textures,
    })
}

fn run() -> Result<()> {
    let settings = settings()?;

    log::info!("Starting Ray Render");
    let event_loop = winit::event_loop::EventLoop::builder().build()?;
    let mut app = App::new(settings);
    event_loop.run_app(&mut app)?;
    match app.take_error() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn main() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if let Err(error) = run() {
        log::error!("{error:?}");
        std::process::exit(status_of(&error));
    }
}
