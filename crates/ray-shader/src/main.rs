use anyhow::Result;
use ray_shader::command::compile_all;

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
    let compiled = compile_all()?;
    log::info!("compiled {} shader(s)", compiled.len());
    Ok(())
}
