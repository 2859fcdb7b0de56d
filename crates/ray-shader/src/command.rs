use anyhow::{
    ensure,
    Context,
    Result,
};
use ray_base::path::{
    get_shader_spv_root,
    get_shader_src_root,
};
use std::{
    io::Write,
    path::{
        Path,
        PathBuf,
    },
    process::Command,
};

/// Stages the renderer consumes: one vertex/fragment pair per subpass.
pub const SHADER_EXTENSIONS: [&str; 2] = ["vert", "frag"];

/// Maps `<src_root>/a/b.vert` to `<spv_root>/a/b.vert.spv`.
pub fn spv_output_path(src_root: &Path, spv_root: &Path, input_path: &Path) -> Result<PathBuf> {
    let input_filename = input_path
        .file_name()
        .context("failed to get file name")?
        .to_str()
        .context("failed to convert to string")?;
    let output_filename = format!("{}.spv", input_filename);

    let relative_input_path = input_path.strip_prefix(src_root)?;
    let relative_output_path = relative_input_path.with_file_name(output_filename);
    Ok(spv_root.join(relative_output_path))
}

pub fn compile(input_path: &Path) -> Result<PathBuf> {
    let output_path = spv_output_path(
        &get_shader_src_root()?,
        &get_shader_spv_root()?,
        input_path,
    )?;

    let output_dir = output_path.parent().context("failed to get parent")?;
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir)?;
    }

    log::info!(
        "compiling shader: {} -> {}",
        input_path.display(),
        output_path.display()
    );
    let output = Command::new("glslc")
        .arg(input_path.as_os_str())
        .arg("--target-env=vulkan1.0")
        .arg("-O")
        .arg("-o")
        .arg(output_path.as_os_str())
        .output()
        .context("failed to run glslc")?;
    std::io::stderr().write_all(&output.stderr)?;
    ensure!(
        output.status.success(),
        "failed to compile shader: {}",
        input_path.display()
    );
    Ok(output_path)
}

pub fn compile_all() -> Result<Vec<PathBuf>> {
    let shader_src_root = get_shader_src_root()?;
    let extensions = SHADER_EXTENSIONS.iter().cloned().collect();
    let target_paths = crate::utils::glob_shader_src(&shader_src_root, &extensions)?;
    target_paths.iter().map(|path| compile(path)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mirrors_source_tree() {
        let output = spv_output_path(
            Path::new("/p/shader/src"),
            Path::new("/p/shader/spv"),
            Path::new("/p/shader/src/deferred/geometry.vert"),
        )
        .unwrap();
        assert_eq!(output, Path::new("/p/shader/spv/deferred/geometry.vert.spv"));
    }

    #[test]
    fn source_outside_root_is_rejected() {
        let output = spv_output_path(
            Path::new("/p/shader/src"),
            Path::new("/p/shader/spv"),
            Path::new("/elsewhere/geometry.vert"),
        );
        assert!(output.is_err());
    }
}
