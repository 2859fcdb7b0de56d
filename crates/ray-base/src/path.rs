use anyhow::{
    Context,
    Result,
};
use git2;
use std::path::{
    Path,
    PathBuf,
};

const WORKSPACE_MARKER: &str = "[workspace]";

/// Root of the checkout. Prefers the git work tree and falls back to the
/// nearest ancestor whose `Cargo.toml` declares the workspace.
pub fn get_project_root() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    if let Ok(repo) = git2::Repository::discover(&current_dir) {
        if let Some(workdir) = repo.workdir() {
            return Ok(workdir.to_path_buf());
        }
    }
    find_workspace_root(&current_dir)
        .with_context(|| format!("no workspace root above {}", current_dir.display()))
}

fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| {
            std::fs::read_to_string(dir.join("Cargo.toml"))
                .map(|manifest| manifest.contains(WORKSPACE_MARKER))
                .unwrap_or(false)
        })
        .map(Path::to_path_buf)
}

pub fn get_shader_root() -> Result<PathBuf> {
    let project_root = get_project_root()?;
    Ok(project_root.join("shader"))
}

pub fn get_shader_src_root() -> Result<PathBuf> {
    let shader_root = get_shader_root()?;
    Ok(shader_root.join("src"))
}

pub fn get_shader_spv_root() -> Result<PathBuf> {
    let shader_root = get_shader_root()?;
    Ok(shader_root.join("spv"))
}

pub fn get_render_config_path() -> Result<PathBuf> {
    let project_root = get_project_root()?;
    Ok(project_root.join("crates/ray-render/configs/render.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_is_found_from_member_dir() {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        let root = find_workspace_root(manifest_dir).unwrap();
        assert!(root.join("crates/ray-base").exists());
    }

    #[test]
    fn shader_roots_are_nested() {
        let src = get_shader_src_root().unwrap();
        let spv = get_shader_spv_root().unwrap();
        assert_eq!(src.parent(), spv.parent());
        assert!(src.ends_with("shader/src"));
    }
}
