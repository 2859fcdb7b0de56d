use anyhow::{
    Context,
    Result,
};
use glob::glob;
use std::{
    collections::HashSet,
    path::{
        Path,
        PathBuf,
    },
};

pub fn glob_shader_src(shader_src_root: &Path, extensions: &HashSet<&str>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob(
        shader_src_root
            .join("**/*")
            .to_str()
            .context("failed to convert to str")?,
    )? {
        let path = entry?;
        if let Some(ext) = path.extension() {
            if extensions.contains(&ext.to_str().context("failed to convert to str")?) {
                paths.push(path);
            }
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listed_stages_are_collected() {
        let root = std::env::temp_dir().join(format!("ray-shader-glob-{}", std::process::id()));
        std::fs::create_dir_all(root.join("deferred")).unwrap();
        for name in ["deferred/a.vert", "deferred/a.frag", "deferred/notes.txt", "b.comp"] {
            std::fs::write(root.join(name), b"").unwrap();
        }

        let extensions = ["vert", "frag"].into_iter().collect();
        let paths = glob_shader_src(&root, &extensions).unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        assert_eq!(
            paths,
            vec![root.join("deferred/a.frag"), root.join("deferred/a.vert")]
        );
    }
}
