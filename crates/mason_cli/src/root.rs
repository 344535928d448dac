//! Locating the project directory.

use std::path::{Path, PathBuf};

use mason_project::PROJECT_FILE_NAME;

use crate::GlobalArgs;

/// Walks up from `start` to the first directory containing `project.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(PROJECT_FILE_NAME).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {PROJECT_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project directory from global CLI args.
///
/// `--project` may name the directory or the `project.toml` inside it.
/// Without it, the current directory and its ancestors are searched.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match global.project {
        Some(ref project) => {
            let p = PathBuf::from(project);
            if p.is_file() {
                Ok(p.parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")))
            } else {
                Ok(p)
            }
        }
        None => find_project_root(&std::env::current_dir()?),
    }
}
