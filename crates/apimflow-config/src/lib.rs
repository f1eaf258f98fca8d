pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

const MANIFEST_CANDIDATES: [&str; 4] = [
    "apim.local.yaml",
    ".apim.local.yaml",
    "apim.yaml",
    ".apim.yaml",
];

/// Locate the project manifest
///
/// Search order:
/// 1. `APIM_MANIFEST_PATH`
/// 2. current directory: apim.local.yaml, .apim.local.yaml, apim.yaml, .apim.yaml
/// 3. the same names inside `./.apimflow/`
/// 4. `~/.config/apimflow/apim.yaml`
pub fn find_manifest_file() -> Result<PathBuf> {
    if let Ok(manifest_path) = std::env::var("APIM_MANIFEST_PATH") {
        let path = PathBuf::from(manifest_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    if let Some(path) = find_in(&current_dir) {
        return Ok(path);
    }

    let project_dir = current_dir.join(".apimflow");
    if project_dir.is_dir() {
        if let Some(path) = find_in(&project_dir) {
            return Ok(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("apimflow").join("apim.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ManifestNotFound)
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    MANIFEST_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Project root for a manifest: the directory holding it, or the parent of
/// `.apimflow/` when the manifest lives there
pub fn project_root(manifest: &Path) -> PathBuf {
    let dir = manifest.parent().unwrap_or_else(|| Path::new("."));
    if dir.file_name().is_some_and(|name| name == ".apimflow") {
        dir.parent().unwrap_or(dir).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_manifest_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("apim.yaml"), "# test").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_manifest_file();

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with("apim.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_manifest_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("apim.yaml"), "# shared").unwrap();
        fs::write(temp_dir.path().join("apim.local.yaml"), "# local").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_manifest_file();

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with("apim.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_manifest_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let project_dir = temp_dir.path().join(".apimflow");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("apim.yaml"), "# in project dir").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_manifest_file();

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with(".apimflow/apim.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_manifest_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let manifest = temp_dir.path().join("custom.yaml");
        fs::write(&manifest, "# custom").unwrap();

        unsafe {
            std::env::set_var("APIM_MANIFEST_PATH", manifest.to_str().unwrap());
        }

        let result = find_manifest_file();

        unsafe {
            std::env::remove_var("APIM_MANIFEST_PATH");
        }
        assert_eq!(result.unwrap(), manifest);
    }

    #[test]
    fn test_project_root() {
        assert_eq!(
            project_root(Path::new("/work/app/apim.yaml")),
            PathBuf::from("/work/app")
        );
        assert_eq!(
            project_root(Path::new("/work/app/.apimflow/apim.yaml")),
            PathBuf::from("/work/app")
        );
    }
}
