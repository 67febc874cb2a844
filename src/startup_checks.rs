//! Startup checks for Hyphae
//! Locates the resource directory image paths are resolved against

use std::env;
use std::path::{Path, PathBuf};

use crate::constants::resources::{DATA_DIR_NAME, RESOURCE_DIR_ENV};

/// Pick the resource directory
///
/// Order: configured path, `HYPHAE_RESOURCE_DIR`, the platform data directory
/// (if it exists), then the working directory.
pub fn resolve_resource_dir(configured: Option<&Path>) -> PathBuf {
    let from_env = env::var_os(RESOURCE_DIR_ENV).map(PathBuf::from);
    resolve_from(configured, from_env, dirs::data_dir())
}

fn resolve_from(configured: Option<&Path>, from_env: Option<PathBuf>, data_dir: Option<PathBuf>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return path;
    }
    if let Some(path) = data_dir.map(|d| d.join(DATA_DIR_NAME)).filter(|p| p.is_dir()) {
        return path;
    }
    PathBuf::from(".")
}

/// Log where resources will be loaded from and whether the directory exists
pub fn check_resource_dir(dir: &Path) -> bool {
    if dir.is_dir() {
        log::info!("Resource directory: {}", dir.display());
        true
    } else {
        log::warn!("Resource directory {} does not exist; image nodes will fall back to shapes", dir.display());
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_wins() {
        let dir = resolve_from(
            Some(Path::new("/opt/images")),
            Some(PathBuf::from("/env/images")),
            None,
        );
        assert_eq!(dir, PathBuf::from("/opt/images"));
    }

    #[test]
    fn test_env_before_data_dir() {
        let dir = resolve_from(None, Some(PathBuf::from("/env/images")), Some(PathBuf::from("/")));
        assert_eq!(dir, PathBuf::from("/env/images"));
    }

    #[test]
    fn test_missing_data_dir_falls_back_to_cwd() {
        let dir = resolve_from(None, None, Some(PathBuf::from("/definitely/not/here")));
        assert_eq!(dir, PathBuf::from("."));
        assert!(check_resource_dir(&dir));
    }
}
