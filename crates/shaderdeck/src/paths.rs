use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "SHADERDECK_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "SHADERDECK_DATA_DIR";

/// Where shaderdeck keeps its settings, saved projects and exports.
///
/// Each root comes from the platform's user directories unless the matching
/// environment variable names a non-empty path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let dirs = ProjectDirs::from("org", "Shaderdeck", "shaderdeck")
            .ok_or_else(|| anyhow!("no home directory; set {ENV_CONFIG_DIR} and {ENV_DATA_DIR}"))?;
        Ok(Self::new(
            env_override(ENV_CONFIG_DIR).unwrap_or_else(|| dirs.config_dir().to_path_buf()),
            env_override(ENV_DATA_DIR).unwrap_or_else(|| dirs.data_dir().to_path_buf()),
        ))
    }

    pub fn new(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default location for `init` when no path is given.
    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match self.previous.take() {
                Some(value) => env::set_var(self.key, value),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn env_overrides_take_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let data_dir = root.path().join("data");
        let _config = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _data = EnvGuard::set(ENV_DATA_DIR, &data_dir);

        let paths = AppPaths::discover().unwrap();

        assert_eq!(paths, AppPaths::new(config_dir.clone(), data_dir.clone()));
        assert_eq!(paths.config_file(), config_dir.join("config.toml"));
        assert_eq!(paths.projects_dir(), data_dir.join("projects"));
        assert_eq!(paths.exports_dir(), data_dir.join("exports"));
    }

    #[test]
    fn empty_override_is_ignored() {
        let _guard = env_lock().lock().unwrap();
        let _config = EnvGuard::set(ENV_CONFIG_DIR, Path::new(""));
        assert!(env_override(ENV_CONFIG_DIR).is_none());
    }
}
