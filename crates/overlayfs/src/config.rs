//! Startup configuration: where the descriptor lives, which directory is
//! virtualized, and where materialized entries go.

use std::env;
use std::path::{Path, PathBuf};

use diagnostics::log_debug;

use crate::descriptor;
use crate::engine::Overlay;
use crate::error::Error;
use crate::host::RealFs;
use crate::path::join;

/// Environment variable holding the vfs root
pub const ROOT_ENV: &str = "OVERLAYFS_ROOT";
/// Environment variable holding the scope root
pub const SCOPE_ENV: &str = "OVERLAYFS_SCOPE";

/// Descriptor file name inside the vfs root
pub const DESCRIPTOR_FILE: &str = "vfs.json";
/// Scratch directory name inside the vfs root
pub const SCRATCH_DIR: &str = "__temp__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    #[error("Cannot read descriptor {}: {source}", path.display())]
    ReadDescriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Overlay initialization failed: {0}")]
    Init(#[from] Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    pub descriptor: PathBuf,
    pub scope_root: String,
    pub scratch_root: String,
}

impl OverlayConfig {
    /// Standard layout: `<vfs_root>\vfs.json` and `<vfs_root>\__temp__`
    pub fn from_vfs_root<P: AsRef<Path>>(vfs_root: P, scope_root: &str) -> Self {
        let vfs_root = vfs_root.as_ref();
        Self {
            descriptor: vfs_root.join(DESCRIPTOR_FILE),
            scope_root: scope_root.to_string(),
            scratch_root: join(&vfs_root.to_string_lossy(), SCRATCH_DIR),
        }
    }

    /// Reads `OVERLAYFS_ROOT` and `OVERLAYFS_SCOPE`
    pub fn from_env() -> Result<Self, ConfigError> {
        let vfs_root = env::var(ROOT_ENV).map_err(|_| ConfigError::MissingEnv(ROOT_ENV))?;
        let scope_root = env::var(SCOPE_ENV).map_err(|_| ConfigError::MissingEnv(SCOPE_ENV))?;
        Ok(Self::from_vfs_root(vfs_root, &scope_root))
    }

    /// Reads and decodes the descriptor file
    pub fn load_descriptor(&self) -> Result<String, ConfigError> {
        log_debug!(
            "Reading descriptor {path}",
            path: self.descriptor.to_string_lossy().as_ref()
        );
        let bytes = std::fs::read(&self.descriptor).map_err(|source| ConfigError::ReadDescriptor {
            path: self.descriptor.clone(),
            source,
        })?;
        Ok(descriptor::decode(&bytes))
    }
}

impl<R: RealFs> Overlay<R> {
    /// Loads the configured descriptor and initializes the engine
    pub fn from_config(real: R, config: &OverlayConfig) -> Result<Self, ConfigError> {
        let text = config.load_descriptor()?;
        Ok(Overlay::new(
            real,
            &config.scope_root,
            &config.scratch_root,
            &text,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFs;

    #[test]
    fn test_from_vfs_root_layout() {
        let config = OverlayConfig::from_vfs_root("D:\\vfs", "C:\\Game");
        assert_eq!(config.descriptor, Path::new("D:\\vfs").join("vfs.json"));
        assert_eq!(config.scratch_root, "D:\\vfs\\__temp__");
        assert_eq!(config.scope_root, "C:\\Game");
    }

    #[test]
    fn test_missing_descriptor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = OverlayConfig::from_vfs_root(dir.path(), "C:\\Game");
        let err = config.load_descriptor().expect_err("no descriptor");
        assert!(matches!(err, ConfigError::ReadDescriptor { .. }));
    }

    #[test]
    fn test_from_config_loads_descriptor() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(DESCRIPTOR_FILE),
            b"\xEF\xBB\xBF{\"winhttp.dll\":\"D:\\\\mods\\\\winhttp.dll\"}",
        )
        .expect("write descriptor");

        let mut config = OverlayConfig::from_vfs_root(dir.path(), "C:\\Game");
        config.scratch_root = "D:\\vfs\\__temp__".to_string();

        let overlay = Overlay::from_config(MemoryFs::new("C:\\Game"), &config).expect("overlay");
        assert!(overlay.descriptor_report().is_complete());
        let file = overlay.lookup("WINHTTP.DLL").expect("file");
        assert_eq!(file.backing_path.as_deref(), Some("D:\\mods\\winhttp.dll"));
        assert!(overlay.real().is_dir("D:\\vfs\\__temp__"));
    }
}
