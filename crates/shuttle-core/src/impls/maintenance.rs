//! FileMaintenanceMode - マーカーファイルによるメンテナンスモード

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::ports::MaintenanceMode;

/// Maintenance mode is on while the marker file exists.
#[derive(Debug, Clone)]
pub struct FileMaintenanceMode {
    marker: PathBuf,
}

impl FileMaintenanceMode {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Enter maintenance mode.
    pub fn down(&self) -> std::io::Result<()> {
        if let Some(parent) = self.marker.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.marker, format!("{}\n", chrono::Utc::now().to_rfc3339()))
    }

    /// Leave maintenance mode. Leaving when not down is not an error.
    pub fn up(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.marker) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl MaintenanceMode for FileMaintenanceMode {
    fn is_down(&self) -> bool {
        self.marker.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_and_up_toggle_the_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mode = FileMaintenanceMode::new(dir.path().join("down"));
        assert!(!mode.is_down());

        mode.down().unwrap();
        assert!(mode.is_down());

        mode.up().unwrap();
        assert!(!mode.is_down());
        mode.up().unwrap();
    }
}
