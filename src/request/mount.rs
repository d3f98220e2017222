//! Application mount table.

use crate::config::GatewayConfig;

/// Mountpoints owned by applications, used to split PATH_INFO.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mountpoints: Vec<Vec<u8>>,
}

impl MountTable {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.apps.iter().map(|app| app.mountpoint.as_bytes().to_vec()))
    }

    pub fn new(mountpoints: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self {
            mountpoints: mountpoints.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mountpoints.is_empty()
    }

    /// The longest non-empty mountpoint prefixing `path`.
    pub fn longest_match(&self, path: &[u8]) -> Option<&[u8]> {
        self.mountpoints
            .iter()
            .filter(|m| !m.is_empty() && path.starts_with(m))
            .max_by_key(|m| m.len())
            .map(Vec::as_slice)
    }
}
