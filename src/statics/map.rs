//! Compiled static roots and mountpoint maps.

use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::config::{GatewayConfig, StaticMapConfig};

/// A directory files may be served from.
#[derive(Debug, Clone)]
pub struct StaticRoot {
    /// Canonical absolute path, used for resolution and containment.
    pub document_root: PathBuf,
    /// The root as configured, echoed in X-Accel-Redirect / X-Sendfile headers.
    pub orig_document_root: Vec<u8>,
}

impl StaticRoot {
    /// Canonicalizes `configured`. Returns `None` (logged) when the directory
    /// cannot be resolved, so a missing root disables only its own entry.
    pub fn compile(configured: &str) -> Option<Self> {
        match std::fs::canonicalize(configured) {
            Ok(document_root) => Some(Self {
                document_root,
                orig_document_root: configured.as_bytes().to_vec(),
            }),
            Err(e) => {
                tracing::warn!(root = %configured, error = %e, "unable to resolve static document root, skipping");
                None
            }
        }
    }

    pub fn document_root(&self) -> &Path {
        &self.document_root
    }

    /// Canonical root as raw bytes.
    pub fn document_root_bytes(&self) -> &[u8] {
        self.document_root.as_os_str().as_bytes()
    }
}

/// One mountpoint → document root mapping.
#[derive(Debug, Clone)]
pub struct StaticMap {
    pub mountpoint: Vec<u8>,
    pub root: StaticRoot,
}

impl StaticMap {
    /// The part of `path_info` below the mountpoint, if it matches.
    pub fn strip<'p>(&self, path_info: &'p [u8]) -> Option<&'p [u8]> {
        path_info.strip_prefix(self.mountpoint.as_slice())
    }
}

/// Ordered static maps plus the optional check-static root.
#[derive(Debug, Clone, Default)]
pub struct StaticMapTable {
    check_static: Option<StaticRoot>,
    maps: Vec<StaticMap>,
}

impl StaticMapTable {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let check_static = config
            .static_files
            .check_static
            .as_deref()
            .and_then(StaticRoot::compile);
        let maps = Self::compile_maps(&config.static_files.static_maps);

        tracing::debug!(
            check_static = check_static.is_some(),
            maps = maps.len(),
            "static file table built"
        );

        Self { check_static, maps }
    }

    fn compile_maps(entries: &[StaticMapConfig]) -> Vec<StaticMap> {
        entries
            .iter()
            .filter_map(|entry| {
                StaticRoot::compile(&entry.document_root).map(|root| StaticMap {
                    mountpoint: entry.mountpoint.as_bytes().to_vec(),
                    root,
                })
            })
            .collect()
    }

    pub fn check_static(&self) -> Option<&StaticRoot> {
        self.check_static.as_ref()
    }

    pub fn maps(&self) -> &[StaticMap] {
        &self.maps
    }

    pub fn is_empty(&self) -> bool {
        self.check_static.is_none() && self.maps.is_empty()
    }

    /// Maps whose mountpoint prefixes `path_info`, in registration order,
    /// each paired with the remaining path.
    pub fn matching<'a>(
        &'a self,
        path_info: &'a [u8],
    ) -> impl Iterator<Item = (&'a StaticMap, &'a [u8])> + 'a {
        self.maps
            .iter()
            .filter_map(move |map| map.strip(path_info).map(|rest| (map, rest)))
    }
}
