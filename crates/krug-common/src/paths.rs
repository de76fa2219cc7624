//! Standard filesystem paths for cgroup bring-up.

use std::path::PathBuf;

use once_cell::sync::Lazy;

/// Default root under which the cgroup hierarchy is mounted.
pub static CGROUP_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("KRUG_CGROUP_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/sys/fs/cgroup"))
});

/// Kernel subsystem table.
pub const PROC_CGROUPS: &str = "/proc/cgroups";

/// Cgroup membership file of the invoking process.
pub const PROC_SELF_CGROUP: &str = "/proc/self/cgroup";

/// Paths used while bringing up the cgroup hierarchy.
#[derive(Debug, Clone)]
pub struct CgroupPaths {
    /// Root under which per-subsystem mount points live (default: /sys/fs/cgroup).
    pub root: PathBuf,
}

impl CgroupPaths {
    /// Create paths with the default root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Mount point for a single subsystem.
    #[must_use]
    pub fn subsystem(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Default for CgroupPaths {
    fn default() -> Self {
        Self {
            root: CGROUP_ROOT.clone(),
        }
    }
}
