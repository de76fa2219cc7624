//! Cgroup mounter implementation.

use std::io::BufRead;
use std::path::Path;

use krug_common::{CgroupPaths, KrugError, KrugResult};

use crate::exec::{CommandRunner, ProcessHandle};

use super::proc::{SubsystemGroupings, SubsystemTable};

/// Mounts the cgroup root and one hierarchy per enabled subsystem.
///
/// Runs once during host bring-up, before any container workload exists;
/// everything is sequential and blocking, and a rerun against a fully
/// mounted tree is a no-op.
#[derive(Debug)]
pub struct CgroupMounter<R> {
    paths: CgroupPaths,
    runner: R,
}

impl<R: CommandRunner> CgroupMounter<R> {
    /// Create a mounter over the given cgroup root.
    pub fn new(paths: CgroupPaths, runner: R) -> Self {
        Self { paths, runner }
    }

    /// Ensure a tmpfs root and each enabled subsystem's cgroup mount exist.
    ///
    /// `proc_cgroups` is the kernel subsystem table and `proc_self_cgroup`
    /// the invoking process's own membership; both are consumed exactly once
    /// and dropped on every exit path. Subsystems are mounted in table
    /// order, and the first fatal failure aborts the remaining ones.
    pub fn ensure_mounted(
        &self,
        proc_cgroups: impl BufRead,
        proc_self_cgroup: impl BufRead,
    ) -> KrugResult<()> {
        std::fs::create_dir_all(&self.paths.root).map_err(|source| KrugError::CreateDir {
            path: self.paths.root.clone(),
            source,
        })?;

        if self.is_mount_point(&self.paths.root) {
            tracing::info!(path = %self.paths.root.display(), "cgroup tmpfs already mounted");
        } else {
            self.mount_tmpfs_root();
        }

        let groupings = SubsystemGroupings::parse(proc_self_cgroup)?;

        for entry in SubsystemTable::parse(proc_cgroups)? {
            let entry = entry?;
            if !entry.enabled {
                continue;
            }

            let subsystems = groupings.joint_for(&entry.name);
            self.mount_subsystem(&self.paths.subsystem(&entry.name), subsystems)?;
        }

        Ok(())
    }

    /// Mount-point probe via `mountpoint -q`.
    ///
    /// The trailing separator forces resolution through a possible symlink:
    /// subsystem directories are commonly symlinked to a canonical joint
    /// directory (`cpu` -> `cpu,cpuacct`), and the question is whether the
    /// target is mounted, not the link itself. Any probe failure counts as
    /// "not a mount point".
    fn is_mount_point(&self, path: &Path) -> bool {
        let mut probe = ProcessHandle::new("mountpoint")
            .arg("-q")
            .arg(format!("{}/", path.display()));
        self.runner.run(&mut probe).is_ok()
    }

    /// Best-effort tmpfs on the cgroup root.
    ///
    /// A failure here is logged, not returned: the host's init system may
    /// already provide the cgroup root through another path, in which case
    /// the per-subsystem mounts below still succeed.
    fn mount_tmpfs_root(&self) {
        let root = &self.paths.root;
        tracing::info!(path = %root.display(), "mounting tmpfs on cgroup root");

        let mut mount = ProcessHandle::new("mount")
            .args(["-t", "tmpfs", "-o", "uid=0,gid=0,mode=0755", "cgroup"])
            .arg(root);

        match self.runner.run(&mut mount) {
            Ok(()) => tracing::info!(path = %root.display(), "mounted tmpfs on cgroup root"),
            Err(err) => tracing::error!(path = %root.display(), error = %err, "tmpfs mount failed"),
        }
    }

    /// Mount one subsystem hierarchy, skipping paths that are already
    /// mount points. Failures here are fatal, unlike the tmpfs root.
    fn mount_subsystem(&self, path: &Path, subsystems: &str) -> KrugResult<()> {
        tracing::info!(subsystems, path = %path.display(), "mounting cgroup");

        if self.is_mount_point(path) {
            tracing::info!(subsystems, path = %path.display(), "subsystem already mounted");
        } else {
            std::fs::create_dir_all(path).map_err(|source| KrugError::CreateDir {
                path: path.to_path_buf(),
                source,
            })?;

            let mut mount = ProcessHandle::new("mount")
                .args(["-n", "-t", "cgroup", "-o", subsystems, "cgroup"])
                .arg(path);

            self.runner
                .run(&mut mount)
                .map_err(|source| KrugError::MountSubsystems {
                    subsystems: subsystems.to_string(),
                    path: path.to_path_buf(),
                    source: Box::new(source),
                })?;
        }

        tracing::info!(subsystems, path = %path.display(), "mounted cgroup");
        Ok(())
    }
}
