//! # Krug
//!
//! Krug prepares a container host's cgroup hierarchy: it reads the kernel's
//! subsystem table, mounts a tmpfs root, and mounts every enabled subsystem
//! on the joint hierarchy the host already uses, before any container
//! workload starts.
//!
//! ## Features
//!
//! - **Idempotent bring-up**: paths that are already mount points are left
//!   untouched, so the tool can run on every boot
//! - **Joint hierarchies**: co-mounted subsystems (e.g. `cpu,cpuacct`) are
//!   remounted together, matching the membership of the running process
//! - **Process-group isolation**: external mount helpers run in their own
//!   process group and can be signaled as a unit
//!
//! ## Usage
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use krug::cgroup::CgroupMounter;
//! use krug::exec::LinuxCommandRunner;
//! use krug_common::CgroupPaths;
//!
//! # fn example() -> krug_common::KrugResult<()> {
//! let mounter = CgroupMounter::new(CgroupPaths::new(), LinuxCommandRunner::new());
//! mounter.ensure_mounted(
//!     BufReader::new(File::open("/proc/cgroups")?),
//!     BufReader::new(File::open("/proc/self/cgroup")?),
//! )?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cgroup;
pub mod cli;
pub mod exec;

pub use cgroup::CgroupMounter;
