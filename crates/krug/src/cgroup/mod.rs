//! Cgroup hierarchy bring-up.
//!
//! This module ensures the legacy (per-subsystem) cgroup tree is mounted the
//! way the kernel and the running host expect:
//! - a tmpfs root under which the mount points live
//! - one cgroup mount per enabled subsystem, in kernel table order
//! - co-mounted subsystems kept together on their joint hierarchy

mod mounter;
pub mod proc;

pub use mounter::CgroupMounter;
pub use proc::{SubsystemEntry, SubsystemGroupings, SubsystemTable};
