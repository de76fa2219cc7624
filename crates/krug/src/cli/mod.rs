//! CLI definition and wiring for the one-shot bring-up run.
//!
//! The command line only decides where the inputs come from; every mount
//! decision lives in [`crate::cgroup`].

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};

use krug_common::CgroupPaths;
use krug_common::paths::{PROC_CGROUPS, PROC_SELF_CGROUP};

use crate::cgroup::CgroupMounter;
use crate::exec::LinuxCommandRunner;

/// Krug - cgroup bring-up for container hosts
#[derive(Parser)]
#[command(name = "krug")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root under which the cgroup hierarchy is mounted
    #[arg(long, env = "KRUG_CGROUP_ROOT", default_value = "/sys/fs/cgroup")]
    pub root: PathBuf,

    /// Kernel subsystem table to read
    #[arg(long, default_value = PROC_CGROUPS)]
    pub proc_cgroups: PathBuf,

    /// Cgroup membership file of this process
    #[arg(long, default_value = PROC_SELF_CGROUP)]
    pub proc_self_cgroup: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Run the bring-up against the configured inputs.
    pub fn execute(&self) -> Result<()> {
        let proc_cgroups = File::open(&self.proc_cgroups)
            .wrap_err_with(|| format!("opening {}", self.proc_cgroups.display()))?;
        let proc_self_cgroup = File::open(&self.proc_self_cgroup)
            .wrap_err_with(|| format!("opening {}", self.proc_self_cgroup.display()))?;

        let mounter = CgroupMounter::new(
            CgroupPaths::with_root(self.root.clone()),
            LinuxCommandRunner::new(),
        );
        mounter.ensure_mounted(
            BufReader::new(proc_cgroups),
            BufReader::new(proc_self_cgroup),
        )?;
        Ok(())
    }
}
