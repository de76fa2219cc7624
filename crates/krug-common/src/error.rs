//! Common error types for the Krug tools.

use std::path::PathBuf;
use std::process::ExitStatus;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`KrugError`].
pub type KrugResult<T> = Result<T, KrugError>;

/// Common errors across the Krug crates.
#[derive(Error, Diagnostic, Debug)]
pub enum KrugError {
    /// The kernel subsystem table did not match the expected layout.
    #[error("unknown /proc/cgroups format: {content}")]
    #[diagnostic(
        code(krug::cgroups::format),
        help("expected the `#subsys_name hierarchy num_cgroups enabled` table layout")
    )]
    CgroupsFormat {
        /// The offending raw line, or `(empty)` when the stream had no lines.
        content: String,
    },

    /// A cgroup directory could not be created.
    #[error("mkdir '{path}': {source}")]
    #[diagnostic(code(krug::cgroups::mkdir))]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying filesystem error.
        #[source]
        source: std::io::Error,
    },

    /// A per-subsystem cgroup mount failed.
    #[error("mounting subsystems '{subsystems}' in '{path}': {source}")]
    #[diagnostic(
        code(krug::cgroups::mount),
        help("containers cannot be created for this controller until the mount succeeds")
    )]
    MountSubsystems {
        /// The comma-joined subsystem option string that was mounted.
        subsystems: String,
        /// The mount target path.
        path: PathBuf,
        /// The underlying command failure.
        #[source]
        source: Box<KrugError>,
    },

    /// An external command could not be spawned.
    #[error("spawning command '{command}': {source}")]
    #[diagnostic(code(krug::exec::spawn))]
    Spawn {
        /// The rendered command line.
        command: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// An external command exited with a non-zero status.
    #[error("command '{command}' failed: {status}")]
    #[diagnostic(code(krug::exec::failed))]
    CommandFailed {
        /// The rendered command line.
        command: String,
        /// The exit status the command finished with.
        status: ExitStatus,
    },

    /// A wait, kill, or signal was issued against a handle with no live process.
    #[error("command is not running: {command}")]
    #[diagnostic(
        code(krug::exec::not_running),
        help("the command was never started, or its exit status was already collected")
    )]
    CommandNotRunning {
        /// The rendered command line.
        command: String,
    },

    /// A run or start was issued against a handle that is still running.
    #[error("command is already started: {command}")]
    #[diagnostic(code(krug::exec::already_started))]
    CommandAlreadyStarted {
        /// The rendered command line.
        command: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(krug::io))]
    Io(#[from] std::io::Error),
}
