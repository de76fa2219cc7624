//! External command execution with process-group isolation.
//!
//! Every command is launched into its own process group, so a caller that
//! supervises a helper can later signal the helper and everything it spawned
//! as a single unit.

#![allow(unsafe_code)]

use std::ffi::OsStr;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus};

use krug_common::{KrugError, KrugResult};

/// Lifecycle of the OS process behind a [`ProcessHandle`].
#[derive(Debug)]
enum ProcessState {
    /// Not yet launched.
    NotStarted,
    /// Spawned; exit status not yet collected.
    Running(Child),
    /// Exited and collected.
    Exited(ExitStatus),
}

/// An external command plus the OS process it may be running as.
///
/// A handle moves through *not-started -> running -> exited*. Signal delivery
/// is only valid while a live pid exists; afterwards (or before launch) it
/// fails with [`KrugError::CommandNotRunning`].
#[derive(Debug)]
pub struct ProcessHandle {
    command: Command,
    state: ProcessState,
}

impl ProcessHandle {
    /// Wrap a command without launching it.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            command: Command::new(program),
            state: ProcessState::NotStarted,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.command.arg(arg);
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    /// The program and arguments rendered as one line, for logs and errors.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.get_program())
            .chain(self.command.get_args())
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Pid of the live process, if one exists.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            ProcessState::Running(child) => Some(child.id()),
            ProcessState::NotStarted | ProcessState::Exited(_) => None,
        }
    }
}

/// Executes external commands on behalf of the mounting flow.
///
/// This is the seam that keeps the orchestration testable: a recording
/// stand-in can answer mount-point probes and mount invocations without
/// touching real mount state or requiring root.
pub trait CommandRunner {
    /// Run the command to completion in its own process group.
    ///
    /// A non-zero exit status is an error.
    fn run(&self, process: &mut ProcessHandle) -> KrugResult<()>;

    /// Launch the command in its own process group without waiting.
    fn start(&self, process: &mut ProcessHandle) -> KrugResult<()>;

    /// Alias for [`CommandRunner::start`], kept for callers that phrase
    /// long-lived helper supervision that way.
    fn background(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        self.start(process)
    }

    /// Block until a running command exits and collect its status.
    ///
    /// A non-zero exit status is an error.
    fn wait(&self, process: &mut ProcessHandle) -> KrugResult<()>;

    /// Deliver SIGKILL to the live process.
    fn kill(&self, process: &mut ProcessHandle) -> KrugResult<()>;

    /// Deliver an arbitrary signal to the live process.
    fn signal(&self, process: &mut ProcessHandle, signal: i32) -> KrugResult<()>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        (**self).run(process)
    }

    fn start(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        (**self).start(process)
    }

    fn background(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        (**self).background(process)
    }

    fn wait(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        (**self).wait(process)
    }

    fn kill(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        (**self).kill(process)
    }

    fn signal(&self, process: &mut ProcessHandle, signal: i32) -> KrugResult<()> {
        (**self).signal(process, signal)
    }
}

/// Real command runner backed by `std::process` and raw signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxCommandRunner;

impl LinuxCommandRunner {
    /// Create a runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for LinuxCommandRunner {
    fn run(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        self.start(process)?;
        self.wait(process)
    }

    fn start(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        if matches!(process.state, ProcessState::Running(_)) {
            return Err(KrugError::CommandAlreadyStarted {
                command: process.command_line(),
            });
        }

        // pgid 0 makes the child the leader of a fresh process group.
        let child = process
            .command
            .process_group(0)
            .spawn()
            .map_err(|source| KrugError::Spawn {
                command: process.command_line(),
                source,
            })?;

        tracing::debug!(command = %process.command_line(), pid = child.id(), "spawned command");
        process.state = ProcessState::Running(child);
        Ok(())
    }

    fn wait(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        let ProcessState::Running(child) = &mut process.state else {
            return Err(KrugError::CommandNotRunning {
                command: process.command_line(),
            });
        };

        let status = child.wait()?;
        process.state = ProcessState::Exited(status);

        if status.success() {
            Ok(())
        } else {
            Err(KrugError::CommandFailed {
                command: process.command_line(),
                status,
            })
        }
    }

    fn kill(&self, process: &mut ProcessHandle) -> KrugResult<()> {
        self.signal(process, libc::SIGKILL)
    }

    fn signal(&self, process: &mut ProcessHandle, signal: i32) -> KrugResult<()> {
        let Some(pid) = process.pid() else {
            return Err(KrugError::CommandNotRunning {
                command: process.command_line(),
            });
        };

        let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
        if rc != 0 {
            return Err(KrugError::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_before_start_is_not_running() {
        let runner = LinuxCommandRunner::new();
        let mut sleep = ProcessHandle::new("sleep").arg("30");

        let err = runner.kill(&mut sleep).unwrap_err();
        assert!(matches!(err, KrugError::CommandNotRunning { .. }));
    }

    #[test]
    fn signal_before_start_is_not_running() {
        let runner = LinuxCommandRunner::new();
        let mut sleep = ProcessHandle::new("sleep").arg("30");

        let err = runner.signal(&mut sleep, libc::SIGTERM).unwrap_err();
        assert!(matches!(err, KrugError::CommandNotRunning { .. }));
    }

    #[test]
    fn wait_before_start_is_not_running() {
        let runner = LinuxCommandRunner::new();
        let mut sleep = ProcessHandle::new("sleep").arg("30");

        let err = runner.wait(&mut sleep).unwrap_err();
        assert!(matches!(err, KrugError::CommandNotRunning { .. }));
    }

    #[test]
    fn run_reports_exit_status() {
        let runner = LinuxCommandRunner::new();

        let mut succeeding = ProcessHandle::new("true");
        runner.run(&mut succeeding).unwrap();

        let mut failing = ProcessHandle::new("false");
        let err = runner.run(&mut failing).unwrap_err();
        assert!(matches!(err, KrugError::CommandFailed { .. }));
    }

    #[test]
    fn start_twice_is_rejected() {
        let runner = LinuxCommandRunner::new();
        let mut sleep = ProcessHandle::new("sleep").arg("30");

        runner.start(&mut sleep).unwrap();
        let err = runner.start(&mut sleep).unwrap_err();
        assert!(matches!(err, KrugError::CommandAlreadyStarted { .. }));

        runner.kill(&mut sleep).unwrap();
        // Killed, so the collected status is a failure.
        let err = runner.wait(&mut sleep).unwrap_err();
        assert!(matches!(err, KrugError::CommandFailed { .. }));
    }

    #[test]
    fn signal_after_collection_is_not_running() {
        let runner = LinuxCommandRunner::new();
        let mut finished = ProcessHandle::new("true");

        runner.run(&mut finished).unwrap();
        let err = runner.signal(&mut finished, libc::SIGTERM).unwrap_err();
        assert!(matches!(err, KrugError::CommandNotRunning { .. }));
    }

    #[test]
    fn background_launches_without_waiting() {
        let runner = LinuxCommandRunner::new();
        let mut sleep = ProcessHandle::new("sleep").arg("30");

        runner.background(&mut sleep).unwrap();
        assert!(sleep.pid().is_some());

        runner.kill(&mut sleep).unwrap();
        let _ = runner.wait(&mut sleep);
        assert!(sleep.pid().is_none());
    }

    #[test]
    fn command_line_renders_program_and_args() {
        let mount = ProcessHandle::new("mount").args(["-n", "-t", "cgroup"]);
        assert_eq!(mount.command_line(), "mount -n -t cgroup");
    }
}
