//! Process collaborators: detached spawning and liveness probing.

use std::io;
use std::process::{Command, Stdio};

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

/// Liveness classification for a tracked pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// No such process. Inherently ambiguous between "finished and reaped"
    /// and "never existed"; the exit status cannot be recovered here.
    NotFound,
    /// Running, sleeping, or idle.
    Active,
    /// Exists but is no longer progressing (zombie, stopped, dead).
    Terminated,
}

impl ProcessState {
    /// Whether the backing process should be treated as finished for
    /// scheduling purposes.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::NotFound | Self::Terminated)
    }
}

/// Starts board commands as detached processes.
pub trait JobSpawner: Send + Sync {
    /// Spawn `command` detached from the caller and return its pid. The
    /// child must outlive the scheduler process; it is never waited on.
    fn spawn_detached(&self, command: &str) -> io::Result<u32>;
}

/// Runs commands through `sh -c` with all stdio detached.
#[derive(Debug, Default, Clone)]
pub struct ShellSpawner;

impl JobSpawner for ShellSpawner {
    fn spawn_detached(&self, command: &str) -> io::Result<u32> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // Dropping the handle leaves the child running. It is never
        // wait()ed on here; completion is observed by the process probe.
        Ok(child.id())
    }
}

/// Resolves a pid's liveness state.
pub trait ProcessProbe: Send + Sync {
    fn probe(&self, pid: u32) -> ProcessState;
}

/// Probe backed by the live process table.
#[derive(Debug, Default, Clone)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    fn probe(&self, pid: u32) -> ProcessState {
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        // Keep dead entries so an exited-but-unreaped child still shows up
        // as a zombie rather than vanishing.
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing(),
        );

        match system.process(pid) {
            None => ProcessState::NotFound,
            Some(process) => match process.status() {
                ProcessStatus::Run | ProcessStatus::Sleep | ProcessStatus::Idle => {
                    ProcessState::Active
                }
                _ => ProcessState::Terminated,
            },
        }
    }
}
