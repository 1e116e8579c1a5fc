// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single child process and its resource envelope.

use super::cgroup::CgroupGuard;
use super::{HandleTable, ProcessError, Signal};
use parking_lot::Mutex;
use skylark_core::clock::TimerGuard;
use skylark_core::{Clock, ResourceLimits};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Running,
    Finished,
}

#[derive(Default)]
struct StdioSpec {
    stdin_data: Option<Vec<u8>>,
    capture_stdout: bool,
    capture_stderr: bool,
    env: Option<Vec<(String, String)>>,
    current_dir: Option<PathBuf>,
}

struct RunningIo {
    stdout_task: Option<tokio::task::JoinHandle<Vec<u8>>>,
    stderr_task: Option<tokio::task::JoinHandle<Vec<u8>>>,
}

/// Handle to one child process.
///
/// Created by [`super::ProcessManager::new_handle`]; see the module docs
/// for the state machine.
pub struct ProcessHandle<C: Clock> {
    name: String,
    argv: Vec<String>,
    clock: C,
    table: Weak<HandleTable<C>>,
    self_weak: Weak<Self>,
    limits: Mutex<ResourceLimits>,
    state: Mutex<State>,
    stdio: Mutex<StdioSpec>,
    child: tokio::sync::Mutex<Option<(Child, RunningIo)>>,
    pid: AtomicU32,
    cpu_killed: Arc<AtomicBool>,
    cpu_guard: Mutex<Option<TimerGuard>>,
    cgroup: Mutex<Option<CgroupGuard>>,
    unsupported: Mutex<Vec<&'static str>>,
    exit_code: Mutex<Option<i32>>,
    stdout_bytes: Mutex<Vec<u8>>,
    stderr_bytes: Mutex<Vec<u8>>,
}

impl<C: Clock> std::fmt::Debug for ProcessHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("name", &self.name)
            .field("pid", &self.pid.load(Ordering::Relaxed))
            .finish()
    }
}

impl<C: Clock> ProcessHandle<C> {
    pub(super) fn new(
        name: String,
        argv: Vec<String>,
        limits: ResourceLimits,
        clock: C,
        table: Weak<HandleTable<C>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            name,
            argv,
            clock,
            table,
            self_weak: self_weak.clone(),
            limits: Mutex::new(limits),
            state: Mutex::new(State::Created),
            stdio: Mutex::new(StdioSpec::default()),
            child: tokio::sync::Mutex::new(None),
            pid: AtomicU32::new(0),
            cpu_killed: Arc::new(AtomicBool::new(false)),
            cpu_guard: Mutex::new(None),
            cgroup: Mutex::new(None),
            unsupported: Mutex::new(Vec::new()),
            exit_code: Mutex::new(None),
            stdout_bytes: Mutex::new(Vec::new()),
            stderr_bytes: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process ID, once started.
    pub fn id(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    pub fn running(&self) -> bool {
        *self.state.lock() == State::Running
    }

    /// Exit code after `wait`; `-1` when the child died by signal.
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_code.lock()
    }

    /// Limit dimensions the kernel refused at `start`. The process runs
    /// without those ceilings.
    pub fn unsupported_limits(&self) -> Vec<&'static str> {
        self.unsupported.lock().clone()
    }

    pub fn limits(&self) -> ResourceLimits {
        *self.limits.lock()
    }

    /// Replace the limits. Fails once the process is running.
    pub fn set_limits(&self, limits: ResourceLimits) -> Result<(), ProcessError> {
        if *self.state.lock() != State::Created {
            return Err(ProcessError::InvalidLimits);
        }
        *self.limits.lock() = limits;
        Ok(())
    }

    /// Bytes written to the child's stdin after start; stdin is closed
    /// once they are flushed.
    pub fn set_stdin(&self, data: Vec<u8>) {
        self.stdio.lock().stdin_data = Some(data);
    }

    /// Collect the child's stdout; read it with [`Self::stdout_bytes`]
    /// after `wait`.
    pub fn set_capture_stdout(&self, capture: bool) {
        self.stdio.lock().capture_stdout = capture;
    }

    pub fn set_capture_stderr(&self, capture: bool) {
        self.stdio.lock().capture_stderr = capture;
    }

    /// Replace the child's environment entirely (PATH must be included by
    /// the caller if wanted).
    pub fn set_env(&self, env: Vec<(String, String)>) {
        self.stdio.lock().env = Some(env);
    }

    pub fn set_current_dir(&self, dir: PathBuf) {
        self.stdio.lock().current_dir = Some(dir);
    }

    pub fn stdout_bytes(&self) -> Vec<u8> {
        self.stdout_bytes.lock().clone()
    }

    pub fn stderr_bytes(&self) -> Vec<u8> {
        self.stderr_bytes.lock().clone()
    }

    /// Spawn the child and apply the resource envelope.
    ///
    /// Descriptor, subprocess, and file-size ceilings are applied inside
    /// the child via rlimits; a kernel that rejects one leaves the child
    /// running without it. The memory ceiling requires Linux cgroups;
    /// elsewhere a non-zero memory limit refuses to start. The CPU budget
    /// arms a kill timer on the [`Clock`].
    pub async fn start(&self) -> Result<(), ProcessError> {
        {
            let mut state = self.state.lock();
            match *state {
                State::Created => {}
                _ => return Err(ProcessError::AlreadyStarted),
            }
            // Reserve the slot so a concurrent start cannot double-spawn.
            *state = State::Running;
        }
        let limits = *self.limits.lock();

        if limits.max_memory_mb > 0 && !cfg!(target_os = "linux") {
            *self.state.lock() = State::Created;
            return Err(ProcessError::MemoryUnsupported);
        }

        // Report ceilings the kernel will refuse; the process starts
        // without them.
        let rejected = rejected_limit_dims(&limits);
        for dim in &rejected {
            tracing::warn!(name = %self.name, "unsupported: {}", dim);
        }
        *self.unsupported.lock() = rejected;

        let mut cmd = match self.build_command(&limits) {
            Ok(cmd) => cmd,
            Err(e) => {
                *self.state.lock() = State::Created;
                return Err(e);
            }
        };
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                *self.state.lock() = State::Created;
                return Err(ProcessError::SpawnFailed {
                    name: self.name.clone(),
                    source,
                });
            }
        };
        let pid = child.id().unwrap_or(0);
        self.pid.store(pid, Ordering::SeqCst);

        let io = self.attach_io(&mut child);

        if limits.max_memory_mb > 0 {
            match CgroupGuard::create(pid, limits.max_memory_mb) {
                Ok(guard) => *self.cgroup.lock() = Some(guard),
                Err(e) => {
                    tracing::warn!(
                        name = %self.name,
                        pid,
                        error = %e,
                        "memory cgroup unavailable, continuing without memory limit"
                    );
                }
            }
        }

        if !limits.max_cpu_time.is_zero() {
            let killed = Arc::clone(&self.cpu_killed);
            let name = self.name.clone();
            let guard = self.clock.after_func(
                limits.max_cpu_time,
                Box::new(move || {
                    killed.store(true, Ordering::SeqCst);
                    tracing::warn!(%name, pid, "CPU time limit expired, killing process");
                    kill_pid(pid, Signal::Kill);
                }),
            );
            *self.cpu_guard.lock() = Some(guard);
        }

        *self.child.lock().await = Some((child, io));
        if let (Some(table), Some(me)) = (self.table.upgrade(), self.self_weak.upgrade()) {
            table.lock().insert(pid, me);
        }
        tracing::debug!(name = %self.name, pid, "process started");
        Ok(())
    }

    fn build_command(&self, limits: &ResourceLimits) -> Result<Command, ProcessError> {
        let Some(program) = self.argv.first() else {
            return Err(ProcessError::SpawnFailed {
                name: self.name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
            });
        };
        let mut cmd = Command::new(program);
        cmd.args(&self.argv[1..]);
        cmd.kill_on_drop(true);

        let spec = self.stdio.lock();
        cmd.stdin(if spec.stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(if spec.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stderr(if spec.capture_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if let Some(env) = &spec.env {
            cmd.env_clear();
            cmd.envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        {
            let limits = *limits;
            // SAFETY: setsid and setrlimit are async-signal-safe and run
            // between fork and exec. Rejected rlimits are skipped so the
            // exec still proceeds.
            unsafe {
                cmd.pre_exec(move || {
                    libc::setsid();
                    super::rlimit::apply(&limits);
                    Ok(())
                });
            }
        }
        #[cfg(not(unix))]
        let _ = limits;
        Ok(cmd)
    }

    fn attach_io(&self, child: &mut Child) -> RunningIo {
        if let Some(data) = self.stdio.lock().stdin_data.take() {
            if let Some(mut stdin) = child.stdin.take() {
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(&data).await {
                        tracing::warn!(error = %e, "stdin write failed");
                    }
                    let _ = stdin.shutdown().await;
                });
            }
        }
        let stdout_task = child.stdout.take().map(|mut out| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf).await;
                buf
            })
        });
        let stderr_task = child.stderr.take().map(|mut err| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf).await;
                buf
            })
        });
        RunningIo {
            stdout_task,
            stderr_task,
        }
    }

    /// Deliver a signal to the child's process group.
    pub fn signal(&self, sig: Signal) -> Result<(), ProcessError> {
        if !self.running() {
            return Err(ProcessError::NotRunning);
        }
        let pid = self.pid.load(Ordering::SeqCst);
        if pid == 0 {
            return Err(ProcessError::NotRunning);
        }
        kill_pid(pid, sig);
        Ok(())
    }

    /// Wait for the child to exit and tear down the resource envelope.
    ///
    /// Exactly one caller reaps the child; concurrent or repeated waits
    /// see `NotRunning`. Cgroup artifacts are removed on every exit path.
    pub async fn wait(&self) -> Result<(), ProcessError> {
        let (mut child, io) = {
            let mut slot = self.child.lock().await;
            match slot.take() {
                Some(pair) => pair,
                None => return Err(ProcessError::NotRunning),
            }
        };
        let status = child.wait().await;

        if let Some(task) = io.stdout_task {
            if let Ok(buf) = task.await {
                *self.stdout_bytes.lock() = buf;
            }
        }
        if let Some(task) = io.stderr_task {
            if let Ok(buf) = task.await {
                *self.stderr_bytes.lock() = buf;
            }
        }

        // Disarm the CPU timer before classifying the outcome.
        self.cpu_guard.lock().take();

        let pid = self.pid.load(Ordering::SeqCst);
        let oom = {
            let guard = self.cgroup.lock().take();
            match guard {
                Some(guard) => {
                    let oom = guard.oom_kill_count() > 0;
                    guard.cleanup(pid);
                    oom
                }
                None => false,
            }
        };

        if let Some(table) = self.table.upgrade() {
            table.lock().remove(&pid);
        }
        *self.state.lock() = State::Finished;

        let status = status.map_err(|e| ProcessError::WaitFailed(e.to_string()))?;
        let code = status.code().unwrap_or(-1);
        *self.exit_code.lock() = Some(code);
        tracing::debug!(name = %self.name, pid, code, "process exited");

        if self.cpu_killed.load(Ordering::SeqCst) {
            let limits = *self.limits.lock();
            return Err(ProcessError::CpuLimitExceeded {
                name: self.name.clone(),
                limit_ms: limits.max_cpu_time.as_millis() as u64,
            });
        }
        if oom {
            let limits = *self.limits.lock();
            return Err(ProcessError::OutOfMemory {
                name: self.name.clone(),
                limit_mb: limits.max_memory_mb,
            });
        }
        if code != 0 {
            return Err(ProcessError::Exited {
                name: self.name.clone(),
                code,
            });
        }
        Ok(())
    }
}

/// Requested rlimit dimensions this host cannot enforce.
#[cfg(unix)]
fn rejected_limit_dims(limits: &ResourceLimits) -> Vec<&'static str> {
    super::rlimit::rejected_dims(limits)
}

/// Off Unix there are no rlimits at all, so every requested dimension
/// is unsupported.
#[cfg(not(unix))]
fn rejected_limit_dims(limits: &ResourceLimits) -> Vec<&'static str> {
    let mut rejected = Vec::new();
    if limits.max_files > 0 {
        rejected.push("max_files");
    }
    if limits.max_processes > 0 {
        rejected.push("max_processes");
    }
    if limits.max_file_size_mb > 0 {
        rejected.push("max_file_size");
    }
    rejected
}

#[cfg(unix)]
fn kill_pid(pid: u32, sig: Signal) {
    let signo = match sig {
        Signal::Interrupt => libc::SIGINT,
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: kill() is async-signal-safe; the negative PID targets the
    // child's process group (the child called setsid).
    unsafe {
        libc::kill(-(pid as i32), signo);
    }
}

#[cfg(not(unix))]
fn kill_pid(_pid: u32, _sig: Signal) {}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
