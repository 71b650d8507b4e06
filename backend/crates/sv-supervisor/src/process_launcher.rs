//! Production launcher: one OS child process per worker port.

use crate::{LaunchError, Launcher, TerminateError, WorkerDefinition};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::fs::{self, OpenOptions};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);
const DEFAULT_STARTUP_CHECK: Duration = Duration::from_millis(100);

/// Spawns workers as child processes and keeps their handles for termination.
///
/// Children run in their own session on Unix and are killed if the launcher
/// is dropped while they are still tracked.
#[derive(Debug)]
pub struct ProcessLauncher {
    log_dir: Option<PathBuf>,
    grace_period: Duration,
    startup_check: Duration,
    children: Mutex<HashMap<u16, Child>>,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        Self {
            log_dir: None,
            grace_period: DEFAULT_GRACE_PERIOD,
            startup_check: DEFAULT_STARTUP_CHECK,
            children: Mutex::new(HashMap::new()),
        }
    }

    /// Append worker stdout/stderr to `<dir>/<name>-<port>.log`.
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Time between SIGTERM and a forced kill.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// How long a fresh child must survive before launch reports success.
    pub fn with_startup_check(mut self, startup_check: Duration) -> Self {
        self.startup_check = startup_check;
        self
    }

    pub fn log_path_for(&self, definition: &WorkerDefinition) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(log_file_name(definition)))
    }

    /// Pid of the tracked child on `port`, if any.
    pub async fn pid_of(&self, port: u16) -> Option<u32> {
        self.children
            .lock()
            .await
            .get(&port)
            .and_then(|child| child.id())
    }

    async fn open_log(path: &Path) -> Result<(Stdio, Stdio), LaunchError> {
        let log_error = |source| LaunchError::LogFile {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(log_error)?;
        }

        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(log_error)?
            .into_std()
            .await;
        let stderr = stdout.try_clone().map_err(log_error)?;

        Ok((Stdio::from(stdout), Stdio::from(stderr)))
    }

    async fn build_command(&self, definition: &WorkerDefinition) -> Result<Command, LaunchError> {
        let launch = &definition.launch;
        let mut cmd = Command::new(&launch.program);

        cmd.args(launch.resolved_args(definition.port))
            .envs(&launch.env)
            .env("WORKER_PORT", definition.port.to_string())
            .env("WORKER_NAME", &definition.name)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(ref dir) = launch.working_dir {
            cmd.current_dir(dir);
        }

        match self.log_path_for(definition) {
            Some(path) => {
                let (stdout, stderr) = Self::open_log(&path).await?;
                cmd.stdout(stdout).stderr(stderr);
            }
            None => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        // Own session so terminal signals aimed at the supervisor skip workers
        #[cfg(unix)]
        {
            unsafe {
                cmd.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        Ok(cmd)
    }

    /// Forget a tracked child that has already exited.
    async fn reap_stale(&self, port: u16) {
        let mut children = self.children.lock().await;
        if let Some(child) = children.get_mut(&port)
            && let Ok(Some(status)) = child.try_wait()
        {
            debug!("Reaped stale worker on port {port} ({status})");
            children.remove(&port);
        }
    }

    #[cfg(unix)]
    fn send_sigterm(pid: u32) -> Result<(), TerminateError> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        info!("Sending SIGTERM to pid {pid}");
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(TerminateError::Signal {
                pid,
                message: e.to_string(),
            }),
        }
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, definition: &WorkerDefinition) -> Result<u32, LaunchError> {
        let port = definition.port;
        self.reap_stale(port).await;

        let program = definition.launch.program.clone();
        info!(
            "Launching {} on port {port}: {}",
            definition.name,
            definition.launch.display_command(port)
        );

        let mut child = self
            .build_command(definition)
            .await?
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !self.startup_check.is_zero() {
            tokio::time::sleep(self.startup_check).await;
        }

        if let Ok(Some(status)) = child.try_wait() {
            return Err(LaunchError::ExitedEarly {
                program,
                status: status.to_string(),
            });
        }

        let Some(pid) = child.id() else {
            return Err(LaunchError::ExitedEarly {
                program,
                status: String::from("no pid"),
            });
        };

        info!("Spawned {} with PID {pid}", definition.name);

        if let Some(previous) = self.children.lock().await.insert(port, child) {
            warn!(
                "Replaced untracked child {:?} on port {port}",
                previous.id()
            );
        }

        Ok(pid)
    }

    async fn terminate(&self, port: u16) -> Result<(), TerminateError> {
        let Some(mut child) = self.children.lock().await.remove(&port) else {
            debug!("No tracked process on port {port}, nothing to stop");
            return Ok(());
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!("Worker on port {port} already exited ({status})");
            return Ok(());
        }

        let Some(pid) = child.id() else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            Self::send_sigterm(pid)?;
        }

        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(Ok(status)) => {
                info!("Worker on port {port} exited ({status})");
                Ok(())
            }
            Ok(Err(source)) => Err(TerminateError::Wait { pid, source }),
            Err(_) => {
                info!("Force killing worker process (PID: {pid})");
                child
                    .kill()
                    .await
                    .map_err(|source| TerminateError::Wait { pid, source })
            }
        }
    }
}

fn log_file_name(definition: &WorkerDefinition) -> String {
    let slug: String = definition
        .name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    format!("{}-{}.log", slug.trim_matches('-'), definition.port)
}
