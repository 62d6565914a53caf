use crate::conf::ProcessSourceConfig;
use crate::follower::backoff::Backoff;
use crate::follower::error::FollowerError;
use crate::follower::lines::LineBuffer;
use crate::follower::{FollowerSink, FollowerTask, SourceFollower, stopped};
use async_trait::async_trait;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::fmt;
use std::future::Future;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::{self, Instant};

const READ_CHUNK: usize = 8 * 1024;
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// One program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// What to run for the history backfill and for live following.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub seed: Option<CommandSpec>,
    pub follow: CommandSpec,
}

impl LaunchPlan {
    /// `<program> logs --since=<since> <container>` then `<program> logs -f --tail=0 <container>`,
    /// both optionally wrapped in `sudo`.
    pub fn from_config(cfg: &ProcessSourceConfig) -> Self {
        let invocation = |args: Vec<String>| {
            if cfg.use_sudo {
                let mut wrapped = vec![cfg.program.clone()];
                wrapped.extend(args);
                CommandSpec::new("sudo", wrapped)
            } else {
                CommandSpec::new(cfg.program.clone(), args)
            }
        };

        let seed = (!cfg.since.is_empty()).then(|| {
            invocation(vec![
                "logs".to_string(),
                format!("--since={}", cfg.since),
                cfg.container.clone(),
            ])
        });

        let follow = invocation(vec![
            "logs".to_string(),
            "-f".to_string(),
            "--tail=0".to_string(),
            cfg.container.clone(),
        ]);

        Self { seed, follow }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTiming {
    pub seed_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ProcessTiming {
    pub fn from_config(cfg: &ProcessSourceConfig) -> Self {
        Self {
            seed_timeout: Duration::from_millis(cfg.seed_timeout_ms),
            initial_backoff: Duration::from_millis(cfg.initial_backoff_ms),
            max_backoff: Duration::from_millis(cfg.max_backoff_ms),
        }
    }
}

impl Default for ProcessTiming {
    fn default() -> Self {
        Self {
            seed_timeout: Duration::from_secs(30),
            initial_backoff: Duration::from_millis(1_000),
            max_backoff: Duration::from_millis(30_000),
        }
    }
}

/// Follows the output of an external log-producing command, relaunching it forever.
#[derive(Debug)]
pub struct ProcessFollower {
    plan: LaunchPlan,
    timing: ProcessTiming,
    task: FollowerTask,
}

impl ProcessFollower {
    pub fn new(plan: LaunchPlan, timing: ProcessTiming) -> Self {
        Self {
            plan,
            timing,
            task: FollowerTask::default(),
        }
    }

    pub fn from_config(cfg: &ProcessSourceConfig) -> Self {
        Self::new(LaunchPlan::from_config(cfg), ProcessTiming::from_config(cfg))
    }

    pub fn plan(&self) -> &LaunchPlan {
        &self.plan
    }
}

#[async_trait]
impl SourceFollower for ProcessFollower {
    fn name(&self) -> &'static str {
        "process"
    }

    fn start(&mut self, sink: FollowerSink) {
        if self.task.is_running() {
            tracing::warn!("process follower already running");
            return;
        }
        let plan = self.plan.clone();
        let timing = self.timing;
        self.task
            .spawn(move |shutdown| follow_process(plan, timing, sink, shutdown));
    }

    async fn stop(&mut self) {
        self.task.stop().await;
    }
}

//-----------------------------------------------------------------------------
// Follower task
//-----------------------------------------------------------------------------

/// Why output draining ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Deadline,
    Shutdown,
}

/// How one live run of the follow command ended.
enum LiveExit {
    Exited(ExitStatus),
    Failed,
    Stopped,
}

async fn follow_process(
    plan: LaunchPlan,
    timing: ProcessTiming,
    sink: FollowerSink,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Some(seed) = &plan.seed {
        if !seed_history(seed, timing.seed_timeout, &sink, &mut shutdown).await {
            return;
        }
    }

    let mut backoff = Backoff::new(timing.initial_backoff, timing.max_backoff);

    loop {
        match run_live(&plan.follow, &sink, &mut shutdown).await {
            LiveExit::Stopped => return,
            LiveExit::Exited(status) => {
                sink.notice(format!(
                    "{} exited code={} signal={}",
                    plan.follow.program,
                    display_opt(status.code()),
                    display_opt(status.signal())
                ));
            }
            LiveExit::Failed => {}
        }

        let delay = backoff.next_delay();
        sink.notice(format!("restarting in {}ms", delay.as_millis()));

        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = stopped(&mut shutdown) => return,
        }
    }
}

/// Run the one-shot history command. Returns `false` when a stop was requested.
async fn seed_history(
    spec: &CommandSpec,
    timeout: Duration,
    sink: &FollowerSink,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let mut child = match spec.command().spawn() {
        Ok(child) => child,
        Err(source) => {
            // Seeding never blocks live following.
            sink.error(FollowerError::Spawn {
                program: spec.program.clone(),
                source,
            });
            return true;
        }
    };

    // One deadline covers both draining output and waiting for exit.
    let deadline = Instant::now() + timeout;

    let interrupt = async {
        tokio::select! {
            _ = time::sleep_until(deadline) => Interrupt::Deadline,
            _ = stopped(shutdown) => Interrupt::Shutdown,
        }
    };

    let outcome = match drain_output(&mut child, &spec.program, sink, true, interrupt).await {
        Some(interrupt) => interrupt,
        None => {
            tokio::select! {
                status = time::timeout_at(deadline, child.wait()) => match status {
                    Ok(_) => return true,
                    Err(_) => Interrupt::Deadline,
                },
                _ = stopped(shutdown) => Interrupt::Shutdown,
            }
        }
    };

    match outcome {
        Interrupt::Shutdown => {
            terminate(&mut child).await;
            false
        }
        Interrupt::Deadline => {
            sink.notice(format!("seed timed out after {}ms", timeout.as_millis()));
            terminate(&mut child).await;
            true
        }
    }
}

async fn run_live(
    spec: &CommandSpec,
    sink: &FollowerSink,
    shutdown: &mut watch::Receiver<bool>,
) -> LiveExit {
    let mut child = match spec.command().spawn() {
        Ok(child) => child,
        Err(source) => {
            sink.notice(format!("spawn failed: {source}"));
            sink.error(FollowerError::Spawn {
                program: spec.program.clone(),
                source,
            });
            return LiveExit::Failed;
        }
    };
    sink.notice(format!("spawned: {spec}"));

    let interrupt = async {
        stopped(shutdown).await;
        Interrupt::Shutdown
    };
    if drain_output(&mut child, &spec.program, sink, false, interrupt)
        .await
        .is_some()
    {
        terminate(&mut child).await;
        return LiveExit::Stopped;
    }

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => LiveExit::Exited(status),
            Err(source) => {
                sink.error(FollowerError::Wait { program: spec.program.clone(), source });
                LiveExit::Failed
            }
        },
        _ = stopped(shutdown) => {
            terminate(&mut child).await;
            LiveExit::Stopped
        }
    }
}

/// Pump stdout and stderr as two independently ordered line streams until both close or
/// `interrupt` fires. Partial lines are flushed on close and on a deadline, discarded on
/// shutdown.
async fn drain_output<F>(
    child: &mut Child,
    program: &str,
    sink: &FollowerSink,
    seed: bool,
    interrupt: F,
) -> Option<Interrupt>
where
    F: Future<Output = Interrupt>,
{
    tokio::pin!(interrupt);

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut stdout_lines = LineBuffer::default();
    let mut stderr_lines = LineBuffer::default();
    let mut stdout_chunk = vec![0u8; READ_CHUNK];
    let mut stderr_chunk = vec![0u8; READ_CHUNK];
    let mut interrupted = None;

    while interrupted.is_none() && (stdout.is_some() || stderr.is_some()) {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut stdout_chunk), if stdout.is_some() => {
                match read {
                    Ok(0) => stdout = None,
                    Ok(n) => sink.lines(stdout_lines.push(&stdout_chunk[..n]), seed),
                    Err(source) => {
                        sink.error(FollowerError::Stream { program: program.to_string(), stream: "stdout", source });
                        stdout = None;
                    }
                }
            }
            read = read_chunk(&mut stderr, &mut stderr_chunk), if stderr.is_some() => {
                match read {
                    Ok(0) => stderr = None,
                    Ok(n) => sink.lines(stderr_lines.push(&stderr_chunk[..n]), seed),
                    Err(source) => {
                        sink.error(FollowerError::Stream { program: program.to_string(), stream: "stderr", source });
                        stderr = None;
                    }
                }
            }
            reason = &mut interrupt => interrupted = Some(reason),
        }
    }

    if interrupted != Some(Interrupt::Shutdown) {
        let leftovers = [stdout_lines.flush(), stderr_lines.flush()];
        sink.lines(leftovers.into_iter().flatten().collect(), seed);
    }

    interrupted
}

async fn read_chunk<R>(reader: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(reader) => reader.read(buf).await,
        None => Ok(0),
    }
}

/// SIGTERM first, SIGKILL if the child outlives the grace period.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
    if time::timeout(TERMINATE_GRACE, child.wait()).await.is_err() {
        let _ = child.kill().await;
    }
}

fn display_opt(value: Option<i32>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}
