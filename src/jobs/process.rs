use std::fmt;
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use super::dispatch::UiScheduler;
use super::request::JobCommand;
use crate::log_queue::LogSender;

const READ_CHUNK: usize = 4096;

/// Lifecycle of one external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Running,
    /// The process exited with status zero.
    Completed,
    /// Non-zero exit, death by signal, or the exit status could not be collected.
    Failed,
}

impl JobState {
    fn to_u8(self) -> u8 {
        match self {
            JobState::Running => 0,
            JobState::Completed => 1,
            JobState::Failed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => JobState::Completed,
            2 => JobState::Failed,
            _ => JobState::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != JobState::Running
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        })
    }
}

/// The job never started.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("Failed to start `{command}`: {source}")]
    Process {
        command: String,
        source: std::io::Error,
    },
    #[error("Failed to start output reader for `{command}`: {source}")]
    Thread {
        command: String,
        source: std::io::Error,
    },
}

struct JobShared {
    id: Uuid,
    command: JobCommand,
    started_at: OffsetDateTime,
    state: AtomicU8,
}

/// Observer of one launched process. Clones share the same state.
#[derive(Clone)]
pub struct JobHandle {
    shared: Arc<JobShared>,
}

impl JobHandle {
    fn new(command: JobCommand) -> Self {
        Self {
            shared: Arc::new(JobShared {
                id: Uuid::new_v4(),
                command,
                started_at: OffsetDateTime::now_utc(),
                state: AtomicU8::new(JobState::Running.to_u8()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn command(&self) -> &JobCommand {
        &self.shared.command
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.shared.started_at
    }

    pub fn state(&self) -> JobState {
        JobState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == JobState::Running
    }

    fn finish(&self, state: JobState) {
        self.shared.state.store(state.to_u8(), Ordering::Release);
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.shared.id)
            .field("command", &self.shared.command.to_string())
            .field("state", &self.state())
            .finish()
    }
}

/// Launches external jobs, each supervised by its own background thread.
///
/// Output lines are mirrored to the log queue as INFO and handed to the
/// caller's `on_line` on the supervising thread. Completion is reported once
/// through the log queue and once through `on_exit`, which runs on the
/// presentation loop via the [`UiScheduler`].
pub struct ProcessManager<C> {
    log: LogSender,
    scheduler: UiScheduler<C>,
}

impl<C> Clone for ProcessManager<C> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<C: 'static> ProcessManager<C> {
    pub fn new(log: LogSender, scheduler: UiScheduler<C>) -> Self {
        Self { log, scheduler }
    }

    /// Start `command` and return while it runs.
    ///
    /// A spawn failure is logged as ERROR and returned; `on_exit` is dropped
    /// without being called in that case.
    pub fn launch<L, E>(
        &self,
        command: &JobCommand,
        on_line: L,
        on_exit: E,
    ) -> Result<JobHandle, SpawnError>
    where
        L: FnMut(&str) + Send + 'static,
        E: FnOnce(&mut C, JobState) + Send + 'static,
    {
        match self.spawn_supervised(command, on_line, on_exit) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.log.error(err.to_string());
                Err(err)
            }
        }
    }

    fn spawn_supervised<L, E>(
        &self,
        command: &JobCommand,
        mut on_line: L,
        on_exit: E,
    ) -> Result<JobHandle, SpawnError>
    where
        L: FnMut(&str) + Send + 'static,
        E: FnOnce(&mut C, JobState) + Send + 'static,
    {
        let rendered = command.to_string();
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SpawnError::Process {
                command: rendered.clone(),
                source,
            })?;

        let handle = JobHandle::new(command.clone());
        let short_id = handle.id().simple().to_string();
        let short_id = &short_id[..8];

        let (line_tx, line_rx) = mpsc::channel::<String>();
        let pumps = match spawn_pumps(&mut child, &line_tx, short_id) {
            Ok(pumps) => pumps,
            Err(source) => {
                detach(child, &rendered);
                return Err(SpawnError::Thread {
                    command: rendered,
                    source,
                });
            }
        };
        drop(line_tx);

        self.log.system(format!("Started {rendered}"));
        let log = self.log.clone();
        let scheduler = self.scheduler.clone();
        let job = handle.clone();
        thread::Builder::new()
            .name(format!("steelscan-job-{short_id}"))
            .spawn(move || {
                for line in line_rx {
                    log.info(line.as_str());
                    on_line(&line);
                }
                for pump in pumps {
                    if pump.join().is_err() {
                        warn!("Output reader thread panicked");
                    }
                }
                let state = collect_exit(&mut child, &job, &log);
                job.finish(state);
                if !scheduler.schedule(move |context: &mut C| on_exit(context, state)) {
                    debug!("Presentation loop gone; dropping exit callback");
                }
            })
            .map_err(|source| SpawnError::Thread {
                command: rendered,
                source,
            })?;
        Ok(handle)
    }
}

fn spawn_pumps(
    child: &mut Child,
    line_tx: &Sender<String>,
    short_id: &str,
) -> std::io::Result<Vec<JoinHandle<()>>> {
    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(spawn_pump(stdout, line_tx.clone(), format!("steelscan-out-{short_id}"))?);
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(spawn_pump(stderr, line_tx.clone(), format!("steelscan-err-{short_id}"))?);
    }
    Ok(pumps)
}

fn spawn_pump<R>(reader: R, tx: Sender<String>, name: String) -> std::io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(move || pump_lines(reader, &tx))
}

/// Forward every non-empty line of `reader` until EOF.
fn pump_lines<R: Read>(mut reader: R, tx: &Sender<String>) {
    let mut splitter = LineSplitter::default();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => splitter.push(&chunk[..read], |line| {
                let _ = tx.send(line);
            }),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!("Stopped reading job output: {err}");
                break;
            }
        }
    }
    splitter.finish(|line| {
        let _ = tx.send(line);
    });
}

/// Jobs are never killed. A child whose output could not be attached keeps
/// running unobserved once its pipes are closed.
fn detach(mut child: Child, command: &str) {
    drop(child.stdout.take());
    drop(child.stderr.take());
    warn!("Detached from {command} (pid {}); its output will not be read", child.id());
}

fn collect_exit(child: &mut Child, job: &JobHandle, log: &LogSender) -> JobState {
    let command = job.command();
    match child.wait() {
        Ok(status) if status.success() => {
            log.system(format!("Finished {command}"));
            JobState::Completed
        }
        Ok(status) => {
            let detail = match status.code() {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            };
            log.error(format!("{command} failed ({detail})"));
            JobState::Failed
        }
        Err(err) => {
            log.error(format!("Lost track of {command}: {err}"));
            JobState::Failed
        }
    }
}

/// Splits a byte stream on `\n` and `\r`, yielding trimmed non-empty lines.
///
/// Progress bars redraw with bare carriage returns, so each redraw becomes a line.
#[derive(Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, bytes: &[u8], mut emit: impl FnMut(String)) {
        for &byte in bytes {
            if byte == b'\n' || byte == b'\r' {
                self.flush(&mut emit);
            } else {
                self.pending.push(byte);
            }
        }
    }

    fn finish(&mut self, mut emit: impl FnMut(String)) {
        self.flush(&mut emit);
    }

    fn flush(&mut self, emit: &mut impl FnMut(String)) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        if !line.is_empty() {
            emit(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::dispatch::UiDispatcher;
    use crate::log_queue::{LogQueue, Severity};

    fn split(chunks: &[&[u8]]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut splitter = LineSplitter::default();
        for chunk in chunks {
            splitter.push(chunk, |line| lines.push(line));
        }
        splitter.finish(|line| lines.push(line));
        lines
    }

    #[test]
    fn splitter_handles_mixed_newlines_and_partial_chunks() {
        let lines = split(&[b"epoch 1/3\r", b"epoch 2", b"/3\r\n\n  done  \n", b"tail"]);
        assert_eq!(lines, vec!["epoch 1/3", "epoch 2/3", "done", "tail"]);
    }

    #[test]
    fn splitter_drops_blank_lines_and_decodes_lossily() {
        let lines = split(&[b"   \n\xffok\n"]);
        assert_eq!(lines, vec!["\u{fffd}ok"]);
    }

    #[test]
    fn job_state_round_trips_through_atomic_encoding() {
        for state in [JobState::Running, JobState::Completed, JobState::Failed] {
            assert_eq!(JobState::from_u8(state.to_u8()), state);
        }
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn missing_executable_is_logged_and_skips_exit_callback() {
        let queue = LogQueue::new();
        let dispatcher = UiDispatcher::<Vec<JobState>>::new();
        let manager = ProcessManager::new(queue.sender(), dispatcher.scheduler());
        let command = JobCommand::new("/definitely/not/a/steelscan/engine").arg("--help");

        let err = manager
            .launch(&command, |_| {}, |exits: &mut Vec<JobState>, state| exits.push(state))
            .unwrap_err();
        assert!(matches!(err, SpawnError::Process { .. }));

        let logged = queue.drain();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].severity, Severity::Error);
        assert!(logged[0].message.contains("/definitely/not/a/steelscan/engine"));

        let mut exits = Vec::new();
        assert_eq!(dispatcher.run_pending(&mut exits), 0);
        assert!(exits.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn detached_child_runs_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let script = format!("sleep 0.2; touch '{}'", marker.display());
        let child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        detach(child, "sh -c sleep");
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while !marker.exists() && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(marker.exists());
    }
}
