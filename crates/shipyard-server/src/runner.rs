use crate::hub::{BroadcastHub, CompletionEvent, TaskMessage};
use crate::log_sink::{LogHandle, LogSink};
use crate::registry::{Outcome, TaskRegistry, TaskState};
use chrono::Utc;
use shipyard_core::command::CommandLine;
use shipyard_core::types::{TaskId, TaskKind, TaskStatus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Lines read from the process but not yet written to the log.
const LINE_QUEUE: usize = 1024;

/// Longest line kept in memory. Longer output is split into several lines.
const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Execution handle for one running task.
struct RunHandle {
    stop: Arc<AtomicBool>,
    done: watch::Receiver<bool>,
}

/// Launches external commands as tasks. Each task's output is appended to
/// its log, then published to live subscribers, one line at a time.
#[derive(Clone)]
pub struct TaskRunner {
    registry: Arc<TaskRegistry>,
    hub: BroadcastHub,
    sink: LogSink,
    handles: Arc<Mutex<HashMap<TaskId, RunHandle>>>,
}

impl TaskRunner {
    pub fn new(registry: Arc<TaskRegistry>, hub: BroadcastHub, sink: LogSink) -> Self {
        Self {
            registry,
            hub,
            sink,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<TaskId, RunHandle>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a task and run `command` in `cwd` in the background.
    /// Returns as soon as the task exists; spawn failures show up as the
    /// task's Failed status and a diagnostic line in its log.
    pub async fn start(&self, kind: TaskKind, command: CommandLine, cwd: &Path) -> TaskId {
        let id = self.registry.create(kind);
        info!(task_id = %id, kind = %kind, command = %command, cwd = %cwd.display(), "task started");

        match self.sink.open(id).await {
            Ok(log) => self.launch(id, command, cwd.to_path_buf(), log),
            Err(e) => {
                error!(task_id = %id, error = %e, "failed to open task log");
                self.conclude(
                    id,
                    TaskStatus::Failed,
                    Outcome {
                        exit_code: None,
                        diagnostic: Some(format!("failed to open log: {e}")),
                    },
                );
            }
        }
        id
    }

    /// Run an already-registered task against an open log.
    pub(crate) fn launch(&self, id: TaskId, command: CommandLine, cwd: PathBuf, log: LogHandle) {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = watch::channel(false);
        self.handles().insert(
            id,
            RunHandle {
                stop: stop.clone(),
                done: done_rx,
            },
        );

        let runner = self.clone();
        tokio::spawn(async move {
            let (status, outcome) = runner.execute(id, &command, &cwd, log, &stop).await;
            runner.conclude(id, status, outcome);
            runner.handles().remove(&id);
            let _ = done_tx.send(true);
        });
    }

    async fn execute(
        &self,
        id: TaskId,
        command: &CommandLine,
        cwd: &Path,
        mut log: LogHandle,
        stop: &AtomicBool,
    ) -> (TaskStatus, Outcome) {
        let mut child = match spawn(command, cwd) {
            Ok(child) => child,
            Err(diagnostic) => {
                warn!(task_id = %id, %diagnostic, "spawn failed");
                // Logged only; a task that never ran streams nothing.
                if let Err(e) = log.append(&diagnostic).await {
                    warn!(task_id = %id, error = %e, "could not log spawn failure");
                }
                close_log(id, log).await;
                return (
                    TaskStatus::Failed,
                    Outcome {
                        exit_code: None,
                        diagnostic: Some(diagnostic),
                    },
                );
            }
        };

        // stdout and stderr merge into one line stream.
        let (tx, mut rx) = mpsc::channel::<String>(LINE_QUEUE);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pipe_lines(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pipe_lines(stderr, tx.clone())));
        }
        drop(tx);

        let mut diagnostic = None;
        while let Some(text) = rx.recv().await {
            if stop.load(Ordering::Relaxed) {
                info!(task_id = %id, "stop requested");
                diagnostic = Some("stopped on request".to_string());
                break;
            }
            if let Err(e) = self.record(id, &mut log, &text).await {
                error!(task_id = %id, error = %e, "log write failed, aborting task");
                diagnostic = Some(format!("log write failed: {e}"));
                break;
            }
        }
        drop(rx);

        if diagnostic.is_some() {
            if let Err(e) = child.start_kill() {
                debug!(task_id = %id, error = %e, "kill failed");
            }
            // A grandchild may still hold the pipes open.
            for reader in &readers {
                reader.abort();
            }
        }
        for reader in readers {
            let _ = reader.await;
        }

        let exit_code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(task_id = %id, error = %e, "wait failed");
                diagnostic.get_or_insert(format!("wait failed: {e}"));
                None
            }
        };

        if let Err(e) = log.close().await {
            error!(task_id = %id, error = %e, "log close failed");
            diagnostic.get_or_insert(format!("log write failed: {e}"));
        }

        let status = match (exit_code, &diagnostic) {
            (Some(code), None) => TaskStatus::from_exit_code(code),
            _ => TaskStatus::Failed,
        };
        (
            status,
            Outcome {
                exit_code,
                diagnostic,
            },
        )
    }

    /// Durable write first, then live fan-out.
    async fn record(&self, id: TaskId, log: &mut LogHandle, text: &str) -> std::io::Result<()> {
        let line = log.append(text).await?;
        self.hub.publish(id, TaskMessage::Line(line));
        Ok(())
    }

    /// Record the final status, then send the completion marker and release
    /// the task's subscribers.
    fn conclude(&self, id: TaskId, status: TaskStatus, outcome: Outcome) {
        let event = match self.registry.finish(id, status, outcome) {
            Ok(task) => {
                info!(
                    task_id = %id,
                    status = %task.status,
                    exit_code = ?task.exit_code,
                    diagnostic = task.diagnostic.as_deref().unwrap_or(""),
                    "task finished"
                );
                CompletionEvent {
                    status: task.status,
                    exit_code: task.exit_code,
                    completed_at: task.completed_at.unwrap_or_else(Utc::now),
                }
            }
            Err(e) => {
                warn!(task_id = %id, error = %e, "could not record task outcome");
                CompletionEvent {
                    status,
                    exit_code: None,
                    completed_at: Utc::now(),
                }
            }
        };
        self.hub.publish(id, TaskMessage::Completed(event));
        self.hub.close(id);
    }

    /// Wait for a task's run to finish and return its final record.
    pub async fn wait(&self, id: TaskId) -> Option<TaskState> {
        let done = self.handles().get(&id).map(|h| h.done.clone());
        if let Some(mut done) = done {
            let _ = done.wait_for(|finished| *finished).await;
        }
        self.registry.get(id)
    }

    /// Ask a running task to stop. Checked between output lines; the process
    /// is killed and the task ends as Failed.
    pub fn request_stop(&self, id: TaskId) -> bool {
        match self.handles().get(&id) {
            Some(handle) => {
                handle.stop.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn active_count(&self) -> usize {
        self.handles().len()
    }
}

fn spawn(command: &CommandLine, cwd: &Path) -> Result<Child, String> {
    if !cwd.is_dir() {
        return Err(format!(
            "failed to spawn '{}': working directory '{}' does not exist",
            command.program,
            cwd.display()
        ));
    }
    Command::new(&command.program)
        .args(&command.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to spawn '{}': {e}", command.program))
}

/// Forward lines from one pipe, splitting any line longer than
/// `MAX_LINE_BYTES`. Invalid UTF-8 is replaced rather than ending the stream.
async fn pipe_lines<R: AsyncRead + Unpin>(stream: R, tx: mpsc::Sender<String>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut buf)
            .await;
        match read {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "output read failed");
                break;
            }
        }
    }
}

async fn close_log(id: TaskId, log: LogHandle) {
    if let Err(e) = log.close().await {
        warn!(task_id = %id, error = %e, "log close failed");
    }
}
