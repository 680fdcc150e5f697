//! Durable, append-only task logs: one `<task_id>.log` file per task.

use serde::Serialize;
use shipyard_core::paths;
use shipyard_core::types::TaskId;
use shipyard_core::{Result, ShipyardError};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// One line of process output, numbered from 1 within its task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub seq: u64,
    #[serde(rename = "line")]
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct LogSink {
    dir: PathBuf,
}

impl LogSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, task_id: TaskId) -> PathBuf {
        paths::task_log(&self.dir, &task_id.to_string())
    }

    /// Open the task's log for appending, creating the log directory if needed.
    pub async fn open(&self, task_id: TaskId) -> std::io::Result<LogHandle> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(task_id);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(LogHandle::from_file(file, path))
    }

    /// Full log text. Works whether or not the task is still running.
    pub async fn read(&self, task_id: TaskId) -> Result<String> {
        let path = self.path_for(task_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ShipyardError::LogNotFound(task_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Exclusive writer for one task's log. Dropping it releases the file.
#[derive(Debug)]
pub struct LogHandle {
    file: File,
    path: PathBuf,
    next_seq: u64,
}

impl LogHandle {
    pub(crate) fn from_file(file: File, path: PathBuf) -> Self {
        Self {
            file,
            path,
            next_seq: 1,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.next_seq - 1
    }

    /// Append one line and flush it so out-of-band readers see it immediately.
    /// The sequence number is only consumed when the write succeeds.
    pub async fn append(&mut self, text: &str) -> std::io::Result<LogLine> {
        let mut buf = String::with_capacity(text.len() + 1);
        buf.push_str(text);
        buf.push('\n');
        self.file.write_all(buf.as_bytes()).await?;
        self.file.flush().await?;

        let line = LogLine {
            seq: self.next_seq,
            text: text.to_string(),
        };
        self.next_seq += 1;
        Ok(line)
    }

    pub async fn close(mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_creates_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let sink = LogSink::new(dir.path().join("nested/logs"));
        let id = TaskId::new();
        let handle = sink.open(id).await.unwrap();
        assert!(handle.path().exists());
        assert_eq!(handle.path(), sink.path_for(id));
        assert!(handle
            .path()
            .to_string_lossy()
            .ends_with(&format!("{id}.log")));
    }

    #[tokio::test]
    async fn append_numbers_lines_without_gaps() {
        let dir = TempDir::new().unwrap();
        let sink = LogSink::new(dir.path());
        let id = TaskId::new();
        let mut handle = sink.open(id).await.unwrap();

        let a = handle.append("first").await.unwrap();
        let b = handle.append("second").await.unwrap();
        let c = handle.append("").await.unwrap();
        assert_eq!((a.seq, b.seq, c.seq), (1, 2, 3));
        assert_eq!(handle.lines_written(), 3);
        handle.close().await.unwrap();

        assert_eq!(sink.read(id).await.unwrap(), "first\nsecond\n\n");
    }

    #[tokio::test]
    async fn lines_are_readable_while_handle_is_open() {
        let dir = TempDir::new().unwrap();
        let sink = LogSink::new(dir.path());
        let id = TaskId::new();
        let mut handle = sink.open(id).await.unwrap();
        handle.append("live").await.unwrap();

        assert_eq!(sink.read(id).await.unwrap(), "live\n");
        drop(handle);
    }

    #[tokio::test]
    async fn read_unknown_task_is_log_not_found() {
        let dir = TempDir::new().unwrap();
        let sink = LogSink::new(dir.path());
        let err = sink.read(TaskId::new()).await.unwrap_err();
        assert!(matches!(err, ShipyardError::LogNotFound(_)));
    }

    #[tokio::test]
    async fn separate_tasks_write_separate_files() {
        let dir = TempDir::new().unwrap();
        let sink = LogSink::new(dir.path());
        let (a, b) = (TaskId::new(), TaskId::new());
        let mut ha = sink.open(a).await.unwrap();
        let mut hb = sink.open(b).await.unwrap();
        for i in 0..20 {
            ha.append(&format!("a-{i}")).await.unwrap();
            hb.append(&format!("b-{i}")).await.unwrap();
        }
        drop((ha, hb));

        let text_a = sink.read(a).await.unwrap();
        let text_b = sink.read(b).await.unwrap();
        assert!(text_a.lines().all(|l| l.starts_with("a-")));
        assert!(text_b.lines().all(|l| l.starts_with("b-")));
        assert_eq!(text_a.lines().count(), 20);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn write_failure_surfaces_as_error() {
        let file = OpenOptions::new().write(true).open("/dev/full").await.unwrap();
        let mut handle = LogHandle::from_file(file, PathBuf::from("/dev/full"));
        assert!(handle.append("nope").await.is_err());
        assert_eq!(handle.lines_written(), 0);
    }
}
