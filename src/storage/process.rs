//! Synchronous external process handling.
//!
//! A `GitProcess` is one round trip: spawn, write stdin fully, close it,
//! collect stdout/stderr and the exit status. A process is never reused.

use std::ffi::OsString;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::storage::error::{StorageError, StorageResult};

/// A running git subprocess bound to one repository.
pub struct GitProcess {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    command: String,
}

impl GitProcess {
    /// Spawn `git --git-dir <git_dir> <args...>` with all three pipes captured.
    pub fn spawn(binary: &Path, git_dir: &Path, args: &[&str]) -> StorageResult<Self> {
        let mut full_args: Vec<OsString> = vec!["--git-dir".into(), git_dir.as_os_str().to_owned()];
        full_args.extend(args.iter().map(OsString::from));

        let command = format!("{} {}", binary.display(), args.join(" "));

        let mut child = Command::new(binary)
            .args(&full_args)
            .current_dir(git_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| StorageError::Process {
                command: command.clone(),
                source,
            })?;

        let stdin = child.stdin.take().map(BufWriter::new);

        Ok(Self {
            child,
            stdin,
            command,
        })
    }

    /// The command line, for error messages and logs.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Writable handle on the process's stdin.
    pub fn stdin(&mut self) -> io::Result<&mut BufWriter<ChildStdin>> {
        self.stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin already closed"))
    }

    /// Flush and close stdin, then wait for the process to exit.
    pub fn finish(mut self) -> StorageResult<ProcessOutput> {
        let flushed = match self.stdin.take() {
            // dropping the writer closes the pipe, which ends the session
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        };

        let output = self
            .child
            .wait_with_output()
            .map_err(|source| StorageError::Process {
                command: self.command.clone(),
                source,
            })?;

        let result = ProcessOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        // a failed flush usually means the process died early; its exit
        // status and stderr say why, so only report the flush if it exited cleanly
        match flushed {
            Err(source) if result.success() => Err(StorageError::Process {
                command: self.command,
                source,
            }),
            _ => Ok(result),
        }
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout as trimmed text
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}
