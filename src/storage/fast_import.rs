//! Writer for the `git fast-import` stream.
//!
//! One commit per session:
//!
//! ```text
//! commit refs/heads/<branch>
//! committer <name> <<token>> <unix-timestamp> +0000
//! data <message-byte-length>
//! <message>
//! [from <parent-commit-id>]
//! M 644 inline <path>          (per write)
//! data <payload-byte-length>
//! <payload>
//! D <path>                     (per delete)
//! done
//! ```
//!
//! Every `data` length is a byte count, so multi-byte payloads stay framed.

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use crate::storage::types::{BranchName, CommitId, Committer};

/// Arguments for the import session.
pub fn session_args(verbose: bool) -> Vec<&'static str> {
    vec![
        "fast-import",
        "--date-format=raw",
        "--done",
        if verbose { "--stats" } else { "--quiet" },
    ]
}

/// Fluent writer over any byte sink (the process stdin, or a buffer in tests).
pub struct ImportStream<W: Write> {
    out: W,
}

impl<W: Write> ImportStream<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Commit header: target ref, committer line and message.
    pub fn header(
        &mut self,
        branch: &BranchName,
        committer: &Committer,
        when: DateTime<Utc>,
        message: &str,
    ) -> io::Result<&mut Self> {
        writeln!(self.out, "commit {}", branch.as_ref_path())?;
        writeln!(self.out, "committer {} {} +0000", committer, when.timestamp())?;
        self.data(message.as_bytes())?;
        Ok(self)
    }

    /// Link the commit to its parent. Omitted only for a root commit.
    pub fn from(&mut self, parent: CommitId) -> io::Result<&mut Self> {
        writeln!(self.out, "from {}", parent)?;
        Ok(self)
    }

    /// Create or replace the file at `path` with an inline payload.
    pub fn modify(&mut self, path: &str, payload: &[u8]) -> io::Result<&mut Self> {
        writeln!(self.out, "M 644 inline {}", path)?;
        self.data(payload)?;
        Ok(self)
    }

    /// Remove `path` from the commit's tree.
    pub fn delete(&mut self, path: &str) -> io::Result<&mut Self> {
        writeln!(self.out, "D {}", path)?;
        Ok(self)
    }

    /// Terminate the stream.
    pub fn done(&mut self) -> io::Result<()> {
        writeln!(self.out, "done")?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn data(&mut self, bytes: &[u8]) -> io::Result<()> {
        writeln!(self.out, "data {}", bytes.len())?;
        self.out.write_all(bytes)?;
        self.out.write_all(b"\n")
    }
}
