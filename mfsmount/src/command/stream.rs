//! Byte stream returned by query-style remote commands.

use std::io::{self, BufReader, Cursor, Read};
use std::process::{Child, ChildStdout};

use super::runner::CommandError;

/// Readable output of a query-style command.
///
/// Wraps the spawned child's stdout. The exit status is only observable
/// through [`QueryStream::finish`], so callers must drain the stream and
/// finish it on every path; dropping the stream early reaps the child
/// without checking its status.
pub struct QueryStream {
    inner: Inner,
}

enum Inner {
    Child {
        child: Child,
        stdout: BufReader<ChildStdout>,
    },
    /// In-memory stream for fake runners in tests.
    Buffer(Cursor<Vec<u8>>),
}

impl QueryStream {
    /// Wrap a spawned child whose stdout is piped.
    pub(crate) fn from_child(mut child: Child) -> Result<Self, CommandError> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CommandError::Io(io::Error::other("child stdout was not piped")))?;
        Ok(Self {
            inner: Inner::Child {
                child,
                stdout: BufReader::new(stdout),
            },
        })
    }

    /// Build a stream over in-memory bytes, always finishing successfully.
    ///
    /// Used by fake [`RemoteRunner`](super::RemoteRunner) implementations in
    /// tests.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Inner::Buffer(Cursor::new(bytes.into())),
        }
    }

    /// Wait for the command to complete and check its exit status.
    pub fn finish(mut self) -> Result<(), CommandError> {
        // Swap in an empty buffer so Drop does not try to reap the child a
        // second time.
        let inner = std::mem::replace(&mut self.inner, Inner::Buffer(Cursor::new(Vec::new())));
        match inner {
            Inner::Child { mut child, stdout } => {
                drop(stdout);
                let status = child.wait().map_err(CommandError::Io)?;
                if status.success() {
                    Ok(())
                } else {
                    Err(CommandError::Exit(status.code().unwrap_or(-1)))
                }
            }
            Inner::Buffer(_) => Ok(()),
        }
    }

    /// Drain the whole stream, then finish it.
    pub fn read_all(mut self) -> Result<Vec<u8>, CommandError> {
        let mut bytes = Vec::new();
        if let Err(e) = self.read_to_end(&mut bytes) {
            // Still reap the child so the error path releases the process.
            let _ = self.finish();
            return Err(CommandError::Io(e));
        }
        self.finish()?;
        Ok(bytes)
    }

    /// Drain the stream into newline-separated entries, then finish it.
    ///
    /// Trailing carriage returns are stripped; empty lines are dropped.
    pub fn lines(self) -> Result<Vec<String>, CommandError> {
        let bytes = self.read_all()?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text
            .lines()
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}

impl Read for QueryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Child { stdout, .. } => stdout.read(buf),
            Inner::Buffer(cursor) => cursor.read(buf),
        }
    }
}

impl Drop for QueryStream {
    fn drop(&mut self) {
        if let Inner::Child { child, .. } = &mut self.inner {
            // Reap abandoned children so error paths never leak a zombie.
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
