// src/utils/streams.rs
use anyhow::{anyhow, Result};
use futures::join;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStream {
    Stdout,
    Stderr,
}

/// Exit code and captured text of a finished child process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedOutput {
    pub code: Option<i32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last non-blank stderr line, the usual place a tool reports why it failed.
    pub fn last_error_line(&self) -> Option<&str> {
        self.stderr
            .iter()
            .rev()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }
}


/// Drains stdout and stderr together, then waits for the child to exit.
/// The child is always awaited, even when reading one of its streams fails.
///
/// # Arguments
///
/// * `child` - Spawned child with stdout and stderr piped.
///
/// # Returns
/// CapturedOutput with exit code and both streams.
pub async fn wait_with_captured_output(mut child: Child) -> Result<CapturedOutput> {
    let stdout = child.stdout.take().ok_or_else(|| anyhow!("Child stdout not captured"))?;
    let stderr = child.stderr.take().ok_or_else(|| anyhow!("Child stderr not captured"))?;

    let (stdout, stderr) = join!(collect_lines(stdout), collect_lines(stderr));
    let status = child.wait().await?;

    Ok(CapturedOutput {
        code: status.code(),
        stdout: stdout?,
        stderr: stderr?,
    })
}


/// Splits a stream on `\n`. Tools are not bound to UTF-8, so invalid bytes
/// are replaced rather than rejected.
async fn collect_lines<R>(reader: R) -> Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut segments = SplitStream::new(BufReader::new(reader).split(b'\n'));
    let mut out = Vec::new();
    while let Some(segment) = segments.next().await {
        let segment = segment?;
        let line = segment.strip_suffix(b"\r").unwrap_or(&segment[..]);
        out.push(String::from_utf8_lossy(line).into_owned());
    }
    Ok(out)
}
