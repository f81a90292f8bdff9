// src/utils/logging.rs: per-run log context
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use log::{error, info, warn, Level};

use crate::utils::streams::ChildStream;


/// Append-only run log. Every message goes to the `log` facade and to the sink,
/// so console output and the run's log file carry the same lines.
pub struct RunLog {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl RunLog {
    /// Opens (or creates) the run log file in append mode.
    pub fn to_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
        }
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Self::with_sink(file))
    }

    pub fn with_sink<W: Write + Send + 'static>(sink: W) -> Self {
        RunLog { sink: Mutex::new(Box::new(sink)) }
    }

    pub fn info<S: AsRef<str>>(&self, msg: S) {
        info!("{}", msg.as_ref());
        self.append(Level::Info, msg.as_ref());
    }

    pub fn warn<S: AsRef<str>>(&self, msg: S) {
        warn!("{}", msg.as_ref());
        self.append(Level::Warn, msg.as_ref());
    }

    pub fn error<S: AsRef<str>>(&self, msg: S) {
        error!("{}", msg.as_ref());
        self.append(Level::Error, msg.as_ref());
    }

    /// Records captured child output. Empty streams are skipped.
    pub fn tool_output(&self, tool: &str, stream: ChildStream, lines: &[String]) {
        if lines.iter().all(|l| l.trim().is_empty()) {
            return;
        }
        let label = match stream {
            ChildStream::Stdout => "stdout",
            ChildStream::Stderr => "stderr",
        };
        self.info(format!("[{}] {}:\n{}", tool, label, lines.join("\n")));
    }

    fn append(&self, level: Level, msg: &str) {
        let line = format!(
            "[{}] {}: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            msg
        );
        match self.sink.lock() {
            Ok(mut sink) => {
                if let Err(e) = sink.write_all(line.as_bytes()).and_then(|_| sink.flush()) {
                    eprintln!("Failed to write to run log: {}", e);
                }
            }
            Err(_) => eprintln!("Run log poisoned; dropping message: {}", msg),
        }
    }
}


/// Clonable in-memory sink, for capturing a run log without touching disk.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "shared buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
