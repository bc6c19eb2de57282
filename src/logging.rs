//! Diagnostics and optional transcript logging.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Output goes to stderr so that
/// diagnostics never interleave with the chat transcript on stdout. Verbosity
/// follows `SEEKCHAT_LOG` (e.g. `SEEKCHAT_LOG=seekchat=debug`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("SEEKCHAT_LOG")
        .unwrap_or_else(|_| EnvFilter::new("seekchat=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Appends finished turns to a plain-text transcript file when enabled.
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
}

impl TranscriptLog {
    pub fn new(file_path: Option<PathBuf>) -> Self {
        Self { file_path }
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    /// Write one message, preserving its line structure, followed by a blank
    /// separator line. A no-op when no transcript file was configured.
    pub fn log_message(&self, content: &str) -> std::io::Result<()> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for line in content.lines() {
            writeln!(file, "{}", line)?;
        }
        writeln!(file)?;
        file.flush()
    }
}
