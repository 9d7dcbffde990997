//! Status renderers.

use std::io::{self, Write};

use protocol::{Role, SecurityLevel};
use tracing::info;

use crate::ports::StatusRenderer;

/// Formats the text shown by a status flash.
pub fn status_text(role: Role, level: SecurityLevel) -> String {
    format!("{} {} L{}", role.label(), level, level.number())
}

/// Emits every rendered line as a structured `tracing` event.
#[derive(Debug, Clone, Copy)]
pub struct TracingRenderer {
    role: Role,
}

impl TracingRenderer {
    pub fn new(role: Role) -> Self {
        Self { role }
    }
}

impl StatusRenderer for TracingRenderer {
    fn render_line(&mut self, text: &str) {
        info!(role = %self.role, text = %text, "Display");
    }

    fn flash_status(&mut self, role: Role, level: SecurityLevel) {
        info!(role = %role, level = %level, "Status");
    }
}

/// Writes lines to stdout prefixed with the role label.
///
/// Write failures are ignored; the display is informational only.
pub struct ConsoleRenderer {
    role: Role,
    out: Box<dyn Write + Send>,
}

impl ConsoleRenderer {
    /// Creates a renderer writing to stdout.
    pub fn stdout(role: Role) -> Self {
        Self::with_writer(role, Box::new(io::stdout()))
    }

    /// Creates a renderer writing to any sink.
    pub fn with_writer(role: Role, out: Box<dyn Write + Send>) -> Self {
        Self { role, out }
    }

    fn write(&mut self, text: &str) {
        let _ = writeln!(self.out, "[{}] {}", self.role.label(), text);
        let _ = self.out.flush();
    }
}

impl StatusRenderer for ConsoleRenderer {
    fn render_line(&mut self, text: &str) {
        self.write(text);
    }

    fn flash_status(&mut self, role: Role, level: SecurityLevel) {
        let text = format!("== {} ==", status_text(role, level));
        self.write(&text);
    }
}

/// Keeps everything rendered in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    lines: Vec<String>,
    flashes: Vec<(Role, SecurityLevel)>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered lines, oldest first.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Status flashes, oldest first.
    pub fn flashes(&self) -> &[(Role, SecurityLevel)] {
        &self.flashes
    }

    /// Whether any rendered line equals `text`.
    pub fn contains(&self, text: &str) -> bool {
        self.lines.iter().any(|l| l == text)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.flashes.clear();
    }
}

impl StatusRenderer for RecordingRenderer {
    fn render_line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn flash_status(&mut self, role: Role, level: SecurityLevel) {
        self.flashes.push((role, level));
    }
}
