//! Colored terminal output for build progress
//!
//! Provides consistent, colored CLI output with proper formatting. Write
//! failures on the terminal are never fatal to a build, so every method
//! swallows them.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            quiet: self.quiet,
        }
    }
}

impl Default for OutputManager {
    fn default() -> Self {
        Self::new(false)
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            quiet,
        }
    }

    fn emit(&self, marker: Option<(&str, ColorSpec)>, body_color: Option<Color>, message: &str) {
        if self.quiet {
            return;
        }

        let mut buffer = self.bufwtr.buffer();
        if let Some((marker, spec)) = marker {
            let _ = buffer.set_color(&spec);
            let _ = write!(&mut buffer, "{marker}");
            let _ = buffer.reset();
            let _ = write!(&mut buffer, " ");
        }
        if let Some(color) = body_color {
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
        }
        let _ = writeln!(&mut buffer, "{message}");
        let _ = buffer.reset();
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Cyan));
        self.emit(Some(("ℹ", spec)), None, message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Green)).set_bold(true);
        self.emit(Some(("✓", spec)), None, message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Yellow)).set_bold(true);
        self.emit(Some(("⚠", spec)), Some(Color::Yellow), message);
    }

    /// Print an error message (always shown, on stderr)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        if buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true)).is_err()
            || write!(&mut buffer, "✗").is_err()
            || buffer.reset().is_err()
            || buffer.set_color(ColorSpec::new().set_fg(Some(Color::Red))).is_err()
            || writeln!(&mut buffer, " {}", message).is_err()
            || buffer.reset().is_err()
            || bufwtr.print(&buffer).is_err()
        {
            // Stderr failed - fallback to stdout as last resort
            println!("[STDERR ERROR] ✗ {}", message);
        }
    }

    /// Print a progress message
    pub fn progress(&self, message: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Magenta));
        self.emit(Some(("⋯", spec)), None, message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }

        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(&mut buffer, "═══ {} ═══", title);
        let _ = buffer.reset();
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print indented text (streamed tool output, sub-items)
    pub fn indent(&self, message: &str) {
        self.emit(None, None, &format!("    {message}"));
    }

    /// Print a plain message
    pub fn println(&self, message: &str) {
        self.emit(None, None, message);
    }
}
