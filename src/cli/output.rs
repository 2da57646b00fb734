//! Colored terminal output for image releases
//!
//! Provides consistent, colored CLI output with proper formatting

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn emit(
        &self,
        marker: &str,
        marker_spec: &ColorSpec,
        text_spec: Option<&ColorSpec>,
        message: &str,
    ) {
        if self.quiet {
            return;
        }

        let mut buffer = self.bufwtr.buffer();
        let _ = buffer.set_color(marker_spec);
        let _ = write!(&mut buffer, "{marker}");
        let _ = buffer.reset();
        if let Some(spec) = text_spec {
            let _ = buffer.set_color(spec);
        }
        let _ = writeln!(&mut buffer, " {}", message);
        let _ = buffer.reset();
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print an info message (normal output)
    pub fn info(&self, message: &str) {
        self.emit("ℹ", ColorSpec::new().set_fg(Some(Color::Cyan)), None, message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.emit(
            "✓",
            ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true),
            None,
            message,
        );
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        let mut marker = ColorSpec::new();
        marker.set_fg(Some(Color::Yellow)).set_bold(true);
        let mut text = ColorSpec::new();
        text.set_fg(Some(Color::Yellow));
        self.emit("⚠", &marker, Some(&text), message);
    }

    /// Print an error message (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();

        // Try colored output to stderr
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

    /// Print a verbose/debug message (only in verbose mode)
    pub fn verbose(&self, message: &str) {
        if !self.verbose {
            return;
        }
        let mut marker = ColorSpec::new();
        marker.set_fg(Some(Color::Blue));
        let mut text = ColorSpec::new();
        text.set_fg(Some(Color::White));
        self.emit("→", &marker, Some(&text), message);
    }

    /// Print a progress message with activity indicator
    pub fn progress(&self, message: &str) {
        self.emit("⋯", ColorSpec::new().set_fg(Some(Color::Magenta)), None, message);
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

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) {
        if self.quiet {
            return;
        }

        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "    {}", message);
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.quiet {
            return;
        }

        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "{}", message);
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print a question without trailing newline (always shown, the user must answer it)
    pub fn prompt(&self, question: &str) {
        let mut buffer = self.bufwtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = write!(&mut buffer, "?");
        let _ = buffer.reset();
        let _ = write!(&mut buffer, " {} [y/N]: ", question);
        let _ = self.bufwtr.print(&buffer);
        let _ = std::io::stdout().flush();
    }
}
