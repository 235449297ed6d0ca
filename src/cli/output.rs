//! Colored terminal output honoring verbose and quiet modes.

use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Writes user-facing progress to the terminal.
///
/// Log output (`RUST_LOG`) is separate; this is what the user reads during a
/// normal run.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
    color: ColorChoice,
}

impl OutputManager {
    /// Creates an output manager.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let color = if std::env::var_os("NO_COLOR").is_some() {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Self {
            verbose,
            quiet,
            color,
        }
    }

    /// Returns true in verbose mode.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Returns true in quiet mode.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn write(&self, color: Option<Color>, bold: bool, prefix: &str, message: &str) -> io::Result<()> {
        let mut stdout = StandardStream::stdout(self.color);
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);

        stdout.set_color(&spec)?;
        write!(stdout, "{prefix}")?;
        stdout.reset()?;
        writeln!(stdout, "{message}")
    }

    /// Prints a message only in verbose mode.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if self.verbose && !self.quiet {
            self.write(Some(Color::Cyan), false, "  · ", message)?;
        }
        Ok(())
    }

    /// Prints a progress line.
    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write(Some(Color::Blue), true, "→ ", message)
    }

    /// Prints a success line.
    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write(Some(Color::Green), true, "✓ ", message)
    }

    /// Prints a warning line.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write(Some(Color::Yellow), true, "⚠ ", message)
    }

    /// Prints an error line to stderr. Never suppressed.
    pub fn error(&self, message: &str) -> io::Result<()> {
        let mut stderr = StandardStream::stderr(self.color);
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red)).set_bold(true);

        stderr.set_color(&spec)?;
        write!(stderr, "✗ ")?;
        stderr.reset()?;
        writeln!(stderr, "{message}")
    }

    /// Prints a section header.
    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write(Some(Color::White), true, "", &format!("\n{title}"))
    }

    /// Prints an indented line.
    pub fn indent(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.write(None, false, "    ", message)
    }
}
