//! Terminal output formatting and utilities.
//!
//! Consistent formatting across all commands: colors, the download
//! progress line and error rendering.

pub mod colors;
pub mod errors;
pub mod progress;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", self.colors.yellow("warning:"), message);
    }

    /// Print a phase line such as `Resolving 12 dependencies`
    pub fn step(&self, label: &str, message: &str) {
        println!("{:>12} {}", self.colors.green(label), message);
    }

    /// Print a `label: value` summary row
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<11} {}", self.colors.dim(label), value);
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
