//! Terminal color support detection and formatting.
//!
//! Colors are off when `NO_COLOR` is set or either stream is not a terminal.

use std::env;
use std::io::{self, IsTerminal};

/// Color support detection and formatting
#[derive(Debug, Clone, Copy)]
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    pub fn detect() -> Self {
        Self {
            enabled: Self::should_use_colors(),
        }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    fn should_use_colors() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        io::stderr().is_terminal() && io::stdout().is_terminal()
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    /// Dim/gray
    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_leaves_text_alone() {
        let colors = ColorSupport::disabled();
        assert_eq!(colors.red("boom"), "boom");
        assert_eq!(colors.dim("quiet"), "quiet");
    }

    #[test]
    fn test_enabled_wraps_in_escape_codes() {
        let colors = ColorSupport { enabled: true };
        assert_eq!(colors.green("ok"), "\x1b[32mok\x1b[0m");
    }
}
