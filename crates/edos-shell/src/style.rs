//! Colors for shell diagnostics.
//!
//! Messages are painted by role rather than by color so the renderer never
//! handles escape codes directly. `NO_COLOR` turns all painting off.

/// What a piece of output is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Refused commands and quoting errors.
    Error,
    /// Host failures the loop survives.
    Warning,
    /// First line of a multi-line diagnostic.
    Heading,
    /// Supporting lines under a heading.
    Detail,
}

impl Tone {
    fn sgr(self) -> &'static str {
        match self {
            Tone::Error => "\x1b[31m",
            Tone::Warning => "\x1b[33m",
            Tone::Heading => "\x1b[1m",
            Tone::Detail => "\x1b[2m",
        }
    }
}

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    enabled: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self::detect()
    }
}

impl Style {
    /// Colored unless `NO_COLOR` is set.
    pub fn detect() -> Self {
        Self {
            enabled: std::env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn colored() -> Self {
        Self { enabled: true }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn is_colored(&self) -> bool {
        self.enabled
    }

    pub fn paint(&self, tone: Tone, text: &str) -> String {
        if self.enabled {
            format!("{}{text}{RESET}", tone.sgr())
        } else {
            text.to_string()
        }
    }
}
