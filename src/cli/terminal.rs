//! Colour styling for command output.
//!
//! Styling is applied only when stdout supports colour; `NO_COLOR` and
//! non-terminal output yield plain text.

use std::sync::LazyLock;

use owo_colors::{OwoColorize, colors::css};

static COLOR_ENABLED: LazyLock<bool> =
    LazyLock::new(|| supports_color::on(supports_color::Stream::Stdout).is_some());

fn paint(text: &str, style: impl FnOnce(&str) -> String) -> String {
    if *COLOR_ENABLED {
        style(text)
    } else {
        text.to_string()
    }
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Green, for completed writes and equal comparisons
    fn success(&self) -> String;
    /// Amber, for differing properties
    fn warning(&self) -> String;
    /// Blue, for property names
    fn info(&self) -> String;
    /// Dimmed, for absent or unchanged values
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Green>().to_string())
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Orange>().to_string())
    }

    fn info(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::LightBlue>().to_string())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), |s| s.dimmed().to_string())
    }
}
