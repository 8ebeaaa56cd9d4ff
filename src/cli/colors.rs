//! Terminal colors for human output

use std::io::IsTerminal;

use colored::{ColoredString, Colorize};

use crate::core::DistributionStatus;

/// Turn colors on or off for both `colored` and `console`.
///
/// Colors stay off when stdout is not a terminal, whatever the config says.
pub fn apply_preference(enabled: bool) {
    let enabled = enabled && std::io::stdout().is_terminal();
    colored::control::set_override(enabled);
    console::set_colors_enabled(enabled);
}

#[must_use]
pub fn status(status: DistributionStatus) -> ColoredString {
    match status {
        DistributionStatus::Success => status.as_str().green().bold(),
        DistributionStatus::NoChanges => status.as_str().yellow(),
        DistributionStatus::Failure => status.as_str().red().bold(),
    }
}

#[must_use]
pub fn dim(text: &str) -> ColoredString {
    text.dimmed()
}
