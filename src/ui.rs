//! Terminal status lines.
//!
//! Progress goes to stdout as cargo-style `   Verb message` lines; warnings
//! and errors go to stderr.

use crossterm::style::Stylize;
use std::fmt::Display;

const LABEL_WIDTH: usize = 12;

/// Progress line with a green, right-aligned verb.
pub fn step(verb: &str, message: impl Display) {
    println!(
        "{} {}",
        format!("{:>width$}", verb, width = LABEL_WIDTH).green().bold(),
        message
    );
}

/// Final line of a successful command.
pub fn success(message: impl Display) {
    println!(
        "{} {}",
        format!("{:>width$}", "Finished", width = LABEL_WIDTH)
            .green()
            .bold(),
        message.to_string().green()
    );
}

pub fn warn(message: impl Display) {
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}

pub fn error(message: impl Display) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// `  Label:       value` row for key/value reports.
pub fn field(label: &str, value: impl Display) {
    println!(
        "  {} {}",
        format!("{:<14}", format!("{}:", label)).dark_grey(),
        value.to_string().white()
    );
}

/// Human readable byte count, e.g. `12.3 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
