//! Small terminal output helpers, in the teacher's astral-style format.

use std::fmt::Display;

use owo_colors::OwoColorize;

pub fn header(version: &str) {
    println!("{} {}", "arbitrex".bold(), version.dimmed());
    println!();
}

pub fn field(label: &str, value: impl Display) {
    println!("  {:<16} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    println!("  {} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    println!("  {} {}", "⚠".yellow(), message);
}

pub fn error(message: &str) {
    eprintln!("  {} {}", "×".red(), message);
}

pub fn section(title: &str) {
    println!();
    println!("{}", title.bold());
}

pub fn positive(value: impl Display) -> String {
    format!("{}", value.to_string().green())
}

pub fn negative(value: impl Display) -> String {
    format!("{}", value.to_string().red())
}

pub fn highlight(value: impl Display) -> String {
    format!("{}", value.to_string().cyan())
}

pub fn muted(value: impl Display) -> String {
    format!("{}", value.to_string().dimmed())
}
