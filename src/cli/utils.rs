//! Shared CLI utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// Stderr spinner; hidden automatically when stderr is not a terminal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(spinner_style);
    }
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Report an error without aborting the command.
pub fn print_soft_error(context: &str, err: &dyn std::fmt::Display) {
    eprintln!("{} {context}: {err}", style("Error:").red().bold());
}

pub fn print_heading(text: &str) {
    println!("{}", style(text).bold().underlined());
}

/// `1234567` -> `1,234,567`
pub fn format_with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_is_trimmed_and_empty_parts_dropped() {
        let parsed = parse_csv(&Some(" py, ,ipynb ,".to_string())).expect("some");
        assert_eq!(parsed, vec!["py", "ipynb"]);
        assert!(parse_csv(&None).is_none());
    }

    #[test]
    fn commas_group_thousands() {
        assert_eq!(format_with_commas(0), "0");
        assert_eq!(format_with_commas(999), "999");
        assert_eq!(format_with_commas(1_000), "1,000");
        assert_eq!(format_with_commas(1_234_567), "1,234,567");
    }
}
