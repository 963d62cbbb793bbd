// Terminal UI utilities
// This module can be expanded with custom widgets, tables, etc.

use std::io::Write;

use colored::Colorize;

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// Prompt for a yes/no confirmation on stdin.
///
/// Empty input counts as "yes"; anything other than y/yes cancels.
pub fn confirm(prompt: &str) -> std::io::Result<bool> {
    print!("{} [Y/n] ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(parse_confirmation(&input))
}

/// Prompt for a free-form answer on stdin.
pub fn ask(prompt: &str) -> std::io::Result<String> {
    print!("{} ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_string())
}

/// Prompt for a yes/no confirmation that defaults to "no".
///
/// Used before destructive operations; only an explicit y/yes proceeds.
pub fn confirm_destructive(prompt: &str) -> std::io::Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(parse_strict_confirmation(&input))
}

pub fn parse_confirmation(input: &str) -> bool {
    let answer = input.trim().to_lowercase();
    answer.is_empty() || answer == "y" || answer == "yes"
}

pub fn parse_strict_confirmation(input: &str) -> bool {
    let answer = input.trim().to_lowercase();
    answer == "y" || answer == "yes"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirmation() {
        assert!(parse_confirmation("y\n"));
        assert!(parse_confirmation("YES\n"));
        assert!(parse_confirmation("\n"));
        assert!(!parse_confirmation("n\n"));
        assert!(!parse_confirmation("nope\n"));
    }

    #[test]
    fn test_parse_strict_confirmation_defaults_to_no() {
        assert!(parse_strict_confirmation("y\n"));
        assert!(parse_strict_confirmation("Yes\n"));
        assert!(!parse_strict_confirmation("\n"));
        assert!(!parse_strict_confirmation("n\n"));
    }
}
