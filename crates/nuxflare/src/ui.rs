use std::fmt::Display;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};
use owo_colors::OwoColorize;

/// Print a command heading.
pub(crate) fn intro(message: impl Display) {
    println!("{}  {}", "┌".dimmed(), message.bold());
}

/// Print a progress step.
pub(crate) fn step(message: impl Display) {
    println!("{}  {}", "◇".green(), message);
}

/// Print an informational message.
pub(crate) fn info(message: impl Display) {
    println!("{}  {}", "●".blue(), message);
}

/// Print a success message.
pub(crate) fn success(message: impl Display) {
    println!("{}  {}", "◆".green(), message);
}

/// Print a warning.
pub(crate) fn warn(message: impl Display) {
    eprintln!("{}  {}", "▲".yellow(), message.yellow());
}

/// Print an error.
pub(crate) fn error(message: impl Display) {
    eprintln!("{}  {}", "■".red(), message.red());
}

/// Print a cancellation notice.
pub(crate) fn cancel(message: impl Display) {
    eprintln!("{}  {}", "└".red(), message.red());
}

/// Print a titled block of lines.
pub(crate) fn note(title: impl Display, lines: &[String]) {
    println!("{}  {}", "◇".green(), title.bold());

    for line in lines {
        println!("{}  {}", "│".dimmed(), line);
    }

    println!("{}", "└".dimmed());
}

/// Highlight a command, path or URL inside of a message.
pub(crate) fn highlight(text: impl Display) -> String {
    text.cyan().to_string()
}

/// Ask a yes/no question.
pub(crate) fn confirm(prompt: impl Into<String>, default: bool) -> Result<bool, dialoguer::Error> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()
}

/// Ask for a line of text, optionally pre-filled with `initial`.
pub(crate) fn input(
    prompt: impl Into<String>,
    initial: Option<String>,
) -> Result<String, dialoguer::Error> {
    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme)
        .with_prompt(prompt)
        .allow_empty(true);

    if let Some(initial) = initial {
        input = input.default(initial);
    }

    input.interact_text().map(|value| value.trim().to_owned())
}

/// Ask for a secret value, rejecting empty input.
pub(crate) fn password(prompt: impl Into<String>) -> Result<String, dialoguer::Error> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .validate_with(|value: &String| -> Result<(), &str> {
            if value.trim().is_empty() {
                Err("Token is required")
            } else {
                Ok(())
            }
        })
        .interact()
        .map(|value| value.trim().to_owned())
}

/// Ask to pick one of `items`, returning the selected index.
pub(crate) fn select<T: ToString>(
    prompt: impl Into<String>,
    items: &[T],
    default: usize,
) -> Result<usize, dialoguer::Error> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(default)
        .interact()
}
