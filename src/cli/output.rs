//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::auth::SessionUser;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Print the signed-in user as a two-column table
pub fn print_user_table(user: &SessionUser) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Field").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let (verified, verified_color) = match user.email_verified() {
        Some(true) => ("yes", Color::Green),
        Some(false) => ("no", Color::Yellow),
        None => ("-", Color::Reset),
    };

    table.add_row(vec![Cell::new("ID"), Cell::new(&user.id)]);
    table.add_row(vec![Cell::new("Email"), Cell::new(&user.email)]);
    table.add_row(vec![
        Cell::new("Name"),
        Cell::new(user.name().unwrap_or("-")),
    ]);
    table.add_row(vec![
        Cell::new("Verified"),
        Cell::new(verified).fg(verified_color),
    ]);

    println!("{table}");
}
