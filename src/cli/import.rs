use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::importer::{apply_grid, parse_grid};

use super::workspace::Workspace;

pub fn run(file: &str, month: Option<&str>) -> Result<()> {
    let path = Path::new(file);
    let cells = parse_grid(path)?;
    let ws = Workspace::open(month)?;
    let result = ws.edit(|s| apply_grid(s, &cells))?;
    let period = ws.read(|s| s.active_period());

    println!(
        "Imported {} rates into {} from {}",
        result.imported,
        period.label(),
        path.file_name().and_then(|n| n.to_str()).unwrap_or(file)
    );
    if result.unparseable > 0 {
        println!(
            "{}",
            format!("{} cells are not numbers and will be ignored", result.unparseable).yellow()
        );
    }
    if !result.unknown_categories.is_empty() {
        let names: Vec<&str> = result.unknown_categories.iter().map(String::as_str).collect();
        println!("{} {}", "Skipped unknown categories:".yellow(), names.join(", "));
    }
    if !result.unknown_accounts.is_empty() {
        let names: Vec<&str> = result.unknown_accounts.iter().map(String::as_str).collect();
        println!("{} {}", "Skipped unknown accounts:".yellow(), names.join(", "));
    }
    Ok(())
}
