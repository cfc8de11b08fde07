use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{CashplanError, Result};
use crate::fmt::money;
use crate::priority::is_priority;

use super::workspace::Workspace;

pub fn list() -> Result<()> {
    let ws = Workspace::open(None)?;
    let mut table = Table::new();
    table.set_header(vec!["Category", "Priority", "Spend"]);
    ws.read(|s| {
        for category in s.categories() {
            let priority = if is_priority(category, s.priorities()) {
                "yes".yellow().to_string()
            } else {
                String::new()
            };
            let spend = s.spending().get(category).map(|v| money(*v)).unwrap_or_default();
            table.add_row(vec![Cell::new(category), Cell::new(priority), Cell::new(spend)]);
        }
    });
    println!("Categories\n{table}");
    Ok(())
}

pub fn add(name: &str) -> Result<()> {
    let ws = Workspace::open(None)?;
    let added = ws.edit(|s| Ok(s.add_category(name)))?;
    if !added {
        return Err(CashplanError::Other(format!(
            "Category {:?} is empty or already exists",
            name.trim()
        )));
    }
    println!("Added category: {}", name.trim());
    Ok(())
}

pub fn rename(from: &str, to: &str) -> Result<()> {
    let ws = Workspace::open(None)?;
    ws.edit(|s| s.rename_category(from, to))?;
    println!("Renamed category {from} -> {}", to.trim());
    Ok(())
}

pub fn remove(name: &str) -> Result<()> {
    let ws = Workspace::open(None)?;
    ws.edit(|s| s.remove_category(name))?;
    println!("Removed category: {name}");
    Ok(())
}
