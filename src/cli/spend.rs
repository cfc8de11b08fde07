use comfy_table::{Cell, Table};

use crate::error::{CashplanError, Result};
use crate::fmt::money;

use super::workspace::Workspace;

pub fn list() -> Result<()> {
    let ws = Workspace::open(None)?;
    let mut table = Table::new();
    table.set_header(vec!["Category", "Monthly spend"]);
    let total = ws.read(|s| {
        for (category, amount) in s.spending() {
            table.add_row(vec![Cell::new(category), Cell::new(money(*amount))]);
        }
        s.spending().values().sum::<f64>()
    });
    println!("Spend estimates\n{table}");
    println!("Total: {}", money(total));
    Ok(())
}

pub fn set(category: &str, amount: f64) -> Result<()> {
    let ws = Workspace::open(None)?;
    ws.edit(|s| s.set_spending(category, amount))?;
    println!("{category}: {}", money(amount));
    Ok(())
}

/// Amount typed in interactive mode. Spaces and underscores group digits.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, ' ' | '_')).collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| CashplanError::Other(format!("Invalid amount: {raw}")))
}
