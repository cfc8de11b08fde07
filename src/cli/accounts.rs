use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;

use super::workspace::Workspace;

pub fn list() -> Result<()> {
    let ws = Workspace::open(None)?;
    let mut table = Table::new();
    table.set_header(vec!["Name", "Max categories", "Cashback cap"]);
    ws.read(|s| {
        for account in s.accounts() {
            table.add_row(vec![
                Cell::new(&account.name),
                Cell::new(account.max_categories),
                Cell::new(money(account.cashback_cap)),
            ]);
        }
    });
    println!("Accounts\n{table}");
    Ok(())
}

pub fn add(name: &str, max_categories: u32, cap: f64) -> Result<()> {
    let ws = Workspace::open(None)?;
    ws.edit(|s| s.add_account(name, max_categories, cap))?;
    println!("Added account: {}", name.trim());
    Ok(())
}

pub fn update(name: &str, max_categories: Option<u32>, cap: Option<f64>) -> Result<()> {
    let ws = Workspace::open(None)?;
    ws.edit(|s| s.update_account(name, max_categories, cap))?;
    println!("Updated account: {name}");
    Ok(())
}

pub fn rename(from: &str, to: &str) -> Result<()> {
    let ws = Workspace::open(None)?;
    ws.edit(|s| s.rename_account(from, to))?;
    println!("Renamed account {from} -> {}", to.trim());
    Ok(())
}

pub fn remove(name: &str) -> Result<()> {
    let ws = Workspace::open(None)?;
    ws.edit(|s| s.remove_account(name))?;
    println!("Removed account: {name}");
    Ok(())
}
