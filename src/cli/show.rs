use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::{money, percent};
use crate::priority::is_priority;
use crate::state::LocalStateStore;

use super::workspace::Workspace;

pub fn run(month: Option<&str>) -> Result<()> {
    let ws = Workspace::open(month)?;
    ws.read(print_plan);
    Ok(())
}

pub fn print_plan(state: &LocalStateStore) {
    print_grid(state);
    print_allocation(state);
}

pub fn print_grid(state: &LocalStateStore) {
    let allocation = state.allocation();
    let mut table = Table::new();
    let mut header = vec![Cell::new("Category")];
    header.extend(state.accounts().iter().map(|a| Cell::new(&a.name)));
    header.push(Cell::new("Spend"));
    table.set_header(header);

    for category in state.categories() {
        let name = if is_priority(category, state.priorities()) {
            format!("* {category}").yellow().bold()
        } else {
            category.normal()
        };
        let mut row = vec![Cell::new(name)];
        for account in state.accounts() {
            let text = match state.cell(category, &account.name) {
                Some(v) if allocation.is_selected(category, &account.name) => v.green().bold(),
                Some(v) => v.normal(),
                None => "".normal(),
            };
            row.push(Cell::new(text));
        }
        let spend = state
            .spending()
            .get(category)
            .map(|s| money(*s))
            .unwrap_or_default();
        row.push(Cell::new(spend));
        table.add_row(row);
    }
    println!("Rates for {}\n{table}", state.active_period().label());
}

pub fn print_allocation(state: &LocalStateStore) {
    let allocation = state.allocation();
    let mut table = Table::new();
    table.set_header(vec!["Account", "Activate", "Reward", "Cap"]);
    for account in &allocation.accounts {
        let picks: Vec<String> = account
            .picks
            .iter()
            .map(|p| {
                let mut line = format!("{} {}", p.category, percent(p.rate));
                if p.spending > 0.0 {
                    line.push_str(&format!(" -> {}", money(p.reward)));
                }
                if p.cap_hit {
                    line.push_str(" (cap)");
                }
                line
            })
            .collect();
        table.add_row(vec![
            Cell::new(format!(
                "{} ({}/{})",
                account.account,
                account.picks.len(),
                account.max_categories
            )),
            Cell::new(if picks.is_empty() {
                "-".to_string()
            } else {
                picks.join("\n")
            }),
            Cell::new(money(account.total_reward)),
            Cell::new(money(account.cashback_cap)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(format!("sum of rates {}", percent(allocation.total_rate))),
        Cell::new(money(allocation.total_reward).bold()),
        Cell::new(""),
    ]);
    println!("Recommended activations ({})\n{table}", state.strategy().label());

    let coverage = format!(
        "Priority categories covered: {}/{}",
        allocation.priority_covered, allocation.priority_total
    );
    if allocation.priority_covered < allocation.priority_total {
        println!("{}", coverage.yellow());
    } else {
        println!("{}", coverage.green());
    }
    for w in &allocation.warnings {
        println!(
            "{}",
            format!(
                "Warning: {} on {} reaches the {} cap",
                w.category,
                w.account,
                money(w.cap)
            )
            .yellow()
        );
    }
}
