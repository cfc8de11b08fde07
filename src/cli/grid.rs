use crate::error::Result;

use super::workspace::Workspace;

pub fn set(category: &str, account: &str, value: &str, month: Option<&str>) -> Result<()> {
    let ws = Workspace::open(month)?;
    ws.edit(|s| s.set_cell(category, account, value))?;
    let chosen = ws.read(|s| s.allocation().account_for(category).map(String::from));
    if value.trim().is_empty() {
        println!("Cleared {category} / {account}");
    } else {
        match chosen.as_deref() {
            Some(a) if a == account => println!("{category} / {account} = {} (recommended)", value.trim()),
            Some(other) => println!("{category} / {account} = {} (activate on {other} instead)", value.trim()),
            None => println!("{category} / {account} = {}", value.trim()),
        }
    }
    Ok(())
}

pub fn clear(month: Option<&str>) -> Result<()> {
    let ws = Workspace::open(month)?;
    ws.edit(|s| {
        s.clear_period();
        Ok(())
    })?;
    println!("Cleared rates for {}", ws.read(|s| s.active_period().label()));
    Ok(())
}

pub fn copy_prev(month: Option<&str>) -> Result<()> {
    let ws = Workspace::open(month)?;
    // The previous month's grid has to be known locally before copying.
    let (current, previous) = ws.read(|s| (s.active_period(), s.active_period().predecessor()));
    if let Some(previous) = previous {
        let coord = ws.coordinator();
        ws.block_on(async {
            coord.switch_period(previous);
            coord.load().await;
            coord.switch_period(current);
            coord.load().await;
        });
    }
    let from = ws.edit(|s| s.copy_from_previous())?;
    let copied = ws.read(|s| {
        s.grid(current)
            .map(|g| g.values().map(|row| row.len()).sum::<usize>())
            .unwrap_or(0)
    });
    println!(
        "Copied {copied} rates from {} into {}",
        from.label(),
        current.label()
    );
    Ok(())
}

pub fn sample(month: Option<&str>) -> Result<()> {
    let ws = Workspace::open(month)?;
    let written = ws.edit(|s| Ok(s.load_sample()))?;
    println!("Filled in {written} sample rates.");
    Ok(())
}

pub fn strategy(strategy: crate::models::RankingStrategy) -> Result<()> {
    let ws = Workspace::open(None)?;
    ws.edit(|s| {
        s.set_strategy(strategy);
        Ok(())
    })?;
    println!("Ranking offers {}", strategy.label());
    Ok(())
}
