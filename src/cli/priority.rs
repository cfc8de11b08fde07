use crate::error::Result;

use super::workspace::Workspace;

pub fn list() -> Result<()> {
    let ws = Workspace::open(None)?;
    let patterns = ws.read(|s| s.priorities().to_vec());
    if patterns.is_empty() {
        println!("No priority categories.");
    }
    for pattern in patterns {
        println!("{pattern}");
    }
    Ok(())
}

pub fn toggle(category: &str) -> Result<()> {
    let ws = Workspace::open(None)?;
    let now_priority = ws.edit(|s| Ok(s.toggle_priority(category)))?;
    if now_priority {
        println!("{category} is now a priority category");
    } else {
        println!("{category} is no longer a priority category");
    }
    Ok(())
}
