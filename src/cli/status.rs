use colored::Colorize;

use crate::db::LocalDb;
use crate::error::Result;
use crate::fmt::timestamp;
use crate::period::Period;
use crate::settings::load_settings;
use crate::store::{DocKey, DocumentStore};

use super::workspace::Workspace;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.local_db_path();

    println!("User:         {}", settings.user.as_deref().unwrap_or("(not signed in)"));
    println!("Data dir:     {}", settings.data_path().display());
    println!("Local DB:     {}", db_path.display());
    println!("Shared store: {}", settings.store_path().display());
    println!(
        "Sync timing:  save after {} ms idle, cell edits after {} ms, conflict window {} ms",
        settings.sync.debounce_ms, settings.sync.immediate_save_ms, settings.sync.conflict_threshold_ms
    );

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `cashplan init` to set up.");
        return Ok(());
    }
    println!("Device:       {}", LocalDb::open(&db_path)?.device_id()?);

    let Some(user) = settings.user.as_deref() else {
        println!();
        println!("Run `cashplan login <user>` to start syncing.");
        return Ok(());
    };

    let ws = Workspace::connect(None)?;
    let coord = ws.coordinator();
    let current = coord.active_period();
    let shared = ws.block_on(coord.remote_periods())?;
    let remote = ws.block_on(coord.store().get(&DocKey::new(user, current)))?;

    println!();
    match (coord.watermark(current)?, &remote) {
        (_, None) => println!("{}: no shared copy yet", current.label()),
        (watermark, Some(doc)) => {
            println!(
                "{}: shared copy from device {} at {}",
                current.label(),
                doc.device_id,
                timestamp(doc.last_modified)
            );
            match watermark {
                Some(w) => println!("Last reconciled here at {}", timestamp(w)),
                None => println!("Never reconciled on this device"),
            }
        }
    }

    let months: Vec<String> = Period::months_of_year(current.year())
        .into_iter()
        .map(|p| {
            let month = format!("{:02}", p.month());
            if shared.contains(&p) {
                month.green().to_string()
            } else {
                month.dimmed().to_string()
            }
        })
        .collect();
    println!("Shared months {}: {}", current.year(), months.join(" "));
    Ok(())
}
