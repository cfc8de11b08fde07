use colored::Colorize;

use crate::error::{CashplanError, Result};
use crate::fmt::timestamp;
use crate::sync::{LoadOutcome, SaveOutcome};

use super::workspace::Workspace;

pub fn run(force: bool, month: Option<&str>) -> Result<()> {
    let ws = Workspace::connect(month)?;
    let coord = ws.coordinator();
    let label = coord.active_period().label();

    if force {
        let resync = ws.block_on(coord.forced_resync());
        report_load(&label, &resync.load)?;
        return match resync.save {
            Some(SaveOutcome::Saved(ts)) => {
                println!("{} {label} at {}", "Published".green(), timestamp(ts));
                Ok(())
            }
            Some(SaveOutcome::Failed(e)) => Err(CashplanError::Save(e)),
            _ => Ok(()),
        };
    }

    let outcome = ws.load()?;
    report_load(&label, &outcome)?;
    if outcome == LoadOutcome::Absent {
        // First device to touch this month publishes its copy.
        match ws.block_on(coord.save()) {
            SaveOutcome::Saved(ts) => println!("{} {label} at {}", "Published".green(), timestamp(ts)),
            SaveOutcome::Failed(e) => return Err(CashplanError::Save(e)),
            _ => {}
        }
    }
    Ok(())
}

pub(crate) fn report_load(label: &str, outcome: &LoadOutcome) -> Result<()> {
    match outcome {
        LoadOutcome::Applied(ts) => println!("{} {label} from {}", "Loaded".green(), timestamp(*ts)),
        LoadOutcome::Absent => println!("No shared copy of {label} yet"),
        LoadOutcome::Conflict { local, remote } => println!(
            "{} {label}: this device saved at {}, shared copy is from {}",
            "Conflict".red().bold(),
            timestamp(*local),
            timestamp(*remote)
        ),
        LoadOutcome::Failed(e) => return Err(CashplanError::Load(e.clone())),
        LoadOutcome::Stale | LoadOutcome::Inert => {}
    }
    Ok(())
}

pub fn purge(yes: bool) -> Result<()> {
    if !yes {
        return Err(CashplanError::Other(
            "This deletes every shared month for the signed-in user. Re-run with --yes to confirm."
                .to_string(),
        ));
    }
    let ws = Workspace::connect(None)?;
    let removed = ws.block_on(ws.coordinator().purge_all())?;
    println!("Deleted {removed} shared months.");
    Ok(())
}
