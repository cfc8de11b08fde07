use std::io::Write;

use clap::ValueEnum;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{CashplanError, Result};
use crate::models::RankingStrategy;
use crate::settings::{load_settings, save_settings};
use crate::sync::{SaveOutcome, SyncStatus};

use super::show::{print_allocation, print_grid, print_plan};
use super::spend::parse_amount;
use super::sync::report_load;
use super::workspace::{Coordinator, Workspace};

const HELP: &str = "\
Commands:
  show                          grid and recommendations
  set <category> <account> [v]  enter a rate (no value clears the cell)
  spend <category> <amount>     monthly spend estimate
  priority <category>           toggle a priority category
  strategy by-rate|by-cashback  ranking strategy
  month YYYY-MM                 switch month (unsaved edits are saved first)
  clear | copy-prev | sample    bulk grid edits
  status                        sync state
  login <user> | logout         change the signed-in user
  sync | force                  reload; force accepts the shared copy
  help | quit
Quote names with spaces: set \"Cafes and restaurants\" VTB 5";

enum Flow {
    Continue,
    Quit,
}

pub fn run(month: Option<&str>) -> Result<()> {
    let ws = Workspace::open(month)?;
    let coord = ws.coordinator().clone();
    ws.block_on(async move {
        let mut status = coord.subscribe();
        let watcher = tokio::spawn(async move {
            while status.changed().await.is_ok() {
                let current = *status.borrow_and_update();
                match current {
                    SyncStatus::Idle | SyncStatus::Loading | SyncStatus::Syncing => {}
                    SyncStatus::Error | SyncStatus::Conflict => {
                        eprintln!("{}", format!("[{current}]").red())
                    }
                    _ => eprintln!("{}", format!("[{current}]").dimmed()),
                }
            }
        });

        coord.read(print_plan);
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{}> ", coord.active_period());
            std::io::stdout().flush().ok();
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match dispatch(&coord, &line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => eprintln!("Error: {e}"),
            }
        }

        match coord.flush_on_exit().await {
            Ok(SaveOutcome::Failed(e)) => eprintln!("Error: unsaved edits were not written: {e}"),
            Ok(SaveOutcome::Suppressed) => {
                eprintln!("Unsaved edits were not written: resolve the conflict with `cashplan sync --force`")
            }
            _ => {}
        }
        coord.shutdown();
        watcher.abort();
        Ok::<(), CashplanError>(())
    })
}

async fn dispatch(coord: &Coordinator, line: &str) -> Result<Flow> {
    let words = tokenize(line);
    let args: Vec<&str> = words.iter().map(String::as_str).collect();
    match args.as_slice() {
        [] => {}
        ["quit"] | ["exit"] | ["q"] => return Ok(Flow::Quit),
        ["help"] => println!("{HELP}"),
        ["show"] => coord.read(print_plan),
        ["set", category, account] => {
            coord.set_cell(category, account, "")?;
            coord.read(print_allocation);
        }
        ["set", category, account, value] => {
            coord.set_cell(category, account, value)?;
            coord.read(print_allocation);
        }
        ["spend", category, amount] => {
            let amount = parse_amount(amount)?;
            coord.edit(|s| s.set_spending(category, amount))?;
            coord.read(print_allocation);
        }
        ["priority", category] => {
            let now_priority = coord.edit(|s| Ok(s.toggle_priority(category)))?;
            println!("{category}: {}", if now_priority { "priority" } else { "regular" });
        }
        ["strategy", name] => {
            let strategy = RankingStrategy::from_str(name, true).map_err(CashplanError::Other)?;
            coord.edit(|s| {
                s.set_strategy(strategy);
                Ok(())
            })?;
            coord.read(print_allocation);
        }
        ["month", month] => {
            coord.switch_period(month.parse()?);
            let outcome = coord.load().await;
            report_load(&coord.active_period().label(), &outcome)?;
            coord.read(print_grid);
        }
        ["clear"] => {
            coord.edit(|s| {
                s.clear_period();
                Ok(())
            })?;
        }
        ["copy-prev"] => {
            let from = coord.edit(|s| s.copy_from_previous())?;
            println!("Copied {}", from.label());
        }
        ["sample"] => {
            let written = coord.edit(|s| Ok(s.load_sample()))?;
            println!("Filled in {written} sample rates.");
        }
        ["status"] => {
            let pending = if coord.save_pending() {
                ", saving soon"
            } else if coord.is_dirty() {
                ", unsaved edits"
            } else {
                ""
            };
            println!(
                "{} as {} on device {}: {}{pending}",
                coord.active_period().label(),
                coord.user().as_deref().unwrap_or("nobody"),
                coord.device_id(),
                coord.status()
            );
        }
        ["login", user] => {
            switch_user(coord, Some(user.to_string())).await?;
            println!("Signed in as {user}");
        }
        ["logout"] => {
            switch_user(coord, None).await?;
            println!("Signed out; edits stay on this device until you sign in.");
        }
        ["sync"] => {
            let outcome = coord.load().await;
            report_load(&coord.active_period().label(), &outcome)?;
        }
        ["force"] => {
            let resync = coord.forced_resync().await;
            report_load(&coord.active_period().label(), &resync.load)?;
            if let Some(SaveOutcome::Failed(e)) = resync.save {
                return Err(CashplanError::Save(e));
            }
        }
        _ => println!("Unknown command. Type `help`."),
    }
    Ok(Flow::Continue)
}

/// Flush the outgoing user's edits, then hand the coordinator the new
/// identity and remember it for later runs.
async fn switch_user(coord: &Coordinator, user: Option<String>) -> Result<()> {
    if let SaveOutcome::Failed(e) = coord.flush().await {
        eprintln!("Error: unsaved edits were not written: {e}");
    }
    let mut settings = load_settings();
    settings.user = user.clone();
    save_settings(&settings)?;
    coord.set_user(user);
    Ok(())
}

/// Split on whitespace, keeping double-quoted runs together.
fn tokenize(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    words.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }
    if started {
        words.push(current);
    }
    words
}
