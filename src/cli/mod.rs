pub mod accounts;
pub mod categories;
pub mod grid;
pub mod import;
pub mod init;
pub mod login;
pub mod priority;
pub mod session;
pub mod show;
pub mod spend;
pub mod status;
pub mod sync;
pub mod workspace;

use clap::{Parser, Subcommand};

use crate::models::RankingStrategy;

#[derive(Parser)]
#[command(
    name = "cashplan",
    version,
    about = "Plan which cashback categories to activate on each card, synced across devices."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and create the local database.
    Init {
        /// Path for cashplan data (default: ~/Documents/cashplan)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Shared document store file every device can reach
        #[arg(long)]
        store: Option<String>,
    },
    /// Sign in; loads and saves happen only for a signed-in user.
    Login {
        user: String,
    },
    /// Sign out of this device.
    Logout,
    /// Show paths, identity and which months have shared copies.
    Status,
    /// Show the rate grid and the recommended activations.
    Show {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Enter a rate for one category on one account. An empty value clears it.
    Set {
        category: String,
        account: String,
        value: String,
        #[arg(long)]
        month: Option<String>,
    },
    /// Empty the rate grid of a month.
    Clear {
        #[arg(long)]
        month: Option<String>,
    },
    /// Replace a month's grid with the previous month's grid.
    CopyPrev {
        #[arg(long)]
        month: Option<String>,
    },
    /// Fill in sample rates to explore the planner.
    Sample {
        #[arg(long)]
        month: Option<String>,
    },
    /// Import a rate grid from CSV (header: category,<account>,...).
    Import {
        file: String,
        #[arg(long)]
        month: Option<String>,
    },
    /// Manage cards.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage spending categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Manage priority categories.
    Priority {
        #[command(subcommand)]
        command: PriorityCommands,
    },
    /// Manage monthly spend estimates.
    Spend {
        #[command(subcommand)]
        command: SpendCommands,
    },
    /// Choose how offers are ranked.
    Strategy {
        #[arg(value_enum)]
        strategy: RankingStrategy,
    },
    /// Reconcile with the shared copy of a month.
    Sync {
        /// Accept the shared copy even if this device has newer edits
        #[arg(long)]
        force: bool,
        #[arg(long)]
        month: Option<String>,
    },
    /// Delete every shared month of the signed-in user.
    Purge {
        #[arg(long)]
        yes: bool,
    },
    /// Interactive mode with live background sync.
    Session {
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List cards.
    List,
    /// Add a card.
    Add {
        name: String,
        /// How many categories may be activated per month
        #[arg(long = "max", default_value_t = 3)]
        max_categories: u32,
        /// Monthly cashback cap
        #[arg(long)]
        cap: f64,
    },
    /// Change a card's limits.
    Update {
        name: String,
        #[arg(long = "max")]
        max_categories: Option<u32>,
        #[arg(long)]
        cap: Option<f64>,
    },
    /// Rename a card, keeping its rates.
    Rename { from: String, to: String },
    /// Remove a card and its rates.
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List categories.
    List,
    /// Add a category.
    Add { name: String },
    /// Rename a category, keeping its rates and spend estimate.
    Rename { from: String, to: String },
    /// Remove a category and its rates.
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum PriorityCommands {
    /// List priority patterns.
    List,
    /// Mark or unmark a category as priority.
    Toggle { category: String },
}

#[derive(Subcommand)]
pub enum SpendCommands {
    /// List monthly spend estimates.
    List,
    /// Set the monthly spend estimate of a category.
    Set { category: String, amount: f64 },
}
