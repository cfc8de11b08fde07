mod allocator;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod period;
mod priority;
mod reward;
mod settings;
mod state;
mod store;
mod sync;

use clap::Parser;

use cli::{
    AccountsCommands, CategoriesCommands, Cli, Commands, PriorityCommands, SpendCommands,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, store } => cli::init::run(data_dir, store),
        Commands::Login { user } => cli::login::login(&user),
        Commands::Logout => cli::login::logout(),
        Commands::Status => cli::status::run(),
        Commands::Show { month } => cli::show::run(month.as_deref()),
        Commands::Set {
            category,
            account,
            value,
            month,
        } => cli::grid::set(&category, &account, &value, month.as_deref()),
        Commands::Clear { month } => cli::grid::clear(month.as_deref()),
        Commands::CopyPrev { month } => cli::grid::copy_prev(month.as_deref()),
        Commands::Sample { month } => cli::grid::sample(month.as_deref()),
        Commands::Import { file, month } => cli::import::run(&file, month.as_deref()),
        Commands::Accounts { command } => match command {
            AccountsCommands::List => cli::accounts::list(),
            AccountsCommands::Add {
                name,
                max_categories,
                cap,
            } => cli::accounts::add(&name, max_categories, cap),
            AccountsCommands::Update {
                name,
                max_categories,
                cap,
            } => cli::accounts::update(&name, max_categories, cap),
            AccountsCommands::Rename { from, to } => cli::accounts::rename(&from, &to),
            AccountsCommands::Remove { name } => cli::accounts::remove(&name),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::Add { name } => cli::categories::add(&name),
            CategoriesCommands::Rename { from, to } => cli::categories::rename(&from, &to),
            CategoriesCommands::Remove { name } => cli::categories::remove(&name),
        },
        Commands::Priority { command } => match command {
            PriorityCommands::List => cli::priority::list(),
            PriorityCommands::Toggle { category } => cli::priority::toggle(&category),
        },
        Commands::Spend { command } => match command {
            SpendCommands::List => cli::spend::list(),
            SpendCommands::Set { category, amount } => cli::spend::set(&category, amount),
        },
        Commands::Strategy { strategy } => cli::grid::strategy(strategy),
        Commands::Sync { force, month } => cli::sync::run(force, month.as_deref()),
        Commands::Purge { yes } => cli::sync::purge(yes),
        Commands::Session { month } => cli::session::run(month.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
