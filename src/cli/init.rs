use crate::db::LocalDb;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path, Settings};
use crate::store::SqliteStore;

pub fn run(data_dir: Option<String>, store: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    let defaults = Settings::default();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if settings.data_dir == defaults.data_dir && settings.user.is_none() {
        // First run: ask where to keep things
        let default = &settings.data_dir;
        println!("Data directory [{}]: ", default);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).ok();
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }
    if let Some(store) = store {
        settings.store_path = Some(shellexpand_path(&store));
    }

    save_settings(&settings)?;

    let data_path = settings.data_path();
    std::fs::create_dir_all(&data_path)?;
    let device_id = LocalDb::open(&settings.local_db_path())?.device_id()?;
    SqliteStore::open(&settings.store_path())?;

    println!("Initialized cashplan at {}", data_path.display());
    println!("Shared store: {}", settings.store_path().display());
    println!("Device:       {device_id}");
    Ok(())
}
