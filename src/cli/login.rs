use crate::error::{CashplanError, Result};
use crate::settings::{load_settings, save_settings};

pub fn login(user: &str) -> Result<()> {
    let user = user.trim();
    if user.is_empty() {
        return Err(CashplanError::Other("User name cannot be empty".to_string()));
    }
    let mut settings = load_settings();
    settings.user = Some(user.to_string());
    save_settings(&settings)?;
    println!("Signed in as {user}");
    Ok(())
}

pub fn logout() -> Result<()> {
    let mut settings = load_settings();
    match settings.user.take() {
        Some(user) => {
            save_settings(&settings)?;
            println!("Signed out {user}");
        }
        None => println!("Not signed in."),
    }
    Ok(())
}
