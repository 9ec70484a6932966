use std::path::Path;

use notemark_core::models::SyncInterval;

use crate::commands::common::App;
use crate::error::CliError;

pub async fn run_interval(value: Option<SyncInterval>, db_path: &Path) -> Result<(), CliError> {
    let app = App::open(db_path).await?;
    let mut settings = app.store.load_settings().await?;

    let Some(interval) = value else {
        println!("Sync interval: {}", settings.sync_interval);
        let options = SyncInterval::ALL
            .iter()
            .map(|interval| interval.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!("Available: {options}");
        return Ok(());
    };

    settings.sync_interval = interval;
    app.store.save_settings(&settings).await?;
    println!("Sync interval set to {interval}");
    Ok(())
}
