use std::path::Path;

use notemark_core::remote::AuthClient;

use crate::cli::AuthCommands;
use crate::commands::common::{format_timestamp, App};
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, db_path: &Path) -> Result<(), CliError> {
    let app = App::open(db_path).await?;
    match command {
        AuthCommands::Register {
            username,
            email,
            password,
        } => {
            let auth = AuthClient::new(app.client_config.clone())?;
            auth.register(&username, &email, &password).await?;
            println!("Registered {email}. Run `notemark auth login` to sign in.");
            Ok(())
        }
        AuthCommands::Login { email, password } => run_login(&app, &email, &password).await,
        AuthCommands::Logout { force } => run_logout(&app, force).await,
        AuthCommands::Status => run_status(&app).await,
    }
}

async fn run_login(app: &App, email: &str, password: &str) -> Result<(), CliError> {
    let auth = AuthClient::new(app.client_config.clone())?;
    let session = auth.login(email, password).await?;

    if let Some(previous) = app.session.current() {
        if previous.user_id != session.user_id {
            tracing::info!("Switching account; clearing local data of {}", previous.user_id);
            app.reconciler.clear_account_data().await?;
        }
    }

    app.store.save_session(&session).await?;
    app.session.begin(session.clone());
    println!("Signed in as {} ({})", session.username, session.user_id);

    if app.store.count_notes().await? == 0 {
        match app.reconciler.pull_remote().await {
            Ok(0) => {}
            Ok(count) => println!("Downloaded {count} note(s)"),
            Err(error) => {
                tracing::warn!("Initial download failed: {error}");
                println!("Could not download notes yet; they will appear after a later sign-in.");
            }
        }
    }
    Ok(())
}

pub async fn run_logout(app: &App, force: bool) -> Result<(), CliError> {
    // Records may outlive the session that wrote them.
    let outstanding = app.store.count_journal_records().await?;
    if outstanding > 0 && !force {
        return Err(CliError::UnsyncedChanges(outstanding));
    }

    app.session.end();
    app.store.clear_session().await?;
    app.reconciler.clear_account_data().await?;
    println!("Signed out");
    Ok(())
}

pub async fn run_status(app: &App) -> Result<(), CliError> {
    let Some(session) = app.session.current() else {
        println!("Not signed in.");
        return Ok(());
    };

    let summary = app.reconciler.journal_summary().await?;
    let last_sync = app
        .reconciler
        .last_sync_at()
        .await?
        .map_or_else(|| "never".to_string(), format_timestamp);
    let interval = app.store.load_settings().await?.sync_interval;

    println!("Signed in as {} ({})", session.username, session.user_id);
    println!("Server: {}", app.client_config.api_base_url);
    println!(
        "Pending changes: {} ({} dead-lettered)",
        summary.total(),
        summary.dead
    );
    println!("Last sync: {last_sync}");
    println!("Sync interval: {interval}");
    Ok(())
}
