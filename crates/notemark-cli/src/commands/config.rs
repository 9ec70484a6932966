use notemark_core::config::normalize_api_base_url;
use notemark_core::remote::validate_email;
use notemark_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::cli_config::CliConfig;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_url,
            user_email,
        } => {
            let mut config = CliConfig::load().map_err(CliError::Config)?;
            apply_config_init(&mut config, api_url, user_email)?;
            let path = config.save().map_err(CliError::Config)?;
            println!("Saved CLI config to {}", path.display());
            println!(
                "API: {}",
                config
                    .client_config()
                    .map_err(CliError::Config)?
                    .api_base_url
            );
            Ok(())
        }
    }
}

/// Merge explicit `config init` values into an existing config.
pub fn apply_config_init(
    config: &mut CliConfig,
    api_url: Option<String>,
    user_email: Option<String>,
) -> Result<(), CliError> {
    if let Some(url) = normalize_text_option(api_url) {
        config.api_base_url = Some(normalize_api_base_url(&url).map_err(CliError::Config)?);
    }
    if let Some(email) = normalize_text_option(user_email) {
        validate_email(&email)?;
        config.user_email = Some(email);
    }
    Ok(())
}
