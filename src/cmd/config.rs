use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{StoredConfig, config_file_path};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring supportdesk.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Secrets are stored in the local config file; protect your filesystem accordingly.");
    println!();

    apply_prompt("Discord bot token", &mut cfg.discord_token, true)?;
    apply_prompt("Discord application id", &mut cfg.discord_application_id, false)?;
    apply_prompt(
        "Discord public key (hex, from the developer portal)",
        &mut cfg.discord_public_key,
        false,
    )?;
    apply_prompt("Guild id", &mut cfg.guild_id, false)?;
    apply_prompt(
        "Category id new ticket channels are created under",
        &mut cfg.tickets_category_id,
        false,
    )?;
    apply_prompt("Channel id for the ticket panel", &mut cfg.tickets_channel_id, false)?;
    apply_prompt("Logs channel id for transcripts", &mut cfg.logs_channel_id, false)?;
    apply_prompt("Staff role id", &mut cfg.staff_role_id, false)?;
    apply_prompt(
        "Transcript directory (default ./transcripts)",
        &mut cfg.transcript_dir,
        false,
    )?;
    apply_prompt(
        "Public base URL for transcript links (e.g., https://bot.example.com)",
        &mut cfg.public_base_url,
        false,
    )?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Discord token: {}", mask_secret(&cfg.discord_token));
    println!(
        "Application id: {}",
        display_value(&cfg.discord_application_id)
    );
    println!("Public key: {}", display_value(&cfg.discord_public_key));
    println!("Guild id: {}", display_value(&cfg.guild_id));
    println!(
        "Tickets category id: {}",
        display_value(&cfg.tickets_category_id)
    );
    println!(
        "Tickets panel channel id: {}",
        display_value(&cfg.tickets_channel_id)
    );
    println!("Logs channel id: {}", display_value(&cfg.logs_channel_id));
    println!("Staff role id: {}", display_value(&cfg.staff_role_id));
    println!("Transcript directory: {}", display_value(&cfg.transcript_dir));
    println!("Public base URL: {}", display_value(&cfg.public_base_url));

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
    match prompt(field, target.as_deref(), secret)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match (current, secret) {
        (Some(_), true) => write!(stdout, "{field} [****] (Enter to keep, '-' to clear): ")?,
        (Some(value), false) => {
            write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?
        }
        (None, _) => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();

    if trimmed.is_empty() {
        Ok(PromptAction::Keep)
    } else if trimmed == "-" {
        Ok(PromptAction::Clear)
    } else {
        Ok(PromptAction::Set(trimmed.to_string()))
    }
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.len() > 6 => {
            let prefix = &token[..3];
            let suffix = &token[token.len() - 3..];
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_secrets() {
        assert_eq!(
            mask_secret(&Some("MTAxNzQ.abc.xyz".to_string())),
            "MTA***xyz"
        );
        assert_eq!(mask_secret(&Some("short".to_string())), "***");
        assert_eq!(mask_secret(&None), "<not set>");
    }

    #[test]
    fn blank_values_display_as_unset() {
        assert_eq!(display_value(&Some(String::new())), "<not set>");
        assert_eq!(display_value(&Some("123".to_string())), "123");
    }
}
