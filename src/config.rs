use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChannelId, GuildId, RoleId};
use crate::error::{AppError, AppResult};

const CONFIG_DIR_NAME: &str = "supportdesk";
const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DELETE_DELAY_SECS: u64 = 4;

/// Values persisted by `config init`; every field can be overridden from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfig {
    pub discord_token: Option<String>,
    pub discord_application_id: Option<String>,
    pub discord_public_key: Option<String>,
    pub guild_id: Option<String>,
    pub tickets_category_id: Option<String>,
    pub tickets_channel_id: Option<String>,
    pub logs_channel_id: Option<String>,
    pub staff_role_id: Option<String>,
    pub transcript_dir: Option<String>,
    pub public_base_url: Option<String>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        let path = config_file_path()?;
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        let path = config_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(&path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    if let Ok(dir) = env::var("SUPPORTDESK_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| AppError::Configuration("cannot locate a config directory".to_string()))
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: Option<String>,
    pub application_id: Option<String>,
    pub public_key: Option<String>,
    pub api_base: String,
    pub guild_id: Option<String>,
    pub tickets_category_id: Option<String>,
    pub tickets_channel_id: Option<String>,
    pub logs_channel_id: Option<String>,
    pub staff_role_id: Option<String>,
    pub transcript_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub data_dir: PathBuf,
    pub port: u16,
    pub delete_delay: Duration,
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        // a missing .env file is fine
        let _ = dotenvy::dotenv();
        let stored = StoredConfig::load()?;
        let data_dir = config_directory()?;
        Self::resolve(stored, data_dir, |key| env::var(key).ok())
    }

    pub fn resolve(
        stored: StoredConfig,
        default_data_dir: PathBuf,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let pick = |key: &str, fallback: Option<String>| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .or(fallback)
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| AppError::Configuration(format!("invalid PORT '{raw}'")))?,
            None => DEFAULT_PORT,
        };
        let delete_delay_secs = match lookup("TICKET_DELETE_DELAY_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Configuration(format!("invalid TICKET_DELETE_DELAY_SECS '{raw}'"))
            })?,
            None => DEFAULT_DELETE_DELAY_SECS,
        };

        let transcript_dir = pick("TRANSCRIPT_DIR", stored.transcript_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("transcripts"));
        let public_base_url = pick("PUBLIC_BASE_URL", stored.public_base_url)
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        let data_dir = pick("SUPPORTDESK_DATA_DIR", None)
            .map(PathBuf::from)
            .unwrap_or(default_data_dir);

        Ok(Self {
            discord_token: pick("DISCORD_TOKEN", stored.discord_token),
            application_id: pick("DISCORD_APPLICATION_ID", stored.discord_application_id),
            public_key: pick("DISCORD_PUBLIC_KEY", stored.discord_public_key),
            api_base: pick("DISCORD_API_BASE", None).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            guild_id: pick("GUILD_ID", stored.guild_id),
            tickets_category_id: pick("TICKETS_CATEGORY_ID", stored.tickets_category_id),
            tickets_channel_id: pick("TICKETS_CHANNEL_ID", stored.tickets_channel_id),
            logs_channel_id: pick("TICKETS_LOGS_CHANNEL_ID", stored.logs_channel_id),
            staff_role_id: pick("STAFF_ROLE_ID", stored.staff_role_id),
            transcript_dir,
            public_base_url,
            data_dir,
            port,
            delete_delay: Duration::from_secs(delete_delay_secs),
        })
    }

    pub fn support_settings(&self) -> AppResult<SupportSettings> {
        Ok(SupportSettings {
            guild_id: required(&self.guild_id, "GUILD_ID")?.parse()?,
            tickets_category_id: required(&self.tickets_category_id, "TICKETS_CATEGORY_ID")?
                .parse()?,
            logs_channel_id: required(&self.logs_channel_id, "TICKETS_LOGS_CHANNEL_ID")?.parse()?,
            staff_role_id: required(&self.staff_role_id, "STAFF_ROLE_ID")?.parse()?,
            panel_channel_id: self
                .tickets_channel_id
                .as_deref()
                .map(str::parse::<ChannelId>)
                .transpose()?,
            delete_delay: self.delete_delay,
        })
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> AppResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| AppError::Configuration(format!("{key} not configured")))
}

/// The validated subset of configuration the ticket workflows depend on.
#[derive(Debug, Clone)]
pub struct SupportSettings {
    pub guild_id: GuildId,
    /// Category channel every ticket channel is created under.
    pub tickets_category_id: ChannelId,
    pub logs_channel_id: ChannelId,
    pub staff_role_id: RoleId,
    pub panel_channel_id: Option<ChannelId>,
    pub delete_delay: Duration,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve(env: &[(&str, &str)], stored: StoredConfig) -> AppResult<AppConfig> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::resolve(stored, PathBuf::from("/tmp/data"), |key| env.get(key).cloned())
    }

    #[test]
    fn environment_overrides_stored_values() {
        let stored = StoredConfig {
            guild_id: Some("1".to_string()),
            staff_role_id: Some("2".to_string()),
            ..StoredConfig::default()
        };
        let config = resolve(&[("GUILD_ID", "99")], stored).expect("config");
        assert_eq!(config.guild_id.as_deref(), Some("99"));
        assert_eq!(config.staff_role_id.as_deref(), Some("2"));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.delete_delay, Duration::from_secs(4));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn trims_public_base_url() {
        let config = resolve(
            &[("PUBLIC_BASE_URL", "https://bot.example.com///")],
            StoredConfig::default(),
        )
        .expect("config");
        assert_eq!(
            config.public_base_url.as_deref(),
            Some("https://bot.example.com")
        );
    }

    #[test]
    fn support_settings_require_ids() {
        let config = resolve(&[("GUILD_ID", "1")], StoredConfig::default()).expect("config");
        let err = config.support_settings().expect_err("missing ids");
        assert!(err.to_string().contains("TICKETS_CATEGORY_ID"));

        let config = resolve(
            &[
                ("GUILD_ID", "1"),
                ("TICKETS_CATEGORY_ID", "2"),
                ("TICKETS_LOGS_CHANNEL_ID", "3"),
                ("STAFF_ROLE_ID", "4"),
                ("TICKET_DELETE_DELAY_SECS", "10"),
            ],
            StoredConfig::default(),
        )
        .expect("config");
        let settings = config.support_settings().expect("settings");
        assert_eq!(settings.logs_channel_id, ChannelId(3));
        assert_eq!(settings.panel_channel_id, None);
        assert_eq!(settings.delete_delay, Duration::from_secs(10));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(resolve(&[("PORT", "http")], StoredConfig::default()).is_err());
    }
}
