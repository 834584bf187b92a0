//! Bot configuration
//!
//! Loads configuration from environment variables once at startup. The
//! resulting [`Config`] is immutable and handed to every workflow by reference.

use crate::policy::PolicyConfig;
use poise::serenity_prelude::{ApplicationId, GuildId, RoleId};
use std::collections::HashSet;
use std::env;
use thiserror::Error;

/// Keys that must be present for the bot to start
pub const REQUIRED_KEYS: [&str; 5] = [
    "DISCORD_TOKEN",
    "GUILD_ID",
    "CLIENT_ID",
    "REQUIRED_ROLE_ID",
    "TARGET_ROLE_ID",
];

/// Errors raised while building the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required keys are absent or blank
    #[error(
        "Missing environment variables: {}. Check DISCORD_TOKEN, GUILD_ID, CLIENT_ID, \
         REQUIRED_ROLE_ID, TARGET_ROLE_ID.",
        .0.join(", ")
    )]
    Missing(Vec<&'static str>),

    /// A key is present but its value cannot be used
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Bot configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token used to log in
    pub token: String,

    /// The single guild this bot moderates
    pub guild_id: GuildId,

    /// Application id the slash commands are registered under
    pub client_id: ApplicationId,

    /// Ban policy settings
    pub policy: PolicyConfig,

    /// Run a scan once the gateway reports ready (default: false)
    pub scan_on_ready: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(vec![key]));

        let token = require("DISCORD_TOKEN")?.trim().to_string();
        let guild_id = GuildId::new(parse_id("GUILD_ID", &require("GUILD_ID")?)?);
        let client_id = ApplicationId::new(parse_id("CLIENT_ID", &require("CLIENT_ID")?)?);
        let required_role = RoleId::new(parse_id(
            "REQUIRED_ROLE_ID",
            &require("REQUIRED_ROLE_ID")?,
        )?);
        let target_role = RoleId::new(parse_id("TARGET_ROLE_ID", &require("TARGET_ROLE_ID")?)?);

        let exempt_roles = get("EXEMPT_ROLE_IDS")
            .map(|raw| parse_id_list("EXEMPT_ROLE_IDS", &raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            token,
            guild_id,
            client_id,
            policy: PolicyConfig {
                required_role,
                target_role,
                exempt_roles,
                dry_run: parse_flag(get("DRY_RUN"), true),
            },
            scan_on_ready: parse_flag(get("SCAN_ON_READY"), false),
        })
    }

    /// Create a configuration for tests.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            token: "test-token".into(),
            guild_id: GuildId::new(1000),
            client_id: ApplicationId::new(2000),
            policy: PolicyConfig {
                required_role: RoleId::new(10),
                target_role: RoleId::new(20),
                exempt_roles: HashSet::new(),
                dry_run: true,
            },
            scan_on_ready: false,
        }
    }
}

/// Only the literal `true` (any case) switches a flag on.
fn parse_flag(value: Option<String>, default: bool) -> bool {
    value.map_or(default, |v| v.trim().eq_ignore_ascii_case("true"))
}

fn parse_id(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
}

fn parse_id_list(key: &'static str, value: &str) -> Result<HashSet<RoleId>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_id(key, s).map(RoleId::new))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DISCORD_TOKEN", "token".to_string()),
            ("GUILD_ID", "111".to_string()),
            ("CLIENT_ID", "222".to_string()),
            ("REQUIRED_ROLE_ID", "333".to_string()),
            ("TARGET_ROLE_ID", "444".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).expect("config should load");
        assert_eq!(config.guild_id, GuildId::new(111));
        assert_eq!(config.client_id, ApplicationId::new(222));
        assert_eq!(config.policy.required_role, RoleId::new(333));
        assert_eq!(config.policy.target_role, RoleId::new(444));
        assert!(config.policy.exempt_roles.is_empty());
        assert!(config.policy.dry_run);
        assert!(!config.scan_on_ready);
    }

    #[test]
    fn test_missing_keys_reported_together() {
        let mut env = base_env();
        env.remove("DISCORD_TOKEN");
        env.insert("GUILD_ID", "   ".to_string());

        let err = load(&env).unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["DISCORD_TOKEN", "GUILD_ID"]));
        assert!(err.to_string().contains("DISCORD_TOKEN, GUILD_ID"));
    }

    #[test]
    fn test_target_role_is_required() {
        let mut env = base_env();
        env.remove("TARGET_ROLE_ID");
        assert_eq!(
            load(&env).unwrap_err(),
            ConfigError::Missing(vec!["TARGET_ROLE_ID"])
        );
    }

    #[test]
    fn test_flags() {
        let mut env = base_env();
        env.insert("DRY_RUN", "FALSE".to_string());
        env.insert("SCAN_ON_READY", "True".to_string());
        let config = load(&env).unwrap();
        assert!(!config.policy.dry_run);
        assert!(config.scan_on_ready);

        // Anything other than "true" counts as off
        env.insert("DRY_RUN", "yes".to_string());
        env.insert("SCAN_ON_READY", "1".to_string());
        let config = load(&env).unwrap();
        assert!(!config.policy.dry_run);
        assert!(!config.scan_on_ready);

        // Blank falls back to the default
        env.insert("DRY_RUN", String::new());
        assert!(load(&env).unwrap().policy.dry_run);
    }

    #[test]
    fn test_exempt_roles() {
        let mut env = base_env();
        env.insert("EXEMPT_ROLE_IDS", " 5, 6,,7 ,".to_string());
        let config = load(&env).unwrap();
        let expected: HashSet<RoleId> = [5, 6, 7].into_iter().map(RoleId::new).collect();
        assert_eq!(config.policy.exempt_roles, expected);
    }

    #[test]
    fn test_invalid_ids() {
        let mut env = base_env();
        env.insert("REQUIRED_ROLE_ID", "not-a-number".to_string());
        assert_eq!(
            load(&env).unwrap_err(),
            ConfigError::Invalid {
                key: "REQUIRED_ROLE_ID",
                value: "not-a-number".to_string()
            }
        );

        let mut env = base_env();
        env.insert("EXEMPT_ROLE_IDS", "5,0".to_string());
        assert!(matches!(
            load(&env).unwrap_err(),
            ConfigError::Invalid {
                key: "EXEMPT_ROLE_IDS",
                ..
            }
        ));
    }
}
