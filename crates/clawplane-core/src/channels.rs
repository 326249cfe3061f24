//! Chat channel configuration under `channels.<provider>` in
//! `openclaw.json`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config_store::{shallow_merge, take_object};
use crate::error::ValidationError;

pub const CHANNEL_PROVIDERS: &[&str] = &[
    "whatsapp",
    "telegram",
    "discord",
    "slack",
    "signal",
    "imessage",
    "googlechat",
    "mattermost",
    "msteams",
];

pub const RESTART_WARNINGS: &[&str] = &[
    "Channel config changes require a Gateway restart (not hot-reloaded).",
    "Run `openclaw gateway restart` or use the restart button.",
];

const DEFAULT_DM_POLICY: &str = "pairing";

pub fn validate_provider(provider: &str) -> Result<&'static str, ValidationError> {
    CHANNEL_PROVIDERS
        .iter()
        .copied()
        .find(|p| *p == provider)
        .ok_or_else(|| ValidationError::new(format!("Unknown provider: {provider}")))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub provider: &'static str,
    pub enabled: bool,
    pub configured: bool,
    pub dm_policy: String,
    pub allow_from: Value,
    pub groups: Value,
}

/// One entry per supported provider, configured or not.
pub fn summarize(config: &Value) -> Vec<ChannelSummary> {
    CHANNEL_PROVIDERS
        .iter()
        .map(|&provider| {
            let entry = config.get("channels").and_then(|c| c.get(provider));
            let configured = entry.is_some_and(|e| !e.is_null());
            let field = |name: &str| entry.and_then(|e| e.get(name));

            ChannelSummary {
                provider,
                enabled: configured && field("enabled").and_then(Value::as_bool) != Some(false),
                configured,
                dm_policy: field("dmPolicy")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_DM_POLICY)
                    .to_string(),
                allow_from: field("allowFrom")
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new())),
                groups: field("groups")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new())),
            }
        })
        .collect()
}

/// Merges `update` over `channels.<provider>` and returns the result.
pub fn merge_channel(root: &mut Map<String, Value>, provider: &str, update: &Map<String, Value>) -> Value {
    let mut channels = take_object(root, "channels");
    let merged = shallow_merge(channels.get(provider), update);
    channels.insert(provider.to_string(), merged.clone());
    root.insert("channels".to_string(), Value::Object(channels));
    merged
}

pub fn status_tokens() -> Vec<String> {
    ["channels", "status", "--probe"].map(String::from).to_vec()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn summary_covers_every_provider() {
        let config = json!({
            "channels": {
                "telegram": { "botToken": "t", "dmPolicy": "allowlist", "allowFrom": ["@me"] },
                "slack": { "enabled": false }
            }
        });
        let summary = summarize(&config);
        assert_eq!(summary.len(), 9);

        let telegram = summary.iter().find(|s| s.provider == "telegram").unwrap();
        assert!(telegram.enabled && telegram.configured);
        assert_eq!(telegram.dm_policy, "allowlist");
        assert_eq!(telegram.allow_from, json!(["@me"]));

        let slack = summary.iter().find(|s| s.provider == "slack").unwrap();
        assert!(slack.configured && !slack.enabled);

        let discord = summary.iter().find(|s| s.provider == "discord").unwrap();
        assert!(!discord.configured && !discord.enabled);
        assert_eq!(discord.dm_policy, "pairing");
        assert_eq!(discord.groups, json!({}));
    }

    #[test]
    fn provider_allowlist() {
        assert_eq!(validate_provider("msteams").unwrap(), "msteams");
        assert_eq!(
            validate_provider("irc").unwrap_err().to_string(),
            "Unknown provider: irc"
        );
    }

    #[test]
    fn merge_keeps_secrets() {
        let mut root = json!({ "channels": { "discord": { "botToken": "x", "enabled": true } } })
            .as_object()
            .cloned()
            .unwrap();
        let update = json!({ "enabled": false }).as_object().cloned().unwrap();
        let merged = merge_channel(&mut root, "discord", &update);
        assert_eq!(merged, json!({ "botToken": "x", "enabled": false }));
        assert_eq!(root["channels"]["discord"], merged);
    }
}
