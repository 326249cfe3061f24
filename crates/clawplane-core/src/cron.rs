//! Typed `openclaw cron` requests.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validate::{require_text, require_word};

pub const DEFAULT_RUNS_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CronSchedule {
    /// ISO 8601 timestamp or a relative offset such as `20m`.
    At { at: String },
    #[serde(rename_all = "camelCase")]
    Every { every_ms: u64 },
    Cron {
        expr: String,
        #[serde(default)]
        tz: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CronPayload {
    SystemEvent { text: String },
    AgentTurn { message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionTarget {
    #[default]
    Main,
    Isolated,
}

impl SessionTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Isolated => "isolated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WakeMode {
    Now,
    NextHeartbeat,
}

impl WakeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::NextHeartbeat => "next-heartbeat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Announce,
    Webhook,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronDelivery {
    pub mode: DeliveryMode,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronAddRequest {
    pub name: String,
    pub schedule: CronSchedule,
    #[serde(default)]
    pub session_target: SessionTarget,
    #[serde(default)]
    pub wake_mode: Option<WakeMode>,
    pub payload: CronPayload,
    #[serde(default)]
    pub delivery: Option<CronDelivery>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub delete_after_run: bool,
}

impl CronAddRequest {
    pub fn to_tokens(&self) -> Result<Vec<String>, ValidationError> {
        let mut args = vec![
            "cron".to_string(),
            "add".to_string(),
            "--name".to_string(),
            require_text("name", &self.name)?,
        ];

        match &self.schedule {
            CronSchedule::At { at } => {
                args.push("--at".into());
                args.push(require_word("schedule.at", at)?);
            }
            CronSchedule::Every { every_ms } => {
                if *every_ms == 0 {
                    return Err(ValidationError::new("schedule.everyMs must be positive"));
                }
                args.push("--every".into());
                args.push(every_ms.to_string());
            }
            CronSchedule::Cron { expr, tz } => {
                args.push("--cron".into());
                args.push(require_text("schedule.expr", expr)?);
                if let Some(tz) = tz.as_deref().filter(|tz| !tz.is_empty()) {
                    args.push("--tz".into());
                    args.push(require_word("schedule.tz", tz)?);
                }
            }
        }

        args.push("--session".into());
        args.push(self.session_target.as_str().into());

        match &self.payload {
            CronPayload::SystemEvent { text } => {
                args.push("--system-event".into());
                args.push(require_text("payload.text", text)?);
            }
            CronPayload::AgentTurn { message } => {
                args.push("--message".into());
                args.push(require_text("payload.message", message)?);
            }
        }

        if let Some(wake) = self.wake_mode {
            args.push("--wake".into());
            args.push(wake.as_str().into());
        }

        if let Some(delivery) = &self.delivery {
            match delivery.mode {
                DeliveryMode::Announce => {
                    args.push("--announce".into());
                    if let Some(channel) = delivery.channel.as_deref().filter(|c| !c.is_empty()) {
                        args.push("--channel".into());
                        args.push(require_word("delivery.channel", channel)?);
                    }
                    if let Some(to) = delivery.to.as_deref().filter(|t| !t.is_empty()) {
                        args.push("--to".into());
                        args.push(require_text("delivery.to", to)?);
                    }
                }
                DeliveryMode::Webhook => {
                    let to = delivery.to.as_deref().unwrap_or_default();
                    args.push("--webhook".into());
                    args.push(require_text("delivery.to", to)?);
                }
                DeliveryMode::None => {}
            }
        }

        if let Some(agent) = self.agent_id.as_deref().filter(|a| !a.is_empty()) {
            args.push("--agent".into());
            args.push(require_word("agentId", agent)?);
        }

        if self.delete_after_run {
            args.push("--delete-after-run".into());
        }

        Ok(args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Force,
    Due,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronRunRequest {
    pub job_id: String,
    #[serde(default)]
    pub mode: Option<RunMode>,
}

impl CronRunRequest {
    pub fn to_tokens(&self) -> Result<Vec<String>, ValidationError> {
        let mut args = vec![
            "cron".to_string(),
            "run".to_string(),
            require_word("jobId", &self.job_id)?,
        ];
        if self.mode == Some(RunMode::Due) {
            args.push("--due".into());
        }
        Ok(args)
    }
}

pub fn list_tokens() -> Vec<String> {
    ["cron", "list", "--json"].map(String::from).to_vec()
}

pub fn runs_tokens(job_id: Option<&str>, limit: Option<u32>) -> Result<Vec<String>, ValidationError> {
    let mut args = vec!["cron".to_string(), "runs".to_string()];
    if let Some(job_id) = job_id.filter(|id| !id.is_empty()) {
        args.push("--id".into());
        args.push(require_word("jobId", job_id)?);
    }
    args.push("--limit".into());
    args.push(limit.unwrap_or(DEFAULT_RUNS_LIMIT).to_string());
    Ok(args)
}

pub fn remove_tokens(job_id: &str) -> Result<Vec<String>, ValidationError> {
    Ok(vec![
        "cron".to_string(),
        "remove".to_string(),
        require_word("jobId", job_id)?,
    ])
}
