//! `openclaw skills` and `clawhub` requests, plus the skill files and
//! config entries the adapter manages directly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config_store::{shallow_merge, take_object};
use crate::error::{StoreError, ValidationError};
use crate::validate::require_word;

pub const SKILL_EXTENSION: &str = "ts";

pub fn list_tokens() -> Vec<String> {
    ["skills", "list", "--json"].map(String::from).to_vec()
}

pub fn check_tokens() -> Vec<String> {
    ["skills", "check"].map(String::from).to_vec()
}

pub fn info_tokens(name: &str) -> Result<Vec<String>, ValidationError> {
    Ok(vec![
        "skills".to_string(),
        "info".to_string(),
        require_word("name", name)?,
    ])
}

pub fn install_tokens(slug: &str) -> Result<Vec<String>, ValidationError> {
    Ok(vec![
        "clawhub".to_string(),
        "install".to_string(),
        validate_slug(slug)?,
    ])
}

pub fn update_all_tokens() -> Vec<String> {
    ["clawhub", "update", "--all"].map(String::from).to_vec()
}

pub fn sync_tokens() -> Vec<String> {
    ["clawhub", "sync", "--all"].map(String::from).to_vec()
}

fn is_slug_part(part: &str) -> bool {
    !part.is_empty()
        && !part.starts_with(['-', '.'])
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// ClawHub slugs are `owner/name`.
pub fn validate_slug(slug: &str) -> Result<String, ValidationError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(ValidationError::required("slug"));
    }
    match slug.split_once('/') {
        Some((owner, name)) if is_slug_part(owner) && is_slug_part(name) => Ok(slug.to_string()),
        _ => Err(ValidationError::new(
            "slug must look like owner/name (letters, digits, '-', '_' or '.')",
        )),
    }
}

/// Keeps `[a-zA-Z0-9_-]`, lowercases, and appends `.ts`.
pub fn sanitize_filename(name: &str) -> Result<String, ValidationError> {
    let stem: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect::<String>()
        .to_lowercase();
    if stem.is_empty() {
        return Err(ValidationError::new(
            "filename must contain letters, digits, '-' or '_'",
        ));
    }
    Ok(format!("{stem}.{SKILL_EXTENSION}"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillCreateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl SkillCreateRequest {
    /// The file name the skill will be written to; `filename` wins over
    /// `name` when given.
    pub fn target_filename(&self) -> Result<String, ValidationError> {
        if self.name.trim().is_empty() || self.content.is_empty() {
            return Err(ValidationError::new("name and content are required"));
        }
        let source = self
            .filename
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(&self.name);
        sanitize_filename(source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSkill {
    pub path: PathBuf,
    pub name: String,
}

/// Writes a local skill file into `skills_dir`, creating the directory.
pub async fn write_skill(
    skills_dir: &Path,
    filename: &str,
    request: &SkillCreateRequest,
) -> Result<CreatedSkill, StoreError> {
    tokio::fs::create_dir_all(skills_dir)
        .await
        .map_err(|e| StoreError::io(skills_dir, e))?;
    let path = skills_dir.join(filename);
    tokio::fs::write(&path, &request.content)
        .await
        .map_err(|e| StoreError::io(&path, e))?;
    tracing::info!("created skill {} at {}", request.name, path.display());

    Ok(CreatedSkill {
        path,
        name: request.name.clone(),
    })
}

/// The `skills` section of a parsed config, `{}` when absent.
pub fn skills_section(config: &Value) -> Value {
    config
        .get("skills")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Merges `entry` into `skills.entries.<key>` and returns the merged entry.
pub fn merge_skill_entry(root: &mut Map<String, Value>, key: &str, entry: &Map<String, Value>) -> Value {
    let mut skills = take_object(root, "skills");
    let mut entries = take_object(&mut skills, "entries");

    let merged = shallow_merge(entries.get(key), entry);
    entries.insert(key.to_string(), merged.clone());
    skills.insert("entries".to_string(), Value::Object(entries));
    root.insert("skills".to_string(), Value::Object(skills));
    merged
}

/// Where skills are loaded from, highest number wins on name conflicts.
pub fn skill_locations(config: &Value, skills_dir: &Path) -> Value {
    let workspace = config
        .pointer("/agents/defaults/workspace")
        .and_then(Value::as_str)
        .unwrap_or("~/.openclaw/workspace");

    let mut precedence = vec![
        json!({ "order": 1, "label": "Bundled", "description": "Shipped with OpenClaw install", "path": "(built-in)" }),
        json!({ "order": 2, "label": "Managed/Local", "description": "~/.openclaw/skills", "path": skills_dir.display().to_string() }),
        json!({ "order": 3, "label": "Workspace", "description": "Wins on name conflicts", "path": format!("{workspace}/skills") }),
    ];

    let extra_dirs = config
        .pointer("/skills/load/extraDirs")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (i, dir) in extra_dirs.iter().filter_map(Value::as_str).enumerate() {
        precedence.push(json!({
            "order": 4 + i,
            "label": format!("Extra dir {}", i + 1),
            "description": "From skills.load.extraDirs",
            "path": dir,
        }));
    }

    json!({
        "precedence": precedence,
        "note": "Workspace skills override managed and bundled skills on name conflict.",
    })
}
