//! Reads and writes `openclaw.json` (JSON5).
//!
//! OpenClaw refuses to boot on a config it cannot parse, so every write is
//! validated first and the previous file is kept as `openclaw.json.bak`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    pub raw: String,
    pub parsed: Value,
    pub hash: String,
}

impl ConfigSnapshot {
    fn new(raw: String, parsed: Value) -> Self {
        let hash = hash_config(&raw);
        Self { raw, parsed, hash }
    }
}

/// Short content hash used for optimistic concurrency on full rewrites.
pub fn hash_config(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(&digest[..8])
}

pub fn parse_json5(raw: &str) -> Result<Value, StoreError> {
    json5::from_str(raw).map_err(StoreError::from_json5)
}

/// Merges `patch` into `target`. `null` deletes a key, objects merge
/// recursively, everything else replaces.
pub fn deep_merge(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(key);
            }
            Value::Object(inner) => match target.get_mut(key) {
                Some(Value::Object(existing)) => deep_merge(existing, inner),
                _ => {
                    target.insert(key.clone(), value.clone());
                }
            },
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// One level merge: keys in `update` overwrite keys in `existing`.
pub fn shallow_merge(existing: Option<&Value>, update: &Map<String, Value>) -> Value {
    let mut merged = match existing {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    for (key, value) in update {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}

/// Detaches `root[key]` as an object, or an empty one if it is missing or
/// not an object. Callers insert it back after editing.
pub fn take_object(root: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match root.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// A missing file reads as an empty config.
    pub async fn read(&self) -> Result<ConfigSnapshot, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConfigSnapshot::new("{}".to_string(), Value::Object(Map::new())));
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let parsed = parse_json5(&raw)?;
        Ok(ConfigSnapshot::new(raw, parsed))
    }

    /// Replaces the file with `raw` after validating it. With `base_hash`,
    /// the write only happens if the file still hashes to it.
    pub async fn replace(&self, raw: &str, base_hash: Option<&str>) -> Result<String, StoreError> {
        parse_json5(raw)?;
        let _guard = self.write_lock.lock().await;

        if let Some(expected) = base_hash {
            let actual = self.read().await?.hash;
            if actual != expected {
                return Err(StoreError::Conflict {
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        self.write_raw(raw).await?;
        Ok(hash_config(raw))
    }

    /// Read-modify-write of the parsed config as one JSON object. Returns
    /// whatever `edit` returns plus the new hash.
    pub async fn update<R>(
        &self,
        edit: impl FnOnce(&mut Map<String, Value>) -> R,
    ) -> Result<(R, String), StoreError> {
        let _guard = self.write_lock.lock().await;

        let snapshot = self.read().await?;
        let mut root = match snapshot.parsed {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let out = edit(&mut root);

        let raw = serde_json::to_string_pretty(&Value::Object(root))?;
        self.write_raw(&raw).await?;
        Ok((out, hash_config(&raw)))
    }

    pub async fn patch(&self, patch: &Map<String, Value>) -> Result<String, StoreError> {
        let ((), hash) = self.update(|root| deep_merge(root, patch)).await?;
        Ok(hash)
    }

    async fn write_raw(&self, raw: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }

        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            let backup = self.backup_path();
            tokio::fs::copy(&self.path, &backup)
                .await
                .map_err(|e| StoreError::io(&backup, e))?;
        }

        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        tracing::info!("wrote {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("openclaw.json"));
        (dir, store)
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let (_dir, store) = store();
        let snapshot = store.read().await.unwrap();
        assert_eq!(snapshot.raw, "{}");
        assert_eq!(snapshot.parsed, json!({}));
        assert_eq!(snapshot.hash, hash_config("{}"));
    }

    #[tokio::test]
    async fn reads_json5_with_comments() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "{ // gateway\n gateway: { port: 18789, }, }").unwrap();
        let snapshot = store.read().await.unwrap();
        assert_eq!(snapshot.parsed["gateway"]["port"].as_f64(), Some(18789.0));
    }

    #[tokio::test]
    async fn replace_validates_and_backs_up() {
        let (_dir, store) = store();
        store.replace("{ a: 1 }", None).await.unwrap();
        store.replace("{ a: 2 }", None).await.unwrap();

        assert_eq!(std::fs::read_to_string(store.backup_path()).unwrap(), "{ a: 1 }");
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ a: 2 }");

        let err = store.replace("{ a: ", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
        assert!(err.to_string().starts_with("Invalid JSON5"));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ a: 2 }");
    }

    #[tokio::test]
    async fn stale_hash_is_a_conflict() {
        let (_dir, store) = store();
        let first = store.replace("{ a: 1 }", None).await.unwrap();
        store.replace("{ a: 2 }", Some(&first)).await.unwrap();

        let err = store.replace("{ a: 3 }", Some(&first)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ a: 2 }");
    }

    #[tokio::test]
    async fn patch_merges_and_deletes() {
        let (_dir, store) = store();
        store
            .replace(r#"{ gateway: { port: 1, bind: "lan" }, old: true }"#, None)
            .await
            .unwrap();

        let patch = object(json!({ "gateway": { "port": 2, "bind": null }, "old": null, "new": [1] }));
        let hash = store.patch(&patch).await.unwrap();

        let snapshot = store.read().await.unwrap();
        let gateway = snapshot.parsed["gateway"].as_object().unwrap();
        assert_eq!(gateway["port"].as_f64(), Some(2.0));
        assert!(!gateway.contains_key("bind"));
        assert!(snapshot.parsed.get("old").is_none());
        assert_eq!(snapshot.parsed["new"].as_array().map(Vec::len), Some(1));
        assert_eq!(snapshot.hash, hash);
    }

    #[test]
    fn deep_merge_replaces_non_objects() {
        let mut target = object(json!({ "a": { "b": 1 }, "list": [1, 2] }));
        deep_merge(&mut target, &object(json!({ "a": 5, "list": [3] })));
        assert_eq!(Value::Object(target), json!({ "a": 5, "list": [3] }));
    }

    #[test]
    fn shallow_merge_keeps_untouched_keys() {
        let existing = json!({ "enabled": true, "botToken": "x" });
        let merged = shallow_merge(Some(&existing), &object(json!({ "enabled": false })));
        assert_eq!(merged, json!({ "enabled": false, "botToken": "x" }));
        assert_eq!(shallow_merge(None, &Map::new()), json!({}));
    }

    #[test]
    fn take_object_drops_scalars() {
        let mut root = object(json!({ "skills": 3, "channels": { "slack": {} } }));
        assert!(take_object(&mut root, "skills").is_empty());
        assert!(take_object(&mut root, "channels").contains_key("slack"));
        assert!(root.is_empty());
    }

    #[test]
    fn json5_errors_carry_location() {
        match parse_json5("{\n  a: ,\n}").unwrap_err() {
            StoreError::Invalid { location, .. } => {
                assert_eq!(location.map(|l| l.line), Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
