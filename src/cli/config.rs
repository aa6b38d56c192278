use anyhow::{bail, Context, Result};
use serde_json::Value;

use bookshop_search::config::ShopConfig;
use bookshop_search::storage::path_utils;

fn load_raw() -> Result<Value> {
    let config_path = path_utils::config_path();
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        serde_json::from_str(&content).context("Invalid JSON in config.json")
    } else {
        Ok(serde_json::to_value(ShopConfig::default())?)
    }
}

/// `config show`: effective configuration, defaults filled in.
pub fn run_show() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&ShopConfig::load())?);
    Ok(())
}

/// `config get <key>` (dot notation: `telemetry.success_sample_rate`).
pub fn run_get(key: &str) -> Result<()> {
    let config = serde_json::to_value(ShopConfig::load())?;
    match resolve_path(&config, key) {
        Some(v) => println!("{}", serde_json::to_string_pretty(v)?),
        None => bail!("Key not found: {}", key),
    }
    Ok(())
}

/// `config set <key> <value>`. The value is parsed as JSON, falling back to a
/// plain string; the result must still deserialize as a valid config.
pub fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = load_raw()?;
    let parsed: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    set_path(&mut config, key, parsed.clone())?;

    let typed: ShopConfig = serde_json::from_value(config)
        .with_context(|| format!("Invalid value for {}", key))?;
    if resolve_path(&serde_json::to_value(&typed)?, key).is_none() {
        bail!("Unknown config key: {}", key);
    }
    typed.save().map_err(anyhow::Error::msg)?;

    println!("{} = {}", key, serde_json::to_string(&parsed)?);
    Ok(())
}

fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Set a value at a dot-separated path, creating intermediate objects as needed.
fn set_path(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        bail!("Empty key path");
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = serde_json::json!({});
        }
        let Value::Object(map) = current else {
            bail!("Cannot descend into {}", segment);
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| serde_json::json!({}));
    }

    if !current.is_object() {
        *current = serde_json::json!({});
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
    Ok(())
}
