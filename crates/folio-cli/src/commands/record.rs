use super::Context;
use anyhow::{Context as _, Result, bail};
use folio_infrastructure::LoadOutcome;
use folio_infrastructure::capacity::format_bytes;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub fn inspect(ctx: &Context, key: &str) -> Result<()> {
    let Some(info) = ctx.facade_for(key).inspect(key)? else {
        bail!("No record stored under '{}'", key);
    };

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let facade = ctx.facade_for(key);

    match facade
        .load_detailed::<Value>(key)
        .with_context(|| format!("Failed to load '{}'", key))?
    {
        LoadOutcome::Loaded(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        LoadOutcome::Missing => bail!("No record stored under '{}'", key),
        LoadOutcome::Unrecoverable {
            reason,
            backup_keys,
        } => {
            eprintln!("Record '{}' could not be read: {}", key, reason);
            for backup in &backup_keys {
                eprintln!("  backup: {}", backup);
            }
            bail!("Record '{}' is unrecoverable", key);
        }
    }

    Ok(())
}

pub fn put(ctx: &Context, key: &str, file: &Path, version: Option<u32>) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let facade = ctx.facade_for(key);
    let version = version.unwrap_or(facade.version_bounds().current);
    facade
        .save_with_version(key, &value, version)
        .with_context(|| format!("Failed to save '{}'", key))?;

    let status = facade.capacity_status()?;
    println!(
        "Saved '{}' at v{} ({} / {} used)",
        key,
        version,
        format_bytes(status.used_bytes),
        format_bytes(status.total_bytes)
    );
    Ok(())
}
