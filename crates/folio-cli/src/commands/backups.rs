use super::Context;
use anyhow::Result;
use chrono::{TimeZone, Utc};

pub fn run(ctx: &Context, key: &str) -> Result<()> {
    let backups = ctx.facade_for(key).list_backups(key)?;

    if backups.is_empty() {
        println!("No backups for '{}'.", key);
        return Ok(());
    }

    for entry in backups {
        let created = Utc
            .timestamp_millis_opt(entry.created_at_millis)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| entry.created_at_millis.to_string());
        println!("{}  from v{}  {}", created, entry.from_version, entry.key);
    }

    Ok(())
}
