use super::Context;
use anyhow::Result;
use folio_infrastructure::capacity::format_bytes;
use folio_infrastructure::migration::parse_backup_key;

pub fn run(ctx: &Context) -> Result<()> {
    let status = ctx.capacity_status()?;

    println!("Store: {}", ctx.store_path.display());
    println!(
        "Usage: {} / {} ({:.1}%), {} remaining",
        format_bytes(status.used_bytes),
        format_bytes(status.total_bytes),
        status.percent_used,
        format_bytes(status.remaining_bytes)
    );
    if status.critical {
        println!("Status: CRITICAL");
    } else if status.warning {
        println!("Status: warning");
    } else {
        println!("Status: ok");
    }

    let keys = ctx.store.keys()?;
    let records: Vec<&String> = keys.iter().filter(|key| !is_backup(key)).collect();
    if records.is_empty() {
        println!("\nNo records.");
        return Ok(());
    }

    println!("\nRecords:");
    for key in records {
        match ctx.facade_for(key).inspect(key)? {
            Some(info) => println!(
                "  {:<32} v{:<3} {:>10} {}{}",
                key,
                info.version,
                format_bytes(info.stored_bytes),
                if info.compressed { "compressed" } else { "raw" },
                if !info.supported {
                    " (unsupported)"
                } else if info.needs_migration {
                    " (needs migration)"
                } else {
                    ""
                }
            ),
            None => println!("  {:<32} (empty)", key),
        }
    }

    let backups = keys.iter().filter(|key| is_backup(key)).count();
    if backups > 0 {
        println!("\n{} backup(s). Use `folio backups <key>` to list them.", backups);
    }

    Ok(())
}

/// True if `key` follows the backup naming pattern of some record.
fn is_backup(key: &str) -> bool {
    key.rsplit_once("_backup_v")
        .is_some_and(|(owner, _)| parse_backup_key(owner, key).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_backup() {
        assert!(is_backup("resumeBuilderDraft_backup_v1_1700000000000"));
        assert!(!is_backup("resumeBuilderDraft"));
        assert!(!is_backup("notes_backup_vX_1"));
    }
}
