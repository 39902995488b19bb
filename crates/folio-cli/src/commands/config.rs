use super::Context;
use anyhow::{Context as _, Result};
use folio_infrastructure::config_loader::save_config;

/// Prints the effective configuration, and writes it to the config file
/// when `write` is set.
pub fn run(ctx: &Context, write: bool) -> Result<()> {
    println!("# {}", ctx.config_path.display());
    println!("{}", toml_text(ctx)?);

    if write {
        save_config(&ctx.config_path, &ctx.config)
            .with_context(|| format!("Failed to write {}", ctx.config_path.display()))?;
        println!("Wrote {}", ctx.config_path.display());
    }

    Ok(())
}

fn toml_text(ctx: &Context) -> Result<String> {
    Ok(toml::to_string_pretty(&ctx.config).context("Failed to render config")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_infrastructure::config_loader::load_config;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_loadable_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("folio").join("config.toml");
        let ctx = Context::open(Some(temp_dir.path().join("store.json")), Some(config_path.clone()))
            .unwrap();

        run(&ctx, true).unwrap();

        assert!(config_path.exists());
        assert_eq!(load_config(&config_path).unwrap(), ctx.config);
    }

    #[test]
    fn test_show_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let ctx = Context::open(Some(temp_dir.path().join("store.json")), Some(config_path.clone()))
            .unwrap();

        run(&ctx, false).unwrap();

        assert!(!config_path.exists());
    }
}
