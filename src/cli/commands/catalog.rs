//! Catalog administration commands.

use std::path::Path;

use anyhow::Context;
use console::style;

use crate::config::Settings;
use crate::models::{format_price, CatalogFile, TemplateImport};
use crate::repository::ImportOutcome;
use crate::services::validation::is_template_identifier;

/// Read a catalog file, picking the format from its extension.
pub fn load_catalog_file(path: &Path) -> anyhow::Result<CatalogFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    let file: CatalogFile = match ext {
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("invalid TOML in {}", path.display()))?,
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
        _ => serde_json::from_str(&contents)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
    };
    Ok(file)
}

/// Why an entry cannot be imported, if it cannot.
fn entry_problem(entry: &TemplateImport) -> Option<String> {
    if !is_template_identifier(&entry.slug) {
        return Some(format!("invalid slug '{}'", entry.slug));
    }
    if entry.name.trim().is_empty() {
        return Some("missing name".to_string());
    }
    if entry.price_cents < 0 {
        return Some("negative price".to_string());
    }
    None
}

/// Import templates and their applications.
pub async fn cmd_catalog_import(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let catalog = load_catalog_file(file)?;
    if catalog.templates.is_empty() {
        println!("{} No templates in {}", style("!").yellow(), file.display());
        return Ok(());
    }

    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;
    let repo = ctx.catalog();

    let (mut created, mut updated, mut skipped) = (0, 0, 0);
    for entry in &catalog.templates {
        if let Some(problem) = entry_problem(entry) {
            println!("  {} Skipped {}: {}", style("✗").red(), entry.slug, problem);
            skipped += 1;
            continue;
        }

        match repo.import(entry, &settings.site.currency).await? {
            ImportOutcome::Created => {
                created += 1;
                println!("  {} Added {}", style("✓").green(), entry.slug);
            }
            ImportOutcome::Updated => {
                updated += 1;
                println!("  {} Updated {}", style("↻").cyan(), entry.slug);
            }
        }
    }

    println!(
        "{} Imported {} templates ({} new, {} updated, {} skipped)",
        style("✓").green(),
        created + updated,
        created,
        updated,
        skipped
    );
    Ok(())
}

/// List every template.
pub async fn cmd_catalog_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let templates = ctx.catalog().list_all().await?;

    if templates.is_empty() {
        println!("{} Catalog is empty", style("!").yellow());
        return Ok(());
    }

    println!("{:<28} {:<32} {:<12} {:>14}  STATUS", "SLUG", "NAME", "CATEGORY", "PRICE");
    for t in &templates {
        let status = if t.is_active {
            style("active").green()
        } else {
            style("hidden").dim()
        };
        println!(
            "{:<28} {:<32} {:<12} {:>14}  {}",
            t.slug,
            t.name,
            t.category,
            format_price(t.price_cents, &t.currency),
            status
        );
    }
    Ok(())
}

/// Hide a template from the site.
pub async fn cmd_catalog_deactivate(settings: &Settings, slug: &str) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    if ctx.catalog().deactivate(slug).await? {
        println!("{} Deactivated {}", style("✓").green(), slug);
        Ok(())
    } else {
        anyhow::bail!("no template with slug '{}'", slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_toml_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
[[templates]]
slug = "salon-lite"
name = "Salon Lite"
price_cents = 80000

[[templates.applications]]
name = "Glow Studio"
"#,
        )
        .unwrap();

        let file = load_catalog_file(&path).unwrap();
        assert_eq!(file.templates.len(), 1);
        let entry = &file.templates[0];
        assert_eq!(entry.category, "general");
        assert_eq!(entry.applications[0].platform, "web");
    }

    #[test]
    fn test_load_yaml_and_json_catalogs() {
        let dir = tempdir().unwrap();

        let yaml = dir.path().join("catalog.yaml");
        std::fs::write(
            &yaml,
            "templates:\n  - slug: shop-one\n    name: Shop One\n    price_cents: 1000\n",
        )
        .unwrap();
        assert_eq!(load_catalog_file(&yaml).unwrap().templates[0].slug, "shop-one");

        let json = dir.path().join("catalog.json");
        std::fs::write(
            &json,
            r#"{"templates":[{"slug":"shop-two","name":"Shop Two","price_cents":2000}]}"#,
        )
        .unwrap();
        assert_eq!(load_catalog_file(&json).unwrap().templates[0].price_cents, 2000);
    }

    #[test]
    fn test_bad_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_catalog_file(&path).unwrap_err();
        assert!(err.to_string().contains("catalog.json"));
    }

    #[test]
    fn test_entry_problems() {
        let mut entry: TemplateImport = serde_json::from_str(
            r#"{"slug":"ok-slug","name":"Fine","price_cents":100}"#,
        )
        .unwrap();
        assert_eq!(entry_problem(&entry), None);

        entry.slug = "Bad Slug".to_string();
        assert!(entry_problem(&entry).unwrap().contains("invalid slug"));

        entry.slug = "ok-slug".to_string();
        entry.price_cents = -1;
        assert_eq!(entry_problem(&entry).as_deref(), Some("negative price"));
    }
}
