//! Status command.

use console::style;

use crate::config::Settings;
use crate::models::OrderStatus;
use crate::repository::redact_url_password;

/// Show configuration and database counts.
pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", style("Storefront status").bold());
    println!("  Environment: {}", settings.environment.as_str());
    println!(
        "  Database:    {}",
        redact_url_password(&settings.database_url())
    );
    println!(
        "  Mail:        {}",
        if settings.mail.api_key.is_some() {
            style("configured").green()
        } else {
            style("no MAIL_API_KEY").yellow()
        }
    );
    println!(
        "  Monitoring:  {}",
        if settings.monitoring_webhook.is_some() {
            "webhook"
        } else {
            "logs only"
        }
    );

    if !settings.database_exists() {
        println!(
            "{} Database not initialized. Run: {}",
            style("!").yellow(),
            style("storefront init").cyan()
        );
        return Ok(());
    }

    let ctx = settings.create_db_context()?;
    let (active, total) = ctx.catalog().counts().await?;
    let orders = ctx.orders();
    let all_orders = orders.count(None).await?;
    let pending = orders.count(Some(OrderStatus::Pending)).await?;

    println!();
    println!("  Templates:   {} active / {} total", active, total);
    println!("  Orders:      {} ({} pending)", all_orders, pending);
    Ok(())
}
