//! Order listing command.

use console::style;

use crate::config::Settings;
use crate::models::{format_price, short_reference, OrderStatus};

/// Show the most recent orders.
pub async fn cmd_orders_list(settings: &Settings, limit: i64) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let orders = ctx.orders().recent(limit.max(1)).await?;

    if orders.is_empty() {
        println!("{} No orders yet", style("!").yellow());
        return Ok(());
    }

    for order in &orders {
        let status = match order.status {
            OrderStatus::Pending => style(order.status.as_str()).yellow(),
            OrderStatus::Confirmed => style(order.status.as_str()).green(),
            OrderStatus::Cancelled => style(order.status.as_str()).dim(),
        };
        println!(
            "{} {} {} {}",
            style(short_reference(&order.id)).bold(),
            order.created_at.format("%Y-%m-%d %H:%M"),
            status,
            format_price(order.amount_cents, &order.currency)
        );
        println!(
            "  {} <{}> {} via {}",
            order.customer_name,
            order.email,
            order.template_slug,
            order.payment_platform.label()
        );
        if let Some(ref reference) = order.transaction_ref {
            println!("  ref: {}", reference);
        }
    }
    Ok(())
}
