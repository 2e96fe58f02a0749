//! Order form submission.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::validation::{validate_order, OrderInput};
use super::{Rejection, SubmitOutcome, WritePath};
use crate::mailer::OutgoingEmail;
use crate::models::{format_price, NewOrder, OrderReceipt};
use crate::monitoring::ReportContext;
use crate::rate_limit::Category;
use crate::repository::OrderStore;

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    write: WritePath,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, write: WritePath) -> Self {
        Self { store, write }
    }

    /// Validate, admit, and persist an order.
    ///
    /// On success the sales inbox is notified from a detached task; a failed
    /// notification is reported but never changes the outcome.
    pub async fn submit(&self, input: &OrderInput, identity: &str) -> SubmitOutcome<OrderReceipt> {
        let valid = match validate_order(input) {
            Ok(valid) => valid,
            Err(errors) => {
                debug!(fields = errors.len(), "Order form rejected");
                return SubmitOutcome::Rejected(Rejection::Invalid(errors));
            }
        };

        if let Err(rejection) = self.write.admit(identity, Category::Order) {
            info!(identity, "Order form rate limited");
            return SubmitOutcome::Rejected(rejection);
        }

        let order = NewOrder {
            id: Uuid::new_v4().to_string(),
            template_slug: valid.template_slug,
            customer_name: valid.customer_name,
            email: valid.email,
            phone: valid.phone,
            amount_cents: valid.amount_cents,
            currency: self.write.site.currency.clone(),
            payment_platform: valid.payment_platform,
            account_name: valid.account_name,
            account_number: valid.account_number,
            transaction_ref: valid.transaction_ref,
            notes: valid.notes,
            client_ip: identity.to_string(),
            created_at: Utc::now(),
        };

        let store = self.store.as_ref();
        let context = ReportContext::new("order.insert")
            .tag("form", "order")
            .tag("template", &order.template_slug);

        if let Err(classified) = self.write.perform(context, || store.insert_order(&order)).await {
            return SubmitOutcome::Failed(classified);
        }

        let receipt = order.receipt();
        info!(
            order = %receipt.reference,
            template = %order.template_slug,
            platform = order.payment_platform.as_str(),
            "Order recorded"
        );

        self.notify_sales(&order);
        SubmitOutcome::Success(receipt)
    }

    fn notify_sales(&self, order: &NewOrder) {
        let email = notification(order, &self.write.site.name, &self.write.site.sales_email);
        let write = self.write.clone();
        let context = ReportContext::new("order.notify").tag("order_id", &order.id);

        tokio::spawn(async move {
            let mailer = write.mailer.clone();
            if write
                .perform(context, || mailer.send(&email))
                .await
                .is_ok()
            {
                debug!(to = %email.to, "Order notification sent");
            }
        });
    }
}

fn notification(order: &NewOrder, site_name: &str, sales_email: &str) -> OutgoingEmail {
    let receipt = order.receipt();
    let mut text = format!(
        "Order {}\nTemplate: {}\nAmount: {}\nPayment: {}\n\nCustomer: {}\nEmail: {}\nPhone: {}\n",
        receipt.reference,
        order.template_slug,
        format_price(order.amount_cents, &order.currency),
        order.payment_platform.label(),
        order.customer_name,
        order.email,
        order.phone,
    );
    if let (Some(name), Some(number)) = (&order.account_name, &order.account_number) {
        text.push_str(&format!("Account: {} ({})\n", name, number));
    }
    if let Some(reference) = &order.transaction_ref {
        text.push_str(&format!("Transaction reference: {}\n", reference));
    }
    if let Some(notes) = &order.notes {
        text.push_str(&format!("\nNotes:\n{}\n", notes));
    }

    OutgoingEmail {
        to: sales_email.to_string(),
        reply_to: Some(order.email.clone()),
        subject: format!(
            "[{}] New order {} for {}",
            site_name, receipt.reference, order.template_slug
        ),
        text,
    }
}
