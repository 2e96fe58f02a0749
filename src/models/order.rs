//! Order models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPlatform {
    Cash,
    BankTransfer,
    MobileMoney,
}

impl PaymentPlatform {
    pub const ALL: [PaymentPlatform; 3] = [Self::Cash, Self::BankTransfer, Self::MobileMoney];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::MobileMoney => "mobile_money",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::BankTransfer => "Bank transfer",
            Self::MobileMoney => "Mobile money",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "bank_transfer" => Some(Self::BankTransfer),
            "mobile_money" => Some(Self::MobileMoney),
            _ => None,
        }
    }

    /// Non-cash payments need the payer's account name and number.
    pub fn requires_account(&self) -> bool {
        !matches!(self, Self::Cash)
    }
}

/// Order lifecycle state. New orders always start as pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A validated order ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: String,
    pub template_slug: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_platform: PaymentPlatform,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub client_ip: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn receipt(&self) -> OrderReceipt {
        OrderReceipt {
            order_id: self.id.clone(),
            reference: short_reference(&self.id),
            template_slug: self.template_slug.clone(),
            amount_cents: self.amount_cents,
            currency: self.currency.clone(),
            payment_platform: self.payment_platform,
        }
    }
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: String,
    pub template_slug: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_platform: PaymentPlatform,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub client_ip: String,
    pub created_at: DateTime<Utc>,
}

/// What the customer sees after a successful order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub reference: String,
    pub template_slug: String,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_platform: PaymentPlatform,
}

/// First eight characters of an order id, uppercased.
pub fn short_reference(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .take(8)
        .collect::<String>()
        .to_uppercase()
}
