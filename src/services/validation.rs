//! Structural validation for the contact and order forms.
//!
//! Validation never touches the network or the database. Every problem is
//! collected per field so the form can be re-rendered with all messages at
//! once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::PaymentPlatform;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
    )
    .unwrap()
});
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9 +()\-]{7,20}$").unwrap());
static TEMPLATE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,63}$").unwrap());
static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,7}(\.\d{1,2})?$").unwrap());
static ACCOUNT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z \-]{4,34}$").unwrap());

pub const EMAIL_MAX: usize = 254;
pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const SUBJECT_MAX: usize = 150;
pub const MESSAGE_MIN: usize = 10;
pub const MESSAGE_MAX: usize = 5000;
pub const TRANSACTION_REF_MAX: usize = 64;
pub const NOTES_MAX: usize = 1000;

/// Field name → first problem found for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem. Only the first message per field is kept.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Message for `field`, or `""` when the field is fine.
    pub fn message(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&&'static str, &String)> {
        self.0.iter()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Raw contact form as posted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
}

/// A contact submission that passed validation. Strings are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

/// Raw order form as posted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrderInput {
    pub template: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub amount: String,
    pub payment_platform: String,
    pub account_name: String,
    pub account_number: String,
    pub transaction_ref: String,
    pub notes: String,
}

/// An order submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOrder {
    pub template_slug: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub amount_cents: i64,
    pub payment_platform: PaymentPlatform,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn optional(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn check_name(errors: &mut FieldErrors, field: &'static str, value: &str) {
    let len = char_len(value);
    if len == 0 {
        errors.add(field, "Name is required");
    } else if len < NAME_MIN {
        errors.add(field, "Name is too short");
    } else if len > NAME_MAX {
        errors.add(field, "Name is too long");
    }
}

fn check_email(errors: &mut FieldErrors, value: &str) {
    if value.is_empty() {
        errors.add("email", "Email is required");
    } else if char_len(value) > EMAIL_MAX {
        errors.add("email", "Email is too long");
    } else if !EMAIL.is_match(value) {
        errors.add("email", "Enter a valid email address");
    }
}

/// Lowercase slug: starts alphanumeric, at most 64 characters.
pub fn is_template_identifier(value: &str) -> bool {
    TEMPLATE_ID.is_match(value)
}

/// Digits, spaces, `+()-`; 7 to 20 characters with at least 7 digits.
pub fn is_valid_phone(value: &str) -> bool {
    PHONE.is_match(value) && value.chars().filter(|c| c.is_ascii_digit()).count() >= 7
}

fn check_phone(errors: &mut FieldErrors, value: &str, required: bool) {
    if value.is_empty() {
        if required {
            errors.add("phone", "Phone number is required");
        }
    } else if !is_valid_phone(value) {
        errors.add("phone", "Enter a valid phone number");
    }
}

fn check_max(errors: &mut FieldErrors, field: &'static str, value: &str, max: usize, label: &str) {
    if char_len(value) > max {
        errors.add(field, format!("{} must be at most {} characters", label, max));
    }
}

/// Parse a decimal amount in major units into minor units.
///
/// Accepts up to seven integer digits and at most two decimals. Returns
/// `None` for malformed input.
pub fn parse_amount_cents(value: &str) -> Option<i64> {
    if !AMOUNT.is_match(value) {
        return None;
    }
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    Some(whole * 100 + fraction)
}

/// Validate a contact submission.
pub fn validate_contact(input: &ContactInput) -> Result<ValidContact, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = input.name.trim();
    let email = input.email.trim();
    let phone = input.phone.trim();
    let subject = input.subject.trim();
    let message = input.message.trim();

    check_name(&mut errors, "name", name);
    check_email(&mut errors, email);
    check_phone(&mut errors, phone, false);
    check_max(&mut errors, "subject", subject, SUBJECT_MAX, "Subject");

    let message_len = char_len(message);
    if message_len == 0 {
        errors.add("message", "Message is required");
    } else if message_len < MESSAGE_MIN {
        errors.add("message", "Message is too short");
    } else if message_len > MESSAGE_MAX {
        errors.add("message", "Message is too long");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidContact {
        name: name.to_string(),
        email: email.to_string(),
        phone: optional(phone),
        subject: optional(subject),
        message: message.to_string(),
    })
}

/// Validate an order submission.
///
/// Cash orders need no account details; every other platform needs both the
/// account name and number.
pub fn validate_order(input: &OrderInput) -> Result<ValidOrder, FieldErrors> {
    let mut errors = FieldErrors::new();

    let template = input.template.trim();
    let customer_name = input.customer_name.trim();
    let email = input.email.trim();
    let phone = input.phone.trim();
    let amount = input.amount.trim();
    let account_name = input.account_name.trim();
    let account_number = input.account_number.trim();
    let transaction_ref = input.transaction_ref.trim();
    let notes = input.notes.trim();

    if template.is_empty() {
        errors.add("template", "Choose a template");
    } else if !TEMPLATE_ID.is_match(template) {
        errors.add("template", "Unknown template identifier");
    }

    check_name(&mut errors, "customer_name", customer_name);
    check_email(&mut errors, email);
    check_phone(&mut errors, phone, true);

    let amount_cents = if amount.is_empty() {
        errors.add("amount", "Amount is required");
        None
    } else {
        match parse_amount_cents(amount) {
            Some(cents) if cents > 0 => Some(cents),
            Some(_) => {
                errors.add("amount", "Amount must be greater than zero");
                None
            }
            None => {
                errors.add("amount", "Enter an amount like 1500 or 1500.00");
                None
            }
        }
    };

    let platform = match PaymentPlatform::from_str(input.payment_platform.trim()) {
        Some(platform) => Some(platform),
        None => {
            errors.add("payment_platform", "Choose a payment method");
            None
        }
    };

    if platform.is_some_and(|p| p.requires_account()) {
        let len = char_len(account_name);
        if len == 0 {
            errors.add("account_name", "Account name is required for this payment method");
        } else if !(NAME_MIN..=NAME_MAX).contains(&len) {
            errors.add("account_name", "Account name must be 2 to 100 characters");
        }

        if account_number.is_empty() {
            errors.add(
                "account_number",
                "Account number is required for this payment method",
            );
        } else if !ACCOUNT_NUMBER.is_match(account_number) {
            errors.add("account_number", "Enter a valid account number");
        }
    }

    check_max(
        &mut errors,
        "transaction_ref",
        transaction_ref,
        TRANSACTION_REF_MAX,
        "Transaction reference",
    );
    check_max(&mut errors, "notes", notes, NOTES_MAX, "Notes");

    let (Some(amount_cents), Some(payment_platform)) = (amount_cents, platform) else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    let (account_name, account_number) = if payment_platform.requires_account() {
        (optional(account_name), optional(account_number))
    } else {
        (None, None)
    };

    Ok(ValidOrder {
        template_slug: template.to_string(),
        customer_name: customer_name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        amount_cents,
        payment_platform,
        account_name,
        account_number,
        transaction_ref: optional(transaction_ref),
        notes: optional(notes),
    })
}
