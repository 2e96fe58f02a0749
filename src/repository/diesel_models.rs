//! Diesel ORM models for database tables.

use diesel::prelude::*;

use crate::schema;

/// Template record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::templates)]
pub struct TemplateRecord {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub category: String,
    pub summary: String,
    pub description: String,
    pub price_cents: i64,
    pub currency: String,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub is_active: i32,
    pub sort_order: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// New template for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::templates)]
pub struct NewTemplate<'a> {
    pub id: &'a str,
    pub slug: &'a str,
    pub name: &'a str,
    pub category: &'a str,
    pub summary: &'a str,
    pub description: &'a str,
    pub price_cents: i64,
    pub currency: &'a str,
    pub preview_url: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub is_active: i32,
    pub sort_order: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Template application record from the database.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = schema::template_applications)]
#[diesel(belongs_to(TemplateRecord, foreign_key = template_id))]
pub struct ApplicationRecord {
    pub id: String,
    pub template_id: String,
    pub name: String,
    pub platform: String,
    pub description: String,
    pub demo_url: Option<String>,
    pub is_active: i32,
    pub created_at: String,
}

/// New template application for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::template_applications)]
pub struct NewApplication<'a> {
    pub id: &'a str,
    pub template_id: &'a str,
    pub name: &'a str,
    pub platform: &'a str,
    pub description: &'a str,
    pub demo_url: Option<&'a str>,
    pub is_active: i32,
    pub created_at: &'a str,
}

/// Order record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::orders)]
pub struct OrderRecord {
    pub id: String,
    pub template_slug: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_platform: String,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub client_ip: String,
    pub created_at: String,
}

/// New order for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::orders)]
pub struct NewOrderRecord<'a> {
    pub id: &'a str,
    pub template_slug: &'a str,
    pub customer_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub payment_platform: &'a str,
    pub account_name: Option<&'a str>,
    pub account_number: Option<&'a str>,
    pub transaction_ref: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub status: &'a str,
    pub client_ip: &'a str,
    pub created_at: &'a str,
}
