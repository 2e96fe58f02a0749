//! Storefront - server-rendered catalog of website templates.
//!
//! Serves the presentation pages, the templates catalog, and the contact and
//! order forms, with bounded retries, fault classification, and per-client
//! rate governance around every database read and every write action.

pub mod cli;
pub mod config;
pub mod faults;
pub mod mailer;
pub mod models;
pub mod monitoring;
pub mod rate_limit;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
