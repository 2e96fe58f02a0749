//! HTTP request handlers for the web server.

mod api;
mod catalog;
mod forms;
mod helpers;
mod pages;
mod static_files;

// Re-export handlers for use by the router
pub use api::{api_templates, health};
pub use catalog::{application_detail, list_templates, template_detail};
pub use forms::{contact_page, contact_submit, order_page, order_submit};
pub use pages::{about, home, page_not_found};
pub use static_files::serve_css;
