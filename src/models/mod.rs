//! Data models for the storefront.

mod order;
mod template;

pub use order::{
    short_reference, NewOrder, Order, OrderReceipt, OrderStatus, PaymentPlatform,
};
pub use template::{
    format_price, ApplicationDetail, ApplicationImport, CatalogFile, CatalogTemplate,
    TemplateApplication, TemplateDetail, TemplateImport,
};
