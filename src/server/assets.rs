//! Static asset constants.

/// Stylesheet for the site.
pub const CSS: &str = include_str!("styles.css");
