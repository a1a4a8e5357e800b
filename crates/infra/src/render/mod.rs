//! Page rendering adapters
//!
//! [`DashboardRenderer`] implements [`clout_core::PageRenderer`] and emits a
//! single self-contained HTML document.

mod dashboard;

pub use dashboard::{escape_html, DashboardRenderer, ProfileLink};
