//! viewdeck-server: the content proxy.
//!
//! Serves `/proxy` (fetch, rewrite and instrument a page for embedding) and
//! `/fetch-html` (raw upstream HTML for analysis).

pub mod config;
pub mod error;
pub mod handlers;
pub mod proxy;
pub mod router;
pub mod state;
