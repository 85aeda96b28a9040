//! # oohdesk
//!
//! Operations backend for out-of-home advertising companies, usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! oohdesk = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use oohdesk::config::IntegrationsConfig;
//! use oohdesk::integrations::Integrations;
//! use oohdesk::inventory::LowStockMonitor;
//! use oohdesk::server::{AppState, create_router};
//! use oohdesk::store::SqliteStore;
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/oohdesk.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     PathBuf::from("./data"),
//!     None,
//!     Integrations::from_config(&IntegrationsConfig::default()).unwrap(),
//!     Arc::new(LowStockMonitor::new(5)),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `oohdesk` binary. Disable with `default-features = false`.

pub mod access;
pub mod auth;
pub mod cms;
pub mod config;
pub mod error;
pub mod integrations;
pub mod inventory;
pub mod server;
pub mod store;
pub mod types;
