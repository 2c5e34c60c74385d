//! viewdeck-core: multi-viewport preview workspace.
//!
//! Content rewriting and the navigation protocol used by the proxy, the
//! session reconciler, the panel arrangement engine, viewport geometry,
//! session stores and the assist contracts.

pub mod arrangement;
pub mod assist;
pub mod config;
pub mod error;
pub mod navigation;
pub mod presentation;
pub mod reconcile;
pub mod renderer;
pub mod rewrite;
pub mod store;
pub mod store_memory;
pub mod store_rest;
pub mod types;
pub mod workspace;

pub use error::{WorkspaceError, WorkspaceResult};
pub use store::{FieldWrite, SessionStore};
pub use types::{PanelConfig, PanelState, SessionId, SessionRecord};
pub use workspace::{SessionMode, Workspace};
