//! # hx-dispatch
//!
//! Fragment-handler dispatch and authorization for server-rendered
//! views.
//!
//! A single URL endpoint keeps serving its normal page view while a
//! family of named fragment handlers - addressed by the `HX-Request`
//! header plus `hx_request_name` query parameter - renders partial
//! updates through the same endpoint.
//!
//! ## Architecture
//!
//! - **Registry** ([`registry`]): discovers handlers by statically
//!   scanning each installed app's `hx_handlers` modules (no code
//!   execution), then loads lazily on first use through the
//!   [`registry::ModuleLoader`] seam.
//! - **Policy engine** ([`policy`]): layered allow rules with strict
//!   precedence - authentication gate, global allow-spec, view-local
//!   lists, same-owner defaults. Denials surface as plain 404s.
//! - **Dispatcher** ([`dispatch`]): detects the protocol marker,
//!   resolves and authorizes the handler, binds it to the view and the
//!   request, and routes the verb to the handler instead of the view.
//!   Requests without the marker reach the view untouched.
//! - **Codec** ([`codec`]): round-trips auxiliary parameters and
//!   opaque domain-object references through the query string;
//!   [`urls`] builds the matching `hx-get`/`hx-post` URLs.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hx_dispatch::handler::{HandlerConfig, HxHandler};
//! use hx_dispatch::{HxCore, Request};
//!
//! struct WidgetRow {
//!     config: HandlerConfig,
//! }
//!
//! impl WidgetRow {
//!     pub const NAME: &'static str = "widget_row";
//! }
//!
//! impl HxHandler for WidgetRow {
//!     fn config(&self) -> &HandlerConfig {
//!         &self.config
//!     }
//! }
//!
//! let core = HxCore::builder()
//!     .app("shop", "apps/shop/src")
//!     .module_symbol(
//!         "shop::hx_handlers",
//!         "WidgetRow",
//!         Arc::new(|| {
//!             Box::new(WidgetRow {
//!                 config: HandlerConfig::new().get_template("widget_row.html"),
//!             }) as Box<dyn HxHandler>
//!         }),
//!     )
//!     .renderer(renderer)
//!     .build();
//!
//! let response = core.dispatch(&view, Request::get("/widgets"))?;
//! ```

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod message;
pub mod policy;
pub mod protocol;
pub mod registry;
pub mod render;
pub mod urls;

mod core;

pub use crate::core::{HxCore, HxCoreBuilder};
pub use config::HxConfig;
pub use dispatch::{DispatchContext, View};
pub use error::{HxError, Result};
pub use protocol::{Request, Response};
