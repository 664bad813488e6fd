//! Application context and builder.
//!
//! [`HxCore`] replaces a process-global registry: it owns the handler
//! table, the configuration and the host seams, is created once at
//! process start, and is shared by reference across request threads.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hx_dispatch::HxCore;
//!
//! let core = HxCore::builder()
//!     .app("blog", "apps/blog/src")
//!     .module_symbol("blog::hx_handlers", "CommentForm", Arc::new(comment_form))
//!     .renderer(Arc::new(TeraRenderer::new("templates/**/*")))
//!     .object_store(Arc::new(OrmStore::new(pool)))
//!     .build();
//!
//! let response = core.dispatch(&view, request)?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::codec::{DomainObject, ObjectRef, ObjectStore};
use crate::config::HxConfig;
use crate::dispatch::{self, View};
use crate::error::{HxError, Result};
use crate::message::{FlashStore, Messages};
use crate::protocol::{Request, Response};
use crate::registry::{AppHandle, HandlerFactory, ModuleLoader, Registry, StaticModuleLoader};
use crate::render::Renderer;

/// Explicit application context: the registry plus everything the
/// dispatcher needs to serve a request.
pub struct HxCore {
    registry: Registry,
    config: HxConfig,
    apps: Vec<AppHandle>,
    loader: Arc<dyn ModuleLoader>,
    object_store: Arc<dyn ObjectStore>,
    renderer: Arc<dyn Renderer>,
    flash_store: Option<Arc<dyn FlashStore>>,
}

impl HxCore {
    /// Start building a context.
    pub fn builder() -> HxCoreBuilder {
        HxCoreBuilder::new()
    }

    /// The configuration surface.
    pub fn config(&self) -> &HxConfig {
        &self.config
    }

    /// The handler registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn loader(&self) -> &dyn ModuleLoader {
        self.loader.as_ref()
    }

    pub(crate) fn object_store(&self) -> &dyn ObjectStore {
        self.object_store.as_ref()
    }

    pub(crate) fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Dispatch one request against the given view.
    ///
    /// The registry initializes on the first dispatch (or any other
    /// first lookup), not at construction.
    pub fn dispatch(&self, view: &dyn View, request: Request) -> Result<Response> {
        self.registry.initialize(&self.apps)?;
        dispatch::run(self, view, request)
    }

    /// Force-resolve every registered handler and return the names
    /// that load cleanly. Introspection and debugging only.
    pub fn handler_names(&self) -> Result<Vec<String>> {
        self.registry.initialize(&self.apps)?;
        Ok(self
            .registry
            .get_all(self.loader.as_ref())
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Clear registry state so the next dispatch rescans. Test
    /// isolation only.
    pub fn reset_registry(&self) {
        self.registry.reset();
    }

    /// Move queued messages into the host's flash store (or drop them
    /// when no store is wired).
    pub(crate) fn forward_messages(&self, messages: &mut Messages) {
        match &self.flash_store {
            Some(store) => {
                for message in messages.drain() {
                    store.push(message);
                }
            }
            None => {
                let dropped = messages.drain().len();
                debug!(dropped, "no flash store configured; dropping messages");
            }
        }
    }
}

/// Fluent construction for [`HxCore`].
pub struct HxCoreBuilder {
    config: HxConfig,
    apps: Vec<AppHandle>,
    static_loader: StaticModuleLoader,
    loader: Option<Arc<dyn ModuleLoader>>,
    object_store: Option<Arc<dyn ObjectStore>>,
    renderer: Option<Arc<dyn Renderer>>,
    flash_store: Option<Arc<dyn FlashStore>>,
}

impl HxCoreBuilder {
    /// Builder with default configuration and empty seams.
    pub fn new() -> Self {
        Self {
            config: HxConfig::default(),
            apps: Vec::new(),
            static_loader: StaticModuleLoader::new(),
            loader: None,
            object_store: None,
            renderer: None,
            flash_store: None,
        }
    }

    /// Use this configuration.
    pub fn config(mut self, config: HxConfig) -> Self {
        self.config = config;
        self
    }

    /// Register an installed app whose handler modules get scanned.
    pub fn app(mut self, label: &str, root: impl Into<PathBuf>) -> Self {
        self.apps.push(AppHandle::new(label, root));
        self
    }

    /// Register a loadable symbol with the built-in static loader.
    pub fn module_symbol(
        mut self,
        module: &str,
        symbol: &str,
        factory: Arc<dyn HandlerFactory>,
    ) -> Self {
        self.static_loader.insert(module, symbol, factory);
        self
    }

    /// Replace the module loader wholesale. Symbols registered with
    /// [`module_symbol`](Self::module_symbol) are ignored when set.
    pub fn loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Wire the domain-object store.
    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Wire the template renderer.
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Wire the persistent flash-message store.
    pub fn flash_store(mut self, store: Arc<dyn FlashStore>) -> Self {
        self.flash_store = Some(store);
        self
    }

    /// Build the context.
    pub fn build(self) -> HxCore {
        HxCore {
            registry: Registry::new(),
            config: self.config,
            apps: self.apps,
            loader: self
                .loader
                .unwrap_or_else(|| Arc::new(self.static_loader)),
            object_store: self
                .object_store
                .unwrap_or_else(|| Arc::new(NullObjectStore)),
            renderer: self.renderer.unwrap_or_else(|| Arc::new(NullRenderer)),
            flash_store: self.flash_store,
        }
    }
}

impl Default for HxCoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Store used when the host wires none: every reference dangles.
struct NullObjectStore;

impl ObjectStore for NullObjectStore {
    fn get(&self, _reference: &ObjectRef) -> Option<Box<dyn DomainObject>> {
        None
    }
}

/// Renderer used when the host wires none: rendering is a
/// configuration error.
struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&self, _template: &str, _block: Option<&str>, _context: &Value) -> Result<String> {
        Err(HxError::Config("no renderer configured".into()))
    }
}
