//! Handler resolution seam - the module-loading boundary.
//!
//! The scanner records where a handler lives; a [`ModuleLoader`] turns
//! that `(module, symbol)` pair into a live factory. The crate ships
//! [`StaticModuleLoader`], a map the application populates at startup;
//! hosts with their own plugin machinery can implement the trait
//! directly.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::handler::HxHandler;

/// Creates one handler instance per dispatched request.
pub trait HandlerFactory: Send + Sync {
    /// Build a fresh handler for the current request.
    fn create(&self) -> Box<dyn HxHandler>;
}

impl<F> HandlerFactory for F
where
    F: Fn() -> Box<dyn HxHandler> + Send + Sync + 'static,
{
    fn create(&self) -> Box<dyn HxHandler> {
        self()
    }
}

/// Why a deferred registry entry could not be resolved.
///
/// All three cases are soft: the registry reports a miss and retries
/// resolution on a later lookup, so a loader that becomes able to
/// serve the module later still gets its chance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The loader knows no module under this path.
    #[error("module `{0}` is not loadable")]
    ModuleNotFound(String),

    /// The module exists but exports no such symbol.
    #[error("module `{module}` has no symbol `{symbol}`")]
    SymbolNotFound {
        /// Module path asked for.
        module: String,
        /// Missing symbol.
        symbol: String,
    },

    /// The symbol exists but is not a handler factory. Static scanning
    /// cannot check this; it only becomes known at load time.
    #[error("`{module}::{symbol}` is not a handler")]
    NotAHandler {
        /// Module path asked for.
        module: String,
        /// Offending symbol.
        symbol: String,
    },
}

/// Resolves a scanned `(module, symbol)` pair to a handler factory.
pub trait ModuleLoader: Send + Sync {
    /// Load the factory behind a scanned declaration.
    fn resolve(&self, module: &str, symbol: &str) -> Result<Arc<dyn HandlerFactory>, LoadError>;
}

enum Symbol {
    Handler(Arc<dyn HandlerFactory>),
    /// A symbol that exists but is no handler - a stray `NAME` const
    /// on an unrelated type, typically.
    Opaque,
}

/// Map-backed loader populated by application code at startup.
#[derive(Default)]
pub struct StaticModuleLoader {
    modules: HashMap<String, HashMap<String, Symbol>>,
}

impl StaticModuleLoader {
    /// Empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `symbol` under `module` as a handler factory.
    pub fn insert(&mut self, module: &str, symbol: &str, factory: Arc<dyn HandlerFactory>) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(symbol.to_string(), Symbol::Handler(factory));
    }

    /// Register a symbol that exists but is not a handler.
    pub fn insert_opaque(&mut self, module: &str, symbol: &str) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(symbol.to_string(), Symbol::Opaque);
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn resolve(&self, module: &str, symbol: &str) -> Result<Arc<dyn HandlerFactory>, LoadError> {
        let symbols = self
            .modules
            .get(module)
            .ok_or_else(|| LoadError::ModuleNotFound(module.to_string()))?;
        match symbols.get(symbol) {
            Some(Symbol::Handler(factory)) => Ok(factory.clone()),
            Some(Symbol::Opaque) => Err(LoadError::NotAHandler {
                module: module.to_string(),
                symbol: symbol.to_string(),
            }),
            None => Err(LoadError::SymbolNotFound {
                module: module.to_string(),
                symbol: symbol.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerConfig, HxHandler};

    struct Stub(HandlerConfig);
    impl HxHandler for Stub {
        fn config(&self) -> &HandlerConfig {
            &self.0
        }
    }

    fn stub_factory() -> Arc<dyn HandlerFactory> {
        Arc::new(|| Box::new(Stub(HandlerConfig::new())) as Box<dyn HxHandler>)
    }

    #[test]
    fn test_resolve_known_symbol() {
        let mut loader = StaticModuleLoader::new();
        loader.insert("blog::hx_handlers", "CommentForm", stub_factory());
        assert!(loader.resolve("blog::hx_handlers", "CommentForm").is_ok());
    }

    #[test]
    fn test_resolve_unknown_module() {
        let loader = StaticModuleLoader::new();
        assert!(matches!(
            loader.resolve("nope", "CommentForm"),
            Err(LoadError::ModuleNotFound(m)) if m == "nope"
        ));
    }

    #[test]
    fn test_resolve_unknown_symbol() {
        let mut loader = StaticModuleLoader::new();
        loader.insert("blog::hx_handlers", "CommentForm", stub_factory());
        assert!(matches!(
            loader.resolve("blog::hx_handlers", "Other"),
            Err(LoadError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_non_handler_symbol() {
        let mut loader = StaticModuleLoader::new();
        loader.insert_opaque("blog::hx_handlers", "NotReally");
        assert!(matches!(
            loader.resolve("blog::hx_handlers", "NotReally"),
            Err(LoadError::NotAHandler { .. })
        ));
    }

    #[test]
    fn test_closure_factory_builds_fresh_instances() {
        let factory = stub_factory();
        let first = factory.create();
        let second = factory.create();
        assert!(first.config().get_template.is_unset());
        assert!(second.config().get_template.is_unset());
    }
}
