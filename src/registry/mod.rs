//! Handler registry - two-phase name resolution.
//!
//! Population is a cheap, side-effect-free discovery pass: each
//! installed app's handler modules are parsed statically (see
//! [`scan`]), and every declared name becomes a deferred entry. The
//! real loading cost is paid lazily, on the first lookup of each name,
//! through the [`ModuleLoader`] seam - and a successful load upgrades
//! the entry in place so later lookups skip it.
//!
//! Failure rules, in one place:
//!
//! - duplicate names at scan time are fatal;
//! - unreadable or unparsable files are skipped silently, so one
//!   broken module cannot take the whole application down;
//! - load-time failures are soft: the lookup reports a miss, the
//!   failure is not cached, and a later lookup retries.

mod loader;
mod scan;

pub use loader::{HandlerFactory, LoadError, ModuleLoader, StaticModuleLoader};
pub use scan::{collect_modules, scan_source, Declaration, SourceModule, HANDLER_MODULE};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use crate::error::{HxError, Result};

/// An installed application whose handler modules should be scanned.
#[derive(Debug, Clone)]
pub struct AppHandle {
    /// Owner label, used for module paths and authorization defaults.
    pub label: String,
    /// Root directory of the app's source tree.
    pub root: PathBuf,
}

impl AppHandle {
    /// Describe an app by label and source root.
    pub fn new(label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            root: root.into(),
        }
    }
}

/// How a registry entry currently resolves.
enum Resolution {
    /// Discovered by the scanner, not yet loaded.
    Deferred { module: String, symbol: String },
    /// Loaded and validated; cached for the process lifetime.
    Loaded(Arc<dyn HandlerFactory>),
}

struct HandlerEntry {
    owner: String,
    resolution: Resolution,
}

/// A successfully resolved handler: its owner plus the factory.
pub struct ResolvedHandler {
    /// App that defines the handler.
    pub owner: String,
    /// Factory building one instance per request.
    pub factory: Arc<dyn HandlerFactory>,
}

/// Name-to-handler table shared by every request thread.
///
/// Owned by the application context rather than living in a process
/// global, so tests get isolation by constructing their own.
pub struct Registry {
    entries: RwLock<HashMap<String, HandlerEntry>>,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
}

impl Registry {
    /// Empty, uninitialized registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    /// Has the discovery pass completed?
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Run the discovery pass over every app, exactly once per
    /// registry lifetime.
    ///
    /// Safe to call from any number of threads: the steady state is a
    /// single atomic read, and concurrent first callers block on the
    /// init lock instead of racing the scan.
    pub fn initialize(&self, apps: &[AppHandle]) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Re-check: another thread may have finished the scan while we
        // waited for the lock.
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        for app in apps {
            for source in scan::collect_modules(&app.label, &app.root) {
                self.scan_module(&source, &app.label)?;
            }
        }

        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn scan_module(&self, source: &SourceModule, owner: &str) -> Result<()> {
        let text = match std::fs::read_to_string(&source.path) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %source.path.display(), %err, "skipping unreadable handler module");
                return Ok(());
            }
        };
        let Some(declarations) = scan::scan_source(&text) else {
            debug!(path = %source.path.display(), "skipping unparsable handler module");
            return Ok(());
        };

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for declaration in declarations {
            if entries.contains_key(&declaration.name) {
                return Err(HxError::DuplicateHandler(declaration.name));
            }
            entries.insert(
                declaration.name,
                HandlerEntry {
                    owner: owner.to_string(),
                    resolution: Resolution::Deferred {
                        module: source.module.clone(),
                        symbol: declaration.symbol,
                    },
                },
            );
        }
        Ok(())
    }

    /// Manual registration, bypassing the scanner. Same uniqueness
    /// invariant as scanned entries.
    pub fn register(
        &self,
        name: &str,
        owner: &str,
        factory: Arc<dyn HandlerFactory>,
    ) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return Err(HxError::DuplicateHandler(name.to_string()));
        }
        entries.insert(
            name.to_string(),
            HandlerEntry {
                owner: owner.to_string(),
                resolution: Resolution::Loaded(factory),
            },
        );
        Ok(())
    }

    /// Look up a handler by name, loading lazily on first use.
    ///
    /// Returns `None` both for unknown names and for entries whose
    /// resolution fails. Failures are not cached: a later call retries,
    /// so a loader that becomes able to serve the module still wins.
    pub fn get(&self, name: &str, loader: &dyn ModuleLoader) -> Option<ResolvedHandler> {
        let (module, symbol, owner) = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            let entry = entries.get(name)?;
            match &entry.resolution {
                Resolution::Loaded(factory) => {
                    return Some(ResolvedHandler {
                        owner: entry.owner.clone(),
                        factory: factory.clone(),
                    });
                }
                Resolution::Deferred { module, symbol } => {
                    (module.clone(), symbol.clone(), entry.owner.clone())
                }
            }
        };

        // Two threads can reach this point for the same entry; both
        // ask the loader and both upgrades install the same factory.
        // Duplicate work, never corruption.
        match loader.resolve(&module, &symbol) {
            Ok(factory) => {
                let mut entries = self
                    .entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                if let Some(entry) = entries.get_mut(name) {
                    entry.resolution = Resolution::Loaded(factory.clone());
                }
                Some(ResolvedHandler { owner, factory })
            }
            Err(err) => {
                debug!(name, %err, "handler resolution failed");
                None
            }
        }
    }

    /// Force resolution of every entry; returns the entries that
    /// resolved successfully, sorted by name. For introspection and
    /// debugging.
    pub fn get_all(&self, loader: &dyn ModuleLoader) -> Vec<(String, ResolvedHandler)> {
        let mut names: Vec<String> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.keys().cloned().collect()
        };
        names.sort();
        names
            .into_iter()
            .filter_map(|name| {
                let resolved = self.get(&name, loader)?;
                Some((name, resolved))
            })
            .collect()
    }

    /// Number of registered names (resolved or deferred).
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Is the table empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all state. Test isolation only.
    pub fn reset(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.initialized.store(false, Ordering::Release);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
