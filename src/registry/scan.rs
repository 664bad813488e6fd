//! Static source scanner - handler discovery without execution.
//!
//! Discovery parses handler modules with `syn` instead of loading
//! them: a handler declares its name as an associated string constant,
//!
//! ```ignore
//! pub struct CommentForm;
//!
//! impl CommentForm {
//!     pub const NAME: &'static str = "comment_form";
//! }
//! ```
//!
//! and the scanner records `(name, type)` pairs from every top-level
//! `impl` block. The const's type annotation is not inspected, so
//! `&str`, `&'static str` and aliases all work. Whether the type
//! actually is a handler only becomes known when the module loader
//! resolves it.

use std::path::{Path, PathBuf};

use syn::{Expr, ImplItem, Item, Lit, Type};

/// Conventional module name for fragment handlers at an app's root.
pub const HANDLER_MODULE: &str = "hx_handlers";

/// Name of the scanned constant.
const NAME_CONST: &str = "NAME";

/// A discovered declaration: handler name plus the declaring type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Value of the `NAME` constant.
    pub name: String,
    /// Identifier of the type the `impl` block is for.
    pub symbol: String,
}

/// One file to parse: its path on disk plus the derived module path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceModule {
    /// Location of the source file.
    pub path: PathBuf,
    /// Module path the loader will be asked for, e.g.
    /// `blog::hx_handlers::comments`.
    pub module: String,
}

/// Extract handler declarations from one source file's text.
///
/// Returns `None` when the source does not parse; the caller decides
/// how to report it. A parse failure in one file must never affect
/// sibling files.
pub fn scan_source(source: &str) -> Option<Vec<Declaration>> {
    let file = syn::parse_file(source).ok()?;
    let mut found = Vec::new();

    for item in &file.items {
        let Item::Impl(item_impl) = item else {
            continue;
        };
        let Some(symbol) = impl_self_ident(item_impl) else {
            continue;
        };
        for impl_item in &item_impl.items {
            let ImplItem::Const(item_const) = impl_item else {
                continue;
            };
            if item_const.ident != NAME_CONST {
                continue;
            }
            if let Expr::Lit(expr) = &item_const.expr {
                if let Lit::Str(lit) = &expr.lit {
                    found.push(Declaration {
                        name: lit.value(),
                        symbol: symbol.clone(),
                    });
                }
            }
        }
    }

    Some(found)
}

fn impl_self_ident(item_impl: &syn::ItemImpl) -> Option<String> {
    match item_impl.self_ty.as_ref() {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        _ => None,
    }
}

/// Collect the handler source modules of one app: `hx_handlers.rs` at
/// the app root, plus every `.rs` file under `hx_handlers/`
/// (recursively, `mod.rs` excluded).
pub fn collect_modules(label: &str, root: &Path) -> Vec<SourceModule> {
    let mut modules = Vec::new();

    let file = root.join(format!("{HANDLER_MODULE}.rs"));
    if file.is_file() {
        modules.push(SourceModule {
            path: file,
            module: format!("{label}::{HANDLER_MODULE}"),
        });
    }

    let dir = root.join(HANDLER_MODULE);
    if dir.is_dir() {
        collect_dir(&dir, &format!("{label}::{HANDLER_MODULE}"), &mut modules);
    }

    modules
}

fn collect_dir(dir: &Path, prefix: &str, out: &mut Vec<SourceModule>) {
    // An unreadable directory is treated like an unreadable file:
    // nothing to register here.
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::debug!(dir = %dir.display(), "skipping unreadable handler directory");
        return;
    };

    let mut entries: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                collect_dir(&path, &format!("{prefix}::{name}"), out);
            }
            continue;
        }
        if path.extension().map_or(true, |ext| ext != "rs") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem == "mod" {
            continue;
        }
        out.push(SourceModule {
            module: format!("{prefix}::{stem}"),
            path,
        });
    }
}
