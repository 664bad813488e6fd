//! Template rendering seam.

use serde_json::Value;

use crate::error::Result;

/// Renders a template - or one named block of it - with a context.
///
/// The crate ships no template engine; the host wires its own through
/// this trait and reports failures as [`crate::HxError::Render`].
/// Contexts are plain JSON values, which every mainstream engine can
/// consume.
pub trait Renderer: Send + Sync {
    /// Render `template` (restricted to `block` when given) with `context`.
    fn render(&self, template: &str, block: Option<&str>, context: &Value) -> Result<String>;
}
