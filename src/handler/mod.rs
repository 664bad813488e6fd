//! Handler definition model.
//!
//! A handler is a value implementing [`HxHandler`]: a typed
//! configuration object plus lifecycle hooks. Behavior beyond plain
//! GET/POST rendering is composed from capabilities - the dispatcher
//! asks which of [`FormHandler`], [`DeleteHandler`] and
//! [`ModalConfig`] a concrete handler exposes and routes accordingly,
//! so there is no inheritance chain to untangle at dispatch time.

mod form;
mod modal;

pub use form::{FormErrors, FormHandler, FormOutcome};
pub use modal::{ModalConfig, CLOSE_MODAL_TRIGGER};

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::dispatch::DispatchContext;
use crate::error::{HxError, Result};

/// Templates to render for one verb.
///
/// Unset falls back to the view's own template at render time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Templates {
    /// Nothing configured; use the view's template.
    #[default]
    Unset,
    /// A single template.
    One(String),
    /// Several templates, rendered in order and concatenated.
    Many(Vec<String>),
}

impl Templates {
    /// Is this the unset default?
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Concrete template list, taking the view's template as fallback.
    pub(crate) fn resolve(&self, fallback: Option<&str>) -> Result<Vec<String>> {
        match self {
            Self::Unset => fallback
                .map(|template| vec![template.to_string()])
                .ok_or_else(|| {
                    HxError::Config(
                        "handler configures no template and the view has none".into(),
                    )
                }),
            Self::One(template) => Ok(vec![template.clone()]),
            Self::Many(templates) if templates.is_empty() => Err(HxError::Config(
                "handler configures an empty template list".into(),
            )),
            Self::Many(templates) => Ok(templates.clone()),
        }
    }
}

impl From<&str> for Templates {
    fn from(template: &str) -> Self {
        Self::One(template.to_string())
    }
}

impl From<Vec<String>> for Templates {
    fn from(templates: Vec<String>) -> Self {
        Self::Many(templates)
    }
}

/// Blocks to render instead of whole templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Blocks {
    /// Render templates whole.
    #[default]
    None,
    /// Named blocks of a single template.
    Named(Vec<String>),
    /// Template-to-block mapping for multi-template handlers.
    PerTemplate(BTreeMap<String, String>),
}

impl Blocks {
    /// A single named block.
    pub fn one(block: impl Into<String>) -> Self {
        Self::Named(vec![block.into()])
    }
}

/// Typed configuration for one handler: what to render and how to
/// shape the response.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Templates rendered on GET.
    pub get_template: Templates,
    /// Templates rendered on POST.
    pub post_template: Templates,
    /// Blocks used on GET.
    pub get_blocks: Blocks,
    /// Blocks used on POST.
    pub post_blocks: Blocks,
    /// Reload the full page after a POST.
    pub refresh_page: bool,
    /// Navigate to this URL after a POST.
    pub redirect: Option<String>,
    /// Return an empty body after a POST.
    pub return_empty: bool,
    /// Suppress the client-side swap entirely.
    pub no_swap: bool,
    /// Attach queued messages to the response (when messages are
    /// enabled globally).
    pub show_messages: bool,
    /// Run the view's own GET lifecycle and reuse its context. Opting
    /// out skips the view's context computation entirely.
    pub use_view_context: bool,
    /// Re-pull the view context after a POST mutation.
    pub refresh_view_context_on_post: bool,
    /// Merge decoded params directly into the context instead of
    /// nesting them under `"hx_kwargs"`.
    pub kwargs_as_context: bool,
    /// Merge query params from the browser's current URL into the
    /// request, as if the fragment were invoked from that page.
    pub use_current_url: bool,
    /// Context key the attached object is exposed under.
    pub object_context_key: String,
}

impl HandlerConfig {
    /// Defaults: view context and messages on, everything else off.
    pub fn new() -> Self {
        Self {
            get_template: Templates::Unset,
            post_template: Templates::Unset,
            get_blocks: Blocks::None,
            post_blocks: Blocks::None,
            refresh_page: false,
            redirect: None,
            return_empty: false,
            no_swap: false,
            show_messages: true,
            use_view_context: true,
            refresh_view_context_on_post: false,
            kwargs_as_context: true,
            use_current_url: false,
            object_context_key: "hx_object".to_string(),
        }
    }

    /// Set the GET template(s).
    pub fn get_template(mut self, templates: impl Into<Templates>) -> Self {
        self.get_template = templates.into();
        self
    }

    /// Set the POST template(s).
    pub fn post_template(mut self, templates: impl Into<Templates>) -> Self {
        self.post_template = templates.into();
        self
    }

    /// Set the GET blocks.
    pub fn get_blocks(mut self, blocks: Blocks) -> Self {
        self.get_blocks = blocks;
        self
    }

    /// Set the POST blocks.
    pub fn post_blocks(mut self, blocks: Blocks) -> Self {
        self.post_blocks = blocks;
        self
    }

    /// Reload the page after a POST.
    pub fn refresh_page(mut self, yes: bool) -> Self {
        self.refresh_page = yes;
        self
    }

    /// Redirect after a POST.
    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.redirect = Some(url.into());
        self
    }

    /// Return an empty body after a POST.
    pub fn return_empty(mut self, yes: bool) -> Self {
        self.return_empty = yes;
        self
    }

    /// Suppress the client-side swap.
    pub fn no_swap(mut self, yes: bool) -> Self {
        self.no_swap = yes;
        self
    }

    /// Attach queued messages to the response.
    pub fn show_messages(mut self, yes: bool) -> Self {
        self.show_messages = yes;
        self
    }

    /// Reuse the view's context (or skip computing it).
    pub fn use_view_context(mut self, yes: bool) -> Self {
        self.use_view_context = yes;
        self
    }

    /// Re-pull the view context after a POST.
    pub fn refresh_view_context_on_post(mut self, yes: bool) -> Self {
        self.refresh_view_context_on_post = yes;
        self
    }

    /// Nest params under `"hx_kwargs"` instead of merging them in.
    pub fn kwargs_as_context(mut self, yes: bool) -> Self {
        self.kwargs_as_context = yes;
        self
    }

    /// Merge the browser's current-URL query params into the request.
    pub fn use_current_url(mut self, yes: bool) -> Self {
        self.use_current_url = yes;
        self
    }

    /// Context key for the attached object.
    pub fn object_context_key(mut self, key: impl Into<String>) -> Self {
        self.object_context_key = key.into();
        self
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A dispatchable fragment handler.
///
/// One instance is created per request by its registered factory. The
/// default lifecycle renders the configured templates with the
/// assembled context; handlers override the hooks they need and expose
/// capabilities for form, delete and modal behavior.
pub trait HxHandler: Send {
    /// Response-shaping configuration.
    fn config(&self) -> &HandlerConfig;

    /// Extra context merged in on GET only.
    fn context_on_get(&self, ctx: &DispatchContext<'_>) -> Result<Map<String, Value>> {
        let _ = ctx;
        Ok(Map::new())
    }

    /// Extra context merged in on POST only.
    fn context_on_post(&self, ctx: &DispatchContext<'_>) -> Result<Map<String, Value>> {
        let _ = ctx;
        Ok(Map::new())
    }

    /// Client events to trigger with the response.
    fn triggers(&self, ctx: &DispatchContext<'_>) -> Vec<String> {
        let _ = ctx;
        Vec::new()
    }

    /// Form capability, when this handler processes a form submission.
    fn form(&mut self) -> Option<&mut dyn FormHandler> {
        None
    }

    /// Delete capability, when a POST deletes the attached object.
    fn deletable(&mut self) -> Option<&mut dyn DeleteHandler> {
        None
    }

    /// Modal rendering, when the fragment is shown in the shared modal.
    fn modal(&self) -> Option<&ModalConfig> {
        None
    }
}

/// Deletes the referenced object on POST.
pub trait DeleteHandler {
    /// Remove the object. The default deletes the attached `hx_object`.
    fn delete(&mut self, ctx: &mut DispatchContext<'_>) -> Result<()> {
        match ctx.object.as_ref() {
            Some(object) => object.delete(),
            None => Err(HxError::Config(
                "delete handler dispatched without an object reference".into(),
            )),
        }
    }

    /// Message queued after a successful delete.
    fn success_message(&self, ctx: &DispatchContext<'_>) -> String {
        match ctx.object_display_name() {
            Some(name) => format!("{name} deleted successfully."),
            None => "Deleted successfully".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = HandlerConfig::new();
        assert!(config.get_template.is_unset());
        assert!(config.show_messages);
        assert!(config.use_view_context);
        assert!(config.kwargs_as_context);
        assert!(!config.refresh_page);
        assert!(!config.use_current_url);
        assert_eq!(config.object_context_key, "hx_object");
    }

    #[test]
    fn test_config_builder_chaining() {
        let config = HandlerConfig::new()
            .get_template("widget_row.html")
            .post_template("widget_row.html")
            .get_blocks(Blocks::one("row"))
            .refresh_page(true)
            .use_current_url(true)
            .object_context_key("widget");
        assert_eq!(config.get_template, Templates::One("widget_row.html".into()));
        assert_eq!(config.get_blocks, Blocks::Named(vec!["row".into()]));
        assert!(config.refresh_page);
        assert!(config.use_current_url);
        assert_eq!(config.object_context_key, "widget");
    }

    #[test]
    fn test_templates_resolve_fallback() {
        let unset = Templates::Unset;
        assert_eq!(
            unset.resolve(Some("page.html")).unwrap(),
            vec!["page.html".to_string()]
        );
        assert!(matches!(unset.resolve(None), Err(HxError::Config(_))));

        let one = Templates::One("row.html".into());
        assert_eq!(one.resolve(None).unwrap(), vec!["row.html".to_string()]);
    }

    #[test]
    fn test_templates_resolve_rejects_empty_list() {
        let empty = Templates::Many(Vec::new());
        assert!(matches!(empty.resolve(None), Err(HxError::Config(_))));
    }
}
