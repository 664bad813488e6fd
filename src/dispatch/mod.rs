//! Dispatcher - view integration for the fragment protocol.
//!
//! Per request the dispatcher walks a fixed state machine: verb gate,
//! protocol detection (no marker means the page view handles the
//! request untouched), handler-name extraction, parameter decoding,
//! registry resolution, authorization, binding, and finally the verb
//! routed to the handler instead of the view. Every resolution or
//! authorization failure collapses into the same not-found response;
//! handler-logic errors propagate to the host untouched.

mod lifecycle;

pub(crate) use lifecycle::FormState;

use http::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::{self, DomainObject, Param, Params};
use crate::core::HxCore;
use crate::error::{HxError, Result};
use crate::handler::{FormOutcome, HxHandler};
use crate::message::Messages;
use crate::policy::{self, PolicyRequest};
use crate::protocol::{headers, Request, Response, NAME_PARAM};

/// The host page view a fragment handler piggybacks on.
///
/// The dispatcher needs very little from the view: its owner for
/// authorization defaults, its verb list, its template as a render
/// fallback, its page context when a handler opts in, and a way to
/// render the page for non-fragment requests.
pub trait View: Send + Sync {
    /// Owning application label.
    fn owner(&self) -> &str;

    /// HTTP verbs this endpoint serves.
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST]
    }

    /// Default template when a handler does not configure its own.
    fn template_name(&self) -> Option<&str> {
        None
    }

    /// View-local allow list of handler names.
    fn allowed_handlers(&self) -> Option<&[String]> {
        None
    }

    /// Broaden the local list with same-owner/global fallback instead
    /// of treating it as exhaustive.
    fn allow_additive(&self) -> bool {
        false
    }

    /// Page context, reused by handlers that opt in.
    fn context(&self, request: &Request) -> Result<Value> {
        let _ = request;
        Ok(Value::Object(Map::new()))
    }

    /// Render the full page - the non-fragment path.
    fn handle(&self, request: &Request) -> Result<Response>;
}

/// Per-request dispatch state handed to the handler lifecycle.
///
/// Created at dispatch start, discarded once the response exists. The
/// view reference is non-owning; the handler never outlives the call.
pub struct DispatchContext<'a> {
    /// The inbound request, with current-URL params merged when the
    /// handler opted in.
    pub request: Request,
    /// The view this endpoint normally renders.
    pub view: &'a dyn View,
    /// Decoded auxiliary parameters.
    pub params: Params,
    /// Referenced domain object, when the request carried one.
    pub object: Option<Box<dyn DomainObject>>,
    /// The view's own context, when the handler asked for it.
    pub view_context: Option<Value>,
    /// Messages queued by handler logic during this request.
    pub messages: Messages,
}

impl<'a> DispatchContext<'a> {
    /// Is this a POST request?
    pub fn is_post(&self) -> bool {
        self.request.method == Method::POST
    }

    /// Display name of the attached object, for default messages.
    pub fn object_display_name(&self) -> Option<String> {
        self.object.as_ref().map(|object| object.display_name())
    }

    /// Decoded parameter by key.
    pub fn param(&self, key: &str) -> Option<&Param> {
        self.params.get(key)
    }

    /// Decoded parameter as a plain string, when it is one.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Param::as_str)
    }
}

impl DispatchContext<'static> {
    /// Minimal context for handler unit tests: a bare view, no params,
    /// no object, inert messages.
    pub fn bare(request: &Request) -> Self {
        Self {
            request: request.clone(),
            view: &NULL_VIEW,
            params: Params::new(),
            object: None,
            view_context: None,
            messages: Messages::inert(),
        }
    }
}

struct NullView;

impl View for NullView {
    fn owner(&self) -> &str {
        ""
    }

    fn handle(&self, _request: &Request) -> Result<Response> {
        Ok(Response::empty())
    }
}

static NULL_VIEW: NullView = NullView;

/// Entry point: route one request either to the page view or to the
/// requested fragment handler.
pub(crate) fn run(core: &HxCore, view: &dyn View, request: Request) -> Result<Response> {
    if !view.allowed_methods().contains(&request.method) {
        return Ok(Response::method_not_allowed());
    }

    // No protocol marker: the page view handles the request unmodified.
    if !request.is_fragment() {
        return view.handle(&request);
    }

    match fragment(core, view, request) {
        Ok(response) => Ok(response),
        Err(err) if err.is_not_found() => {
            // The reason stays in the logs; the response never says
            // whether the handler was missing, denied or misaddressed.
            debug!(%err, "fragment dispatch refused");
            Ok(Response::not_found())
        }
        Err(err) => Err(err),
    }
}

fn fragment(core: &HxCore, view: &dyn View, request: Request) -> Result<Response> {
    // Extraction.
    let name = request
        .query_value(NAME_PARAM)
        .ok_or(HxError::MissingHandlerParam)?
        .to_string();
    let decoded = codec::decode_params(request.query_pairs(), core.object_store())?;

    // Resolution.
    let resolved = core
        .registry()
        .get(&name, core.loader())
        .ok_or_else(|| HxError::UnknownHandler(name.clone()))?;

    // Authorization. A denial is deliberately indistinguishable from a
    // miss, so existence of unauthorized handlers never leaks.
    let policy_request = PolicyRequest {
        handler_name: &name,
        handler_owner: &resolved.owner,
        view_owner: view.owner(),
        is_authenticated: request.is_authenticated(),
        view_allow: view.allowed_handlers(),
        additive: view.allow_additive(),
    };
    if !policy::is_allowed(&policy_request, core.config()) {
        return Err(HxError::NotAllowed(name));
    }

    // Binding.
    let mut handler = resolved.factory.create();
    let request = if handler.config().use_current_url {
        merge_current_url(request)
    } else {
        request
    };
    let view_context = if handler.config().use_view_context {
        Some(view.context(&request)?)
    } else {
        None
    };
    let messages = if core.config().use_messages {
        Messages::from_config(core.config())?
    } else {
        Messages::inert()
    };
    let mut ctx = DispatchContext {
        request,
        view,
        params: decoded.params,
        object: decoded.object,
        view_context,
        messages,
    };

    // Invocation: the verb method runs on the handler, not the view.
    invoke(core, handler.as_mut(), &mut ctx)
}

/// Merge query parameters from the browser's current URL into the
/// request, never overriding parameters the request itself carries.
fn merge_current_url(mut request: Request) -> Request {
    let query = request
        .header_value(headers::HX_CURRENT_URL)
        .and_then(|url| url.split_once('?'))
        .map(|(_, query)| query.to_string());
    if let Some(query) = query {
        let extra = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        request.merge_query(extra);
    }
    request
}

fn invoke(
    core: &HxCore,
    handler: &mut dyn HxHandler,
    ctx: &mut DispatchContext<'_>,
) -> Result<Response> {
    if !ctx.is_post() {
        return lifecycle::respond(core, handler, ctx, FormState::NotAForm);
    }

    // POST routing by capability: delete wins, then form, then the
    // plain lifecycle.
    let deleted = match handler.deletable() {
        Some(delete) => {
            delete.delete(ctx)?;
            Some(delete.success_message(ctx))
        }
        None => None,
    };
    if let Some(message) = deleted {
        ctx.messages.success(message);
        return lifecycle::respond(core, handler, ctx, FormState::NotAForm);
    }

    let form_result = match handler.form() {
        Some(form) => match form.validate(ctx)? {
            FormOutcome::Valid => {
                form.save(ctx)?;
                Some((true, form.success_message(ctx)))
            }
            FormOutcome::Invalid(_) => Some((false, form.error_message(ctx))),
        },
        None => None,
    };
    match form_result {
        Some((true, message)) => {
            ctx.messages.success(message);
            lifecycle::respond(core, handler, ctx, FormState::Valid)
        }
        Some((false, message)) => {
            ctx.messages.error(message);
            lifecycle::respond(core, handler, ctx, FormState::Invalid)
        }
        None => lifecycle::respond(core, handler, ctx, FormState::NotAForm),
    }
}
