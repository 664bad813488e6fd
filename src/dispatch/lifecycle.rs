//! Response composition: context assembly, template rendering, headers
//! and message plumbing.
//!
//! This is the handler-side half of dispatch. Once a handler's verb
//! logic ran, the lifecycle turns its configuration and the request
//! state into the terminal response: the rendered fragment HTML (or an
//! empty body for refresh/redirect responses), queued messages either
//! appended inline or forwarded to the flash store, and the protocol
//! directive headers.

use serde_json::{Map, Value};

use crate::core::HxCore;
use crate::dispatch::DispatchContext;
use crate::error::{HxError, Result};
use crate::handler::{Blocks, HandlerConfig, HxHandler, Templates, CLOSE_MODAL_TRIGGER};
use crate::message::Messages;
use crate::protocol::{headers, Response};

/// What the form capability decided this request, if there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormState {
    /// No form capability involved.
    NotAForm,
    /// The form validated and saved.
    Valid,
    /// Validation failed; the form re-renders with its errors.
    Invalid,
}

/// Produce the terminal response for an invoked handler.
pub(crate) fn respond(
    core: &HxCore,
    handler: &mut dyn HxHandler,
    ctx: &mut DispatchContext<'_>,
    form: FormState,
) -> Result<Response> {
    let config = handler.config().clone();
    let mut body = response_html(core, handler, ctx, &config, form)?;

    if core.config().use_messages && config.show_messages && !ctx.messages.is_empty() {
        // A full page reload discards inline HTML, so queued messages
        // go to the persistent flash store instead. Only a POST emits
        // the refresh/redirect directives.
        if ctx.is_post() && (config.refresh_page || config.redirect.is_some()) {
            core.forward_messages(&mut ctx.messages);
        } else {
            body.push_str(&render_messages(core, &ctx.messages)?);
        }
    }

    let mut response = Response::html(body);
    for (name, value) in build_headers(core, &*handler, ctx, &config, form) {
        response = response.header(name, &value);
    }
    Ok(response)
}

fn response_html(
    core: &HxCore,
    handler: &mut dyn HxHandler,
    ctx: &mut DispatchContext<'_>,
    config: &HandlerConfig,
    form: FormState,
) -> Result<String> {
    if ctx.is_post() {
        if form == FormState::Invalid {
            // Re-render the form so it shows its validation errors; a
            // modal form re-renders just its body for the retarget.
            let templates = match handler.modal() {
                Some(modal) => Templates::One(modal.body_template.clone()),
                None => config.get_template.clone(),
            };
            return render_set(core, handler, ctx, &templates, &config.get_blocks);
        }
        if config.refresh_page || config.redirect.is_some() || config.return_empty {
            return Ok(String::new());
        }
        return render_set(core, handler, ctx, &config.post_template, &config.post_blocks);
    }

    // GET: modal handlers render the shared modal shell.
    let templates = match handler.modal() {
        Some(_) => {
            let shell = core.config().modal_template.clone().ok_or_else(|| {
                HxError::Config("modal_template must be set to use modal handlers".into())
            })?;
            Templates::One(shell)
        }
        None => config.get_template.clone(),
    };
    render_set(core, handler, ctx, &templates, &config.get_blocks)
}

/// Render a template/block combination with the assembled context.
///
/// The rules mirror the handler configuration shapes: whole templates,
/// named blocks of a single template, or a per-template block map
/// (followed by any explicitly configured whole templates).
fn render_set(
    core: &HxCore,
    handler: &mut dyn HxHandler,
    ctx: &mut DispatchContext<'_>,
    templates: &Templates,
    blocks: &Blocks,
) -> Result<String> {
    let context = build_context(core, handler, ctx)?;
    let renderer = core.renderer();
    let fallback = ctx.view.template_name();
    let mut html = String::new();

    match blocks {
        Blocks::None => {
            for template in templates.resolve(fallback)? {
                html.push_str(&renderer.render(&template, None, &context)?);
            }
        }
        Blocks::Named(names) => {
            let resolved = templates.resolve(fallback)?;
            let [template] = resolved.as_slice() else {
                return Err(HxError::Config(
                    "named blocks require exactly one template; use a per-template block map"
                        .into(),
                ));
            };
            for block in names {
                html.push_str(&renderer.render(template, Some(block), &context)?);
            }
        }
        Blocks::PerTemplate(map) => {
            for (template, block) in map {
                html.push_str(&renderer.render(template, Some(block), &context)?);
            }
            // Explicitly configured templates still render whole after
            // the block map; the unset default does not.
            match templates {
                Templates::Unset => {}
                Templates::One(template) => {
                    html.push_str(&renderer.render(template, None, &context)?);
                }
                Templates::Many(list) => {
                    for template in list {
                        html.push_str(&renderer.render(template, None, &context)?);
                    }
                }
            }
        }
    }
    Ok(html)
}

/// Assemble the template context for this request.
fn build_context(
    core: &HxCore,
    handler: &mut dyn HxHandler,
    ctx: &mut DispatchContext<'_>,
) -> Result<Value> {
    let config = handler.config().clone();
    let mut context = Map::new();

    // View context first; everything later wins on key clashes.
    if let Some(Value::Object(view_context)) = ctx.view_context.clone() {
        context.extend(view_context);
    }

    if config.kwargs_as_context {
        for (key, param) in &ctx.params {
            context.insert(key.clone(), param.context_value());
        }
    } else {
        let kwargs: Map<String, Value> = ctx
            .params
            .iter()
            .map(|(key, param)| (key.clone(), param.context_value()))
            .collect();
        context.insert("hx_kwargs".to_string(), Value::Object(kwargs));
    }

    if ctx.is_post() {
        // The POST mutated state: refresh the object, and the view
        // context too when the handler asked for it.
        if let Some(object) = ctx.object.as_mut() {
            object.refresh()?;
        }
        if config.refresh_view_context_on_post {
            if let Value::Object(view_context) = ctx.view.context(&ctx.request)? {
                context.extend(view_context);
            }
        }
    }

    let object_value = ctx
        .object
        .as_ref()
        .map(|object| object.context())
        .unwrap_or(Value::Null);
    context.insert(config.object_context_key.clone(), object_value);

    let hook = if ctx.is_post() {
        handler.context_on_post(ctx)?
    } else {
        handler.context_on_get(ctx)?
    };
    context.extend(hook);

    if let Some(form) = handler.form() {
        context.insert("form".to_string(), form.form_context());
    }

    if let Some(modal) = handler.modal() {
        let title = ctx
            .param_str("title")
            .map(str::to_string)
            .unwrap_or_else(|| modal.title.clone());
        let size_classes = ctx
            .param_str("modal_size_classes")
            .map(str::to_string)
            .unwrap_or_else(|| modal.size_classes.clone());
        context.insert("title".to_string(), Value::String(title));
        context.insert(
            "modal_size_classes".to_string(),
            Value::String(size_classes),
        );
        context.insert(
            "body".to_string(),
            Value::String(modal.body_template.clone()),
        );
        context.insert(
            "modal_container_id".to_string(),
            Value::String(core.config().modal_container_id.clone()),
        );
    }

    Ok(Value::Object(context))
}

fn render_messages(core: &HxCore, messages: &Messages) -> Result<String> {
    let template = core.config().messages_template.as_deref().ok_or_else(|| {
        HxError::Config("messages_template must be set to render messages".into())
    })?;
    let context = Value::Object(Map::from_iter([(
        "messages".to_string(),
        messages.as_context(),
    )]));
    core.renderer().render(template, None, &context)
}

fn build_headers(
    core: &HxCore,
    handler: &dyn HxHandler,
    ctx: &DispatchContext<'_>,
    config: &HandlerConfig,
    form: FormState,
) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();

    if ctx.is_post() {
        if config.refresh_page {
            out.push((headers::HX_REFRESH, "true".to_string()));
        } else if let Some(url) = &config.redirect {
            out.push((headers::HX_REDIRECT, url.clone()));
        }
    }
    if config.no_swap {
        out.push((headers::HX_RESWAP, "none".to_string()));
    }

    let mut triggers = handler.triggers(ctx);
    if let Some(modal) = handler.modal() {
        match form {
            FormState::Valid if modal.close_on_save => {
                triggers.push(CLOSE_MODAL_TRIGGER.to_string());
            }
            FormState::Invalid => {
                // Swap the re-rendered form into the modal body rather
                // than the original target.
                out.push((
                    headers::HX_RETARGET,
                    core.config().modal_body_selector.clone(),
                ));
                out.push((headers::HX_RESWAP, "innerHTML".to_string()));
            }
            _ => {}
        }
    }
    if !triggers.is_empty() {
        out.push((headers::HX_TRIGGER, triggers.join(", ")));
    }

    out
}
