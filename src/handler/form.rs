//! Form capability - boilerplate for handlers that process a form.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::dispatch::DispatchContext;
use crate::error::Result;

/// Field-name to message validation failures.
///
/// The `__all__` key carries form-wide errors not tied to one field.
pub type FormErrors = BTreeMap<String, String>;

/// Key for form-wide validation errors.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Result of binding and validating a submitted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    /// Every field validated; `save` will run next.
    Valid,
    /// Validation failed; the form re-renders with these errors.
    Invalid(FormErrors),
}

impl FormOutcome {
    /// Did validation pass?
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Form-processing capability.
///
/// On POST the dispatcher binds and validates, then either saves and
/// queues the success message, or queues the error message and
/// re-renders the GET template so the form shows its validation
/// errors. When the handler carries an attached object, the form is
/// expected to treat it as the edited instance.
pub trait FormHandler {
    /// Bind request data (form body, params, attached object) and
    /// validate.
    fn validate(&mut self, ctx: &DispatchContext<'_>) -> Result<FormOutcome>;

    /// Persist a valid form. Runs before the success message is queued.
    fn save(&mut self, ctx: &mut DispatchContext<'_>) -> Result<()>;

    /// The bound form exposed to the template context under `"form"`.
    fn form_context(&self) -> Value {
        Value::Null
    }

    /// Validation errors from the last failed [`validate`](Self::validate).
    fn errors(&self) -> FormErrors {
        FormErrors::new()
    }

    /// Append the concatenated field errors to the error message.
    fn errors_in_message(&self) -> bool {
        false
    }

    /// Message queued when the form is valid.
    fn success_message(&self, ctx: &DispatchContext<'_>) -> String {
        match ctx.object_display_name() {
            Some(name) => format!("{name} Saved Successfully."),
            None => "Saved Successfully".to_string(),
        }
    }

    /// Message queued when the form is invalid.
    fn error_message(&self, ctx: &DispatchContext<'_>) -> String {
        let mut message = match ctx.object_display_name() {
            Some(name) => format!("<b>{name} did not save successfully.</b>"),
            None => "<b>Did not save successfully</b>".to_string(),
        };
        if self.errors_in_message() {
            for (field, error) in &self.errors() {
                message.push_str("</br>");
                if field == NON_FIELD_ERRORS {
                    message.push_str(error);
                } else {
                    message.push_str(&format!("{field}: {error}"));
                }
            }
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchContext;

    struct PlainForm {
        errors: FormErrors,
        verbose: bool,
    }

    impl FormHandler for PlainForm {
        fn validate(&mut self, _ctx: &DispatchContext<'_>) -> Result<FormOutcome> {
            if self.errors.is_empty() {
                Ok(FormOutcome::Valid)
            } else {
                Ok(FormOutcome::Invalid(self.errors.clone()))
            }
        }

        fn save(&mut self, _ctx: &mut DispatchContext<'_>) -> Result<()> {
            Ok(())
        }

        fn errors(&self) -> FormErrors {
            self.errors.clone()
        }

        fn errors_in_message(&self) -> bool {
            self.verbose
        }
    }

    #[test]
    fn test_outcome_is_valid() {
        assert!(FormOutcome::Valid.is_valid());
        assert!(!FormOutcome::Invalid(FormErrors::new()).is_valid());
    }

    #[test]
    fn test_default_messages_without_object() {
        let form = PlainForm {
            errors: FormErrors::new(),
            verbose: false,
        };
        let ctx = DispatchContext::bare(&crate::protocol::Request::post("/"));
        assert_eq!(form.success_message(&ctx), "Saved Successfully");
        assert_eq!(form.error_message(&ctx), "<b>Did not save successfully</b>");
    }

    #[test]
    fn test_error_message_with_field_errors() {
        let form = PlainForm {
            errors: FormErrors::from([
                ("text".to_string(), "This field is required.".to_string()),
                (NON_FIELD_ERRORS.to_string(), "Fix the form.".to_string()),
            ]),
            verbose: true,
        };
        let ctx = DispatchContext::bare(&crate::protocol::Request::post("/"));
        let message = form.error_message(&ctx);
        assert!(message.contains("text: This field is required."));
        // Form-wide errors appear without a field prefix.
        assert!(message.contains("</br>Fix the form."));
        assert!(!message.contains("__all__"));
    }
}
