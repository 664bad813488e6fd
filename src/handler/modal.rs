//! Modal composite - fragments rendered inside the shared modal shell.

/// Client event that closes the modal after a successful save.
pub const CLOSE_MODAL_TRIGGER: &str = "closeHxModal";

/// Configuration for a handler rendered inside the shared modal.
///
/// On GET the dispatcher renders the configured modal shell template
/// (a configuration error if unset) with `title`, `body` and
/// `modal_size_classes` in the context. Combined with the form
/// capability it becomes the modal-form flow: an invalid POST
/// re-renders the body template retargeted into the modal body, a
/// valid one fires [`CLOSE_MODAL_TRIGGER`] when `close_on_save` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalConfig {
    /// Template used as the modal body. Required.
    pub body_template: String,
    /// Modal title; a `title` param overrides it per request.
    pub title: String,
    /// CSS classes sizing the modal; a `modal_size_classes` param
    /// overrides it per request.
    pub size_classes: String,
    /// Close the modal after a successful form save.
    pub close_on_save: bool,
}

impl ModalConfig {
    /// Modal with the given body template; closes on save.
    pub fn new(body_template: impl Into<String>) -> Self {
        Self {
            body_template: body_template.into(),
            title: String::new(),
            size_classes: String::new(),
            close_on_save: true,
        }
    }

    /// Set the default title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the sizing classes.
    pub fn size_classes(mut self, classes: impl Into<String>) -> Self {
        self.size_classes = classes.into();
        self
    }

    /// Keep the modal open after a successful save.
    pub fn keep_open_on_save(mut self) -> Self {
        self.close_on_save = false;
        self
    }
}
