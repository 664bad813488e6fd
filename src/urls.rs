//! URL construction for fragment requests.
//!
//! The companion to the parameter codec: builds the `hx-get`/`hx-post`
//! URLs templates embed, with the handler name, an optional encoded
//! object reference and encoded auxiliary params - every value
//! percent-escaped for safe embedding in an HTML attribute.
//!
//! # Example
//!
//! ```
//! use hx_dispatch::protocol::Request;
//! use hx_dispatch::urls::HxUrl;
//!
//! let request = Request::get("/widgets");
//! let url = HxUrl::new(&request, "widget_row").build().unwrap();
//! assert_eq!(url, "/widgets?hx_request_name=widget_row");
//! ```

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;

use crate::codec::{self, DomainObject, ObjectRef};
use crate::error::Result;
use crate::protocol::{Request, NAME_PARAM, OBJECT_PARAM};

/// Characters escaped in query values embedded in HTML attributes.
const QUERY_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'%')
    .add(b'?');

/// Builder for fragment-request URLs.
pub struct HxUrl<'a> {
    request: &'a Request,
    name: &'a str,
    object: Option<ObjectRef>,
    full_path: bool,
    params: BTreeMap<String, Value>,
}

impl<'a> HxUrl<'a> {
    /// URL for `name` against the current request's path.
    pub fn new(request: &'a Request, name: &'a str) -> Self {
        Self {
            request,
            name,
            object: None,
            full_path: false,
            params: BTreeMap::new(),
        }
    }

    /// Attach an object reference.
    pub fn object(self, object: &dyn DomainObject) -> Self {
        self.object_ref(object.object_ref())
    }

    /// Attach an object reference directly.
    pub fn object_ref(mut self, reference: ObjectRef) -> Self {
        self.object = Some(reference);
        self
    }

    /// Replay the current request's own query parameters (minus the
    /// reserved protocol keys), so the handler sees the page's state.
    pub fn full_path(mut self, yes: bool) -> Self {
        self.full_path = yes;
        self
    }

    /// Add an auxiliary parameter.
    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Build the URL.
    pub fn build(self) -> Result<String> {
        let mut url = self.request.path().to_string();

        if self.full_path {
            for (key, value) in self.request.query_pairs() {
                if key == NAME_PARAM || key == OBJECT_PARAM {
                    continue;
                }
                push_pair(&mut url, key, value);
            }
        }

        push_pair(&mut url, NAME_PARAM, self.name);

        if let Some(reference) = &self.object {
            push_pair(&mut url, OBJECT_PARAM, &reference.encode());
        }

        for (key, value) in &self.params {
            let (key, value) = codec::encode(key, value)?;
            push_pair(&mut url, &key, &value);
        }

        Ok(url)
    }

    /// The `hx-get="…"` attribute for this URL.
    pub fn get_attr(self) -> Result<String> {
        Ok(format!("hx-get=\"{}\"", self.build()?))
    }

    /// The `hx-post="…"` attribute for this URL.
    pub fn post_attr(self) -> Result<String> {
        Ok(format!("hx-post=\"{}\"", self.build()?))
    }
}

/// Append one pair, continuing an existing query string with `&` and
/// starting a fresh one with `?`.
fn push_pair(url: &mut String, key: &str, value: &str) {
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(key);
    url.push('=');
    url.push_str(&utf8_percent_encode(value, QUERY_ESCAPE).to_string());
}
