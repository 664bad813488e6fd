//! Fragment protocol vocabulary - request/response model and reserved names.
//!
//! The protocol is a header + query-parameter convention: a request
//! carrying the [`headers::HX_REQUEST`] header is a fragment request and
//! must name its target handler in the [`NAME_PARAM`] query parameter.
//! Everything else passes through to the page view untouched.
//!
//! # Example
//!
//! ```
//! use hx_dispatch::protocol::{headers, Request, NAME_PARAM};
//!
//! let request = Request::get("/widgets?hx_request_name=widget_row&page=2")
//!     .header(headers::HX_REQUEST, "true");
//!
//! assert!(request.is_fragment());
//! assert_eq!(request.query_value(NAME_PARAM), Some("widget_row"));
//! ```

use std::borrow::Cow;
use std::collections::HashSet;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

/// Reserved header names exchanged with the client-side fragment library.
pub mod headers {
    /// Marks a request as a fragment request.
    pub const HX_REQUEST: &str = "HX-Request";
    /// URL currently shown in the browser, sent by the client library.
    pub const HX_CURRENT_URL: &str = "HX-Current-URL";
    /// Response directive: reload the full page.
    pub const HX_REFRESH: &str = "HX-Refresh";
    /// Response directive: navigate to the given URL.
    pub const HX_REDIRECT: &str = "HX-Redirect";
    /// Response directive: override the swap strategy.
    pub const HX_RESWAP: &str = "HX-Reswap";
    /// Response directive: redirect the swap to another DOM target.
    pub const HX_RETARGET: &str = "HX-Retarget";
    /// Response directive: comma-joined client events to trigger.
    pub const HX_TRIGGER: &str = "HX-Trigger";
}

/// Reserved query parameter naming the target handler.
pub const NAME_PARAM: &str = "hx_request_name";

/// Reserved query parameter carrying an encoded object reference.
pub const OBJECT_PARAM: &str = "object";

/// An inbound request as seen by the dispatcher.
///
/// The host framework builds one of these per request; the fluent
/// constructors exist so hosts (and tests) can do it in one expression.
/// Query and form pairs keep their original order and may repeat keys.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP verb.
    pub method: Method,
    /// Request headers.
    pub headers: HeaderMap,
    path: String,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    authenticated: bool,
}

impl Request {
    /// Create a request from a verb and a path with optional query string.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, raw)) => {
                let query = form_urlencoded::parse(raw.as_bytes())
                    .into_owned()
                    .collect();
                (path.to_string(), query)
            }
            None => (target.to_string(), Vec::new()),
        };
        Self {
            method,
            headers: HeaderMap::new(),
            path,
            query,
            form: Vec::new(),
            authenticated: false,
        }
    }

    /// GET request for the given target.
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    /// POST request for the given target.
    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    /// Set a header. Invalid names or values are skipped with a warning
    /// rather than failing the whole request build.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(name, "skipping invalid header"),
        }
        self
    }

    /// Append a query parameter.
    pub fn query_param(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a form-body field.
    pub fn form_field(mut self, key: &str, value: &str) -> Self {
        self.form.push((key.to_string(), value.to_string()));
        self
    }

    /// Mark the requester as authenticated (or not).
    pub fn authenticated(mut self, yes: bool) -> Self {
        self.authenticated = yes;
        self
    }

    /// Request path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All query pairs, in request order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// First query value for a key.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All form-body pairs, in request order.
    pub fn form_pairs(&self) -> &[(String, String)] {
        &self.form
    }

    /// First form-body value for a key.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Does this request carry the fragment protocol marker?
    pub fn is_fragment(&self) -> bool {
        self.headers.contains_key(headers::HX_REQUEST)
    }

    /// Did the host framework authenticate the requester?
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Merge extra query pairs without overriding keys the request
    /// already carries; all values of a missing key are taken.
    pub(crate) fn merge_query(&mut self, extra: Vec<(String, String)>) {
        let present: HashSet<&String> = self.query.iter().map(|(k, _)| k).collect();
        let missing: Vec<(String, String)> = extra
            .into_iter()
            .filter(|(k, _)| !present.contains(k))
            .collect();
        self.query.extend(missing);
    }
}

/// An outbound response: status, headers, HTML body.
#[derive(Debug)]
pub struct Response {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers, including the fragment directives.
    pub headers: HeaderMap,
    /// Body bytes.
    pub body: Bytes,
}

impl Response {
    /// 200 response with an HTML body.
    pub fn html(body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        Self {
            status: StatusCode::OK,
            headers,
            body: Bytes::from(body.into()),
        }
    }

    /// 200 response with an empty body.
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Uniform 404 response.
    ///
    /// The body never says why: a denied handler, a missing handler and
    /// a malformed fragment request all produce this exact response.
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"Not Found"),
        }
    }

    /// 405 response for verbs the view does not serve.
    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Set a header. Invalid names or values are skipped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(name, "skipping invalid response header"),
        }
        self
    }

    /// Body as text.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parsing() {
        let request = Request::get("/widgets?page=2&sort=name");
        assert_eq!(request.path(), "/widgets");
        assert_eq!(request.query_value("page"), Some("2"));
        assert_eq!(request.query_value("sort"), Some("name"));
        assert_eq!(request.query_value("missing"), None);
    }

    #[test]
    fn test_query_percent_decoding() {
        let request = Request::get("/search?q=two%20words");
        assert_eq!(request.query_value("q"), Some("two words"));
    }

    #[test]
    fn test_no_query_string() {
        let request = Request::get("/widgets");
        assert_eq!(request.path(), "/widgets");
        assert!(request.query_pairs().is_empty());
    }

    #[test]
    fn test_fragment_marker() {
        let plain = Request::get("/widgets");
        assert!(!plain.is_fragment());

        let fragment = Request::get("/widgets").header(headers::HX_REQUEST, "true");
        assert!(fragment.is_fragment());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = Request::get("/").header("HX-Current-URL", "/widgets?page=2");
        assert_eq!(
            request.header_value("hx-current-url"),
            Some("/widgets?page=2")
        );
    }

    #[test]
    fn test_form_fields() {
        let request = Request::post("/widgets")
            .form_field("text", "hello")
            .form_field("draft", "1");
        assert_eq!(request.form_value("text"), Some("hello"));
        assert_eq!(request.form_value("draft"), Some("1"));
        assert_eq!(request.form_value("missing"), None);
    }

    #[test]
    fn test_merge_query_keeps_existing_keys() {
        let mut request = Request::get("/widgets?page=2");
        request.merge_query(vec![
            ("page".into(), "9".into()),
            ("sort".into(), "name".into()),
        ]);
        // Explicit request parameters always win over inferred ones.
        assert_eq!(request.query_value("page"), Some("2"));
        assert_eq!(request.query_value("sort"), Some("name"));
    }

    #[test]
    fn test_merge_query_takes_all_values_of_missing_key() {
        let mut request = Request::get("/widgets");
        request.merge_query(vec![
            ("tag".into(), "a".into()),
            ("tag".into(), "b".into()),
        ]);
        let tags: Vec<&str> = request
            .query_pairs()
            .iter()
            .filter(|(k, _)| k == "tag")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_response_html() {
        let response = Response::html("<div>hi</div>");
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "<div>hi</div>");
        assert_eq!(
            response.headers.get(CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }

    #[test]
    fn test_not_found_is_uniform() {
        let a = Response::not_found();
        let b = Response::not_found();
        assert_eq!(a.status, b.status);
        assert_eq!(a.body, b.body);
    }

    #[test]
    fn test_response_header_builder() {
        let response = Response::html("x").header(headers::HX_REFRESH, "true");
        assert_eq!(response.headers.get("HX-Refresh").unwrap(), "true");
    }
}
