//! Access-control decisions for fragment dispatch.
//!
//! Whether a view may invoke a handler is decided by layered rules
//! with strict precedence: the authentication gate first (absolute),
//! then the global allow-spec, then the view-local allow list, then
//! same-owner defaults. [`is_allowed`] encodes the full table; the
//! dispatcher surfaces every denial as a plain not-found so callers
//! cannot probe which handlers exist.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

use crate::config::HxConfig;

/// Wildcard token allowing every handler of an owner.
pub const ALL_HANDLERS: &str = "__all__";

/// Per-owner rule inside a fine-grained allow-spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerRule {
    /// Every handler this owner defines.
    All,
    /// Only these named handlers.
    Names(BTreeSet<String>),
}

impl<'de> Deserialize<'de> for OwnerRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RuleVisitor;

        impl<'de> Visitor<'de> for RuleVisitor {
            type Value = OwnerRule;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "\"{ALL_HANDLERS}\" or a list of handler names")
            }

            fn visit_str<E>(self, value: &str) -> Result<OwnerRule, E>
            where
                E: de::Error,
            {
                if value == ALL_HANDLERS {
                    Ok(OwnerRule::All)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(value), &self))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<OwnerRule, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut names = BTreeSet::new();
                while let Some(name) = seq.next_element::<String>()? {
                    names.insert(name);
                }
                Ok(OwnerRule::Names(names))
            }
        }

        deserializer.deserialize_any(RuleVisitor)
    }
}

/// A policy expression controlling which handlers are allowed.
///
/// Two shapes exist; any other input shape fails at configuration
/// load, never silently evaluating to "deny".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AllowSpec {
    /// Coarse: any handler owned by these owners.
    Owners(BTreeSet<String>),
    /// Fine-grained: per-owner wildcard or named subset.
    PerOwner(BTreeMap<String, OwnerRule>),
}

impl AllowSpec {
    /// Coarse spec from owner labels.
    pub fn owners<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Owners(owners.into_iter().map(Into::into).collect())
    }

    /// Fine-grained spec from (owner, rule) pairs.
    pub fn per_owner<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = (S, OwnerRule)>,
        S: Into<String>,
    {
        Self::PerOwner(rules.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The single matching rule shared by the global and
    /// unauthenticated specs: an owner set allows any handler from
    /// those owners; a mapping allows per-owner either everything or a
    /// named subset.
    pub fn matches(&self, owner: &str, name: &str) -> bool {
        match self {
            Self::Owners(owners) => owners.contains(owner),
            Self::PerOwner(rules) => match rules.get(owner) {
                Some(OwnerRule::All) => true,
                Some(OwnerRule::Names(names)) => names.contains(name),
                None => false,
            },
        }
    }
}

/// What the policy engine needs to know about one dispatch attempt.
#[derive(Debug, Clone, Copy)]
pub struct PolicyRequest<'a> {
    /// Name of the requested handler.
    pub handler_name: &'a str,
    /// App that defines the handler.
    pub handler_owner: &'a str,
    /// App that defines the requesting view.
    pub view_owner: &'a str,
    /// Did the host framework authenticate the requester?
    pub is_authenticated: bool,
    /// The view's local allow list, if it declares one.
    pub view_allow: Option<&'a [String]>,
    /// Treat the local list as additive instead of exhaustive.
    pub additive: bool,
}

/// Decide whether this dispatch attempt is allowed.
///
/// Later layers only apply when earlier ones do not short-circuit:
///
/// 1. the authentication gate: an unauthenticated requester is denied
///    unless the handler is in the unauthenticated allow-spec, and
///    that denial is absolute - nothing below overrides it. Passing
///    the gate only continues evaluation;
/// 2. the global allow-spec,
/// 3. a literal hit in the view-local list,
/// 4. a non-additive local list is exhaustive - anything else is
///    denied,
/// 5. an additive local list falls back to same-owner,
/// 6. with no local list, same-owner applies when enforcement is on.
pub fn is_allowed(request: &PolicyRequest<'_>, config: &HxConfig) -> bool {
    let matches_spec = |spec: &Option<AllowSpec>| {
        spec.as_ref()
            .is_some_and(|s| s.matches(request.handler_owner, request.handler_name))
    };

    if config.require_auth
        && !request.is_authenticated
        && !matches_spec(&config.unauthenticated_allow)
    {
        return false;
    }

    if matches_spec(&config.global_allow) {
        return true;
    }

    match request.view_allow {
        Some(list) => {
            if list.iter().any(|name| name == request.handler_name) {
                return true;
            }
            if !request.additive {
                return false;
            }
            // A global hit would have returned above, so only the
            // same-owner fallback is left to check.
            request.handler_owner == request.view_owner
        }
        None => config.enforce_same_app && request.handler_owner == request.view_owner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(name: &'a str, owner: &'a str, view_owner: &'a str) -> PolicyRequest<'a> {
        PolicyRequest {
            handler_name: name,
            handler_owner: owner,
            view_owner,
            is_authenticated: true,
            view_allow: None,
            additive: false,
        }
    }

    #[test]
    fn test_owner_set_spec() {
        let spec = AllowSpec::owners(["blog", "shop"]);
        assert!(spec.matches("blog", "anything"));
        assert!(spec.matches("shop", "other"));
        assert!(!spec.matches("accounts", "anything"));
    }

    #[test]
    fn test_per_owner_wildcard_and_names() {
        let spec = AllowSpec::per_owner([
            ("blog", OwnerRule::All),
            (
                "shop",
                OwnerRule::Names(BTreeSet::from(["cart_row".to_string()])),
            ),
        ]);
        assert!(spec.matches("blog", "anything"));
        assert!(spec.matches("shop", "cart_row"));
        assert!(!spec.matches("shop", "other"));
        assert!(!spec.matches("accounts", "cart_row"));
    }

    #[test]
    fn test_auth_gate_is_absolute() {
        let mut config = HxConfig::default();
        config.require_auth = true;
        // Even a global allow cannot override the gate.
        config.global_allow = Some(AllowSpec::owners(["blog"]));

        let mut req = request("comment_form", "blog", "blog");
        req.is_authenticated = false;
        assert!(!is_allowed(&req, &config));
    }

    #[test]
    fn test_unauthenticated_spec_passes_the_gate() {
        let mut config = HxConfig::default();
        config.require_auth = true;
        config.unauthenticated_allow = Some(AllowSpec::per_owner([(
            "accounts",
            OwnerRule::Names(BTreeSet::from(["login_form".to_string()])),
        )]));

        let mut req = request("login_form", "accounts", "accounts");
        req.is_authenticated = false;
        assert!(is_allowed(&req, &config));

        let mut other = request("signup_form", "accounts", "accounts");
        other.is_authenticated = false;
        assert!(!is_allowed(&other, &config));

        // Passing the gate does not bypass the layers below it: the
        // same handler from a foreign view still needs a rule.
        let mut foreign = request("login_form", "accounts", "blog");
        foreign.is_authenticated = false;
        assert!(!is_allowed(&foreign, &config));
    }

    #[test]
    fn test_global_allow_crosses_owners() {
        let mut config = HxConfig::default();
        config.global_allow = Some(AllowSpec::per_owner([("blog", OwnerRule::All)]));

        let req = request("comment_form", "blog", "shop");
        assert!(is_allowed(&req, &config));
    }

    #[test]
    fn test_strict_local_list_is_exhaustive() {
        let config = HxConfig::default();
        let list = vec!["comment_form".to_string()];

        // Same owner as the view, but not in the strict list: denied.
        let mut req = request("other_form", "blog", "blog");
        req.view_allow = Some(&list);
        assert!(!is_allowed(&req, &config));

        // Literal hit: allowed.
        let mut hit = request("comment_form", "accounts", "blog");
        hit.view_allow = Some(&list);
        assert!(is_allowed(&hit, &config));
    }

    #[test]
    fn test_additive_list_same_owner_fallback() {
        let config = HxConfig::default();
        let list = vec!["comment_form".to_string()];

        let mut req = request("other_form", "blog", "blog");
        req.view_allow = Some(&list);
        req.additive = true;
        assert!(is_allowed(&req, &config));

        // Different owner, not listed, no global rule: still denied.
        let mut foreign = request("other_form", "shop", "blog");
        foreign.view_allow = Some(&list);
        foreign.additive = true;
        assert!(!is_allowed(&foreign, &config));
    }

    #[test]
    fn test_same_owner_default_without_local_list() {
        let config = HxConfig::default();
        assert!(is_allowed(&request("comment_form", "blog", "blog"), &config));
        assert!(!is_allowed(&request("comment_form", "blog", "shop"), &config));
    }

    #[test]
    fn test_same_owner_default_gated_by_enforcement_flag() {
        let mut config = HxConfig::default();
        config.enforce_same_app = false;
        assert!(!is_allowed(
            &request("comment_form", "blog", "blog"),
            &config
        ));

        // The global spec still applies with enforcement off.
        config.global_allow = Some(AllowSpec::owners(["blog"]));
        assert!(is_allowed(&request("comment_form", "blog", "blog"), &config));
    }

    #[test]
    fn test_owner_rule_deserialize() {
        let all: OwnerRule = serde_json::from_str("\"__all__\"").unwrap();
        assert_eq!(all, OwnerRule::All);

        let names: OwnerRule = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(
            names,
            OwnerRule::Names(BTreeSet::from(["a".to_string(), "b".to_string()]))
        );

        // Any other string is a configuration error, not a deny.
        assert!(serde_json::from_str::<OwnerRule>("\"everything\"").is_err());
        assert!(serde_json::from_str::<OwnerRule>("42").is_err());
    }

    #[test]
    fn test_allow_spec_deserialize_shapes() {
        let owners: AllowSpec = serde_json::from_str(r#"["blog"]"#).unwrap();
        assert!(owners.matches("blog", "anything"));

        let per_owner: AllowSpec =
            serde_json::from_str(r#"{"blog": ["comment_form"]}"#).unwrap();
        assert!(per_owner.matches("blog", "comment_form"));
        assert!(!per_owner.matches("blog", "other"));

        assert!(serde_json::from_str::<AllowSpec>("\"blog\"").is_err());
    }
}
