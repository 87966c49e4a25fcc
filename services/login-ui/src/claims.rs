//! OIDC scope to claim mapping
//!
//! Releases identity traits as ID token claims, gated by the scopes the
//! relying party asked for. The scope table is the standard OIDC one
//! (OpenID Connect Core 1.0, section 5.4) plus `openid → sub`.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Claim names released by each scope. Never mutated.
pub const SCOPE_CLAIMS: &[(&str, &[&str])] = &[
    ("openid", &["sub"]),
    (
        "profile",
        &[
            "name",
            "family_name",
            "given_name",
            "middle_name",
            "nickname",
            "preferred_username",
            "profile",
            "picture",
            "website",
            "gender",
            "birthdate",
            "zoneinfo",
            "locale",
            "updated_at",
        ],
    ),
    ("email", &["email", "email_verified"]),
    ("address", &["address"]),
    ("phone", &["phone_number", "phone_number_verified"]),
];

/// Claims released by `scope`, or `None` for scopes outside the table.
pub fn claims_for_scope(scope: &str) -> Option<&'static [&'static str]> {
    SCOPE_CLAIMS
        .iter()
        .find(|(name, _)| *name == scope)
        .map(|(_, claims)| *claims)
}

/// Build the ID token claim set for `requested_scopes` from `traits`.
///
/// Only claims that are both released by a requested scope and present in
/// the traits are copied. Unknown scopes are skipped. Traits that are not a
/// JSON object yield an empty claim set.
pub fn map_claims<S: AsRef<str>>(traits: &Value, requested_scopes: &[S]) -> Map<String, Value> {
    let mut claims = Map::new();

    let Some(traits) = traits.as_object() else {
        warn!(
            kind = value_kind(traits),
            "identity traits are not a string-keyed object, releasing no claims"
        );
        return claims;
    };

    let mut seen = HashSet::with_capacity(requested_scopes.len());
    for scope in requested_scopes.iter().map(AsRef::as_ref) {
        if !seen.insert(scope) {
            continue;
        }
        let Some(names) = claims_for_scope(scope) else {
            debug!(scope, "scope has no claim mapping");
            continue;
        };
        for name in names {
            if let Some(value) = traits.get(*name) {
                claims.insert((*name).to_string(), value.clone());
            }
        }
    }

    claims
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
