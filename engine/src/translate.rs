//! Field-name translation between local and remote record forms.
//!
//! Local records use camelCase keys (`"updatedAt"`); the remote store uses
//! lowercase snake_case columns (`"updated_at"`). Translation is applied at
//! the wire boundary in both directions and must be bit-exact, since the
//! remote store resolves its schema from the translated names.
//!
//! Both conversions recurse through objects and arrays and leave every other
//! value (strings, numbers, booleans, null) untouched.

use serde_json::Value;

/// Rewrite a single local key into its remote form.
///
/// Every ASCII uppercase letter is replaced by an underscore followed by its
/// lowercase form: `"updatedAt"` → `"updated_at"`, `"guardianPhone"` →
/// `"guardian_phone"`.
pub fn to_remote_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Rewrite a single remote key into its local form.
///
/// Every underscore followed by an ASCII lowercase letter collapses into the
/// uppercase letter: `"updated_at"` → `"updatedAt"`. An underscore followed
/// by anything else is left as-is.
pub fn to_local_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '_' {
            match chars.peek() {
                Some(next) if next.is_ascii_lowercase() => {
                    if let Some(next) = chars.next() {
                        out.push(next.to_ascii_uppercase());
                    }
                }
                _ => out.push(ch),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Recursively rewrite every object key from local camelCase into remote
/// snake_case.
///
/// `to_local_form(&to_remote_form(v))` is value-equal to `v` for any value
/// whose keys contain no underscore. Keys that already contain the separator
/// do not survive the round trip (`"user_name"` comes back as `"userName"`);
/// behavior for such keys is undefined.
pub fn to_remote_form(value: &Value) -> Value {
    convert(value, &to_remote_key)
}

/// Recursively rewrite every object key from remote snake_case into local
/// camelCase. Exact inverse of [`to_remote_form`] for convention-safe keys.
pub fn to_local_form(value: &Value) -> Value {
    convert(value, &to_local_key)
}

fn convert(value: &Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| (rename(key), convert(inner, rename)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| convert(item, rename)).collect())
        }
        leaf => leaf.clone(),
    }
}
