//! Ajax command envelopes.
//!
//! Ajax responses are JSON of the shape `[{"command": "insert", "data":
//! "<div>...</div>"}, ...]` (or an object keyed the same way). The markup
//! under every `data` key is rewritten; everything else is re-encoded as
//! it was, key order included.

use std::borrow::Cow;

use serde_json::Value;

/// Applies `rewrite` to every string found under a `data` key.
///
/// Bodies that are not a JSON object or array, and envelopes where nothing
/// changed, are returned unchanged.
pub fn rewrite_ajax_json<'b, F>(body: &'b str, rewrite: F) -> Cow<'b, str>
where
    F: Fn(&str) -> Option<String>,
{
    let mut content: Value = match serde_json::from_str(body) {
        Ok(content @ (Value::Object(_) | Value::Array(_))) => content,
        Ok(_) => return Cow::Borrowed(body),
        Err(e) => {
            tracing::debug!("Response is not a JSON envelope: {}", e);
            return Cow::Borrowed(body);
        }
    };

    let changes = rewrite_data_values(&mut content, &rewrite);
    if changes == 0 {
        return Cow::Borrowed(body);
    }

    match serde_json::to_string(&content) {
        Ok(encoded) => Cow::Owned(encoded),
        Err(e) => {
            tracing::warn!("Unable to re-encode JSON envelope: {}", e);
            Cow::Borrowed(body)
        }
    }
}

fn rewrite_data_values<F>(value: &mut Value, rewrite: &F) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::Object(map) => {
            let mut changes = 0;
            for (key, item) in map.iter_mut() {
                match item {
                    Value::String(data) if key == "data" => {
                        if let Some(rewritten) = rewrite(data) {
                            *data = rewritten;
                            changes += 1;
                        }
                    }
                    _ => changes += rewrite_data_values(item, rewrite),
                }
            }
            changes
        }
        Value::Array(items) => items
            .iter_mut()
            .map(|item| rewrite_data_values(item, rewrite))
            .sum(),
        _ => 0,
    }
}
