//! Serde helpers shared by wire-facing domain types.

use serde::{Deserialize, Deserializer};

/// Deserialise an identifier that the backend may encode as either a JSON
/// number or a JSON string, normalising to the string form.
pub(crate) fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Number(value) => value.to_string(),
        Repr::Text(value) => value,
    })
}
