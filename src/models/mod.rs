//! Data models for the lead tracker.
//!
//! Field names serialize in camelCase to match the frontend.

mod datastore;
mod import;
mod interaction;
mod lead;
mod source;
mod tag;
mod task;

pub use datastore::*;
pub use import::*;
pub use interaction::*;
pub use lead::*;
pub use source::*;
pub use tag::*;
pub use task::*;

use serde::{Deserialize, Deserializer};

/// Patch field where an absent key keeps the value and `null` clears it.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_clears_and_absent_keeps() {
        let absent: UpdateLeadRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.source, None);

        let cleared: UpdateLeadRequest =
            serde_json::from_str(r#"{"source": null, "assignedTo": null}"#).unwrap();
        assert_eq!(cleared.source, Some(None));
        assert_eq!(cleared.assigned_to, Some(None));

        let set: UpdateTaskRequest = serde_json::from_str(r#"{"assignee": "a@x.com"}"#).unwrap();
        assert_eq!(set.assignee, Some(Some("a@x.com".to_string())));
    }
}
