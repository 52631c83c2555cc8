//! Catalog boundary.
//!
//! [`CatalogClient`] is the seam between the synchronizer and the remote
//! registry. [`ckan::CkanClient`] talks to a real CKAN action API; tests use
//! in-memory implementations.

pub mod ckan;

pub use ckan::CkanClient;

use serde::Serialize;

use crate::error::SyncError;
use crate::record::JsonObject;

/// Remote operations needed to keep dataset records in sync.
pub trait CatalogClient {
    /// Whether a group (country) with this code exists.
    fn group_exists(&self, code: &str) -> Result<bool, SyncError>;

    /// Fetch a dataset by identifier. `Ok(None)` means it does not exist.
    fn fetch_dataset(&self, identifier: &str) -> Result<Option<JsonObject>, SyncError>;

    fn create_dataset(&self, payload: &JsonObject) -> Result<(), SyncError>;

    fn update_dataset(&self, payload: &JsonObject) -> Result<(), SyncError>;
}

impl<C: CatalogClient + ?Sized> CatalogClient for &C {
    fn group_exists(&self, code: &str) -> Result<bool, SyncError> {
        (**self).group_exists(code)
    }

    fn fetch_dataset(&self, identifier: &str) -> Result<Option<JsonObject>, SyncError> {
        (**self).fetch_dataset(identifier)
    }

    fn create_dataset(&self, payload: &JsonObject) -> Result<(), SyncError> {
        (**self).create_dataset(payload)
    }

    fn update_dataset(&self, payload: &JsonObject) -> Result<(), SyncError> {
        (**self).update_dataset(payload)
    }
}

/// What an upsert ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
}

/// Create or update the dataset named in `payload`.
///
/// Probes with `fetch_dataset` first: an existing record has the new fields
/// merged onto it and is updated, a missing one is created. A failed probe
/// fails the upsert rather than falling through to `create`.
pub fn upsert<C: CatalogClient + ?Sized>(
    client: &C,
    identifier: &str,
    payload: JsonObject,
) -> Result<UpsertAction, SyncError> {
    match client.fetch_dataset(identifier)? {
        Some(existing) => {
            client.update_dataset(&merge_onto(existing, payload))?;
            Ok(UpsertAction::Updated)
        }
        None => {
            client.create_dataset(&payload)?;
            Ok(UpsertAction::Created)
        }
    }
}

/// Overwrite `existing` field by field with `update`.
///
/// Fields only present remotely (ids, timestamps, extras) are preserved.
pub fn merge_onto(mut existing: JsonObject, update: JsonObject) -> JsonObject {
    for (key, value) in update {
        existing.insert(key, value);
    }
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn object(value: serde_json::Value) -> JsonObject {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[derive(Default)]
    struct Recorder {
        existing: Option<JsonObject>,
        fail_fetch: bool,
        calls: RefCell<Vec<(String, JsonObject)>>,
    }

    impl CatalogClient for Recorder {
        fn group_exists(&self, _code: &str) -> Result<bool, SyncError> {
            Ok(true)
        }

        fn fetch_dataset(&self, _identifier: &str) -> Result<Option<JsonObject>, SyncError> {
            if self.fail_fetch {
                return Err(SyncError::CatalogRequest {
                    action: "package_show".into(),
                    message: "connection reset".into(),
                });
            }
            Ok(self.existing.clone())
        }

        fn create_dataset(&self, payload: &JsonObject) -> Result<(), SyncError> {
            self.calls.borrow_mut().push(("create".into(), payload.clone()));
            Ok(())
        }

        fn update_dataset(&self, payload: &JsonObject) -> Result<(), SyncError> {
            self.calls.borrow_mut().push(("update".into(), payload.clone()));
            Ok(())
        }
    }

    #[test]
    fn merge_preserves_remote_only_fields() {
        let existing = object(json!({"id": "abc", "name": "ngoaidmap-ken", "title": "old"}));
        let update = object(json!({"name": "ngoaidmap-ken", "title": "new"}));
        let merged = merge_onto(existing, update);
        assert_eq!(merged["id"], "abc");
        assert_eq!(merged["title"], "new");
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn upsert_creates_missing_dataset() {
        let client = Recorder::default();
        let payload = object(json!({"name": "ngoaidmap-ken"}));
        let action = upsert(&client, "ngoaidmap-ken", payload).expect("upsert");
        assert_eq!(action, UpsertAction::Created);
        assert_eq!(client.calls.borrow()[0].0, "create");
    }

    #[test]
    fn upsert_updates_merged_existing_dataset() {
        let client = Recorder {
            existing: Some(object(json!({"id": "abc", "name": "ngoaidmap-ken"}))),
            ..Default::default()
        };
        let payload = object(json!({"name": "ngoaidmap-ken", "title": "new"}));
        let action = upsert(&client, "ngoaidmap-ken", payload).expect("upsert");
        assert_eq!(action, UpsertAction::Updated);

        let calls = client.calls.borrow();
        assert_eq!(calls[0].0, "update");
        assert_eq!(calls[0].1["id"], "abc");
        assert_eq!(calls[0].1["title"], "new");
    }

    #[test]
    fn failed_probe_does_not_create() {
        let client = Recorder {
            fail_fetch: true,
            ..Default::default()
        };
        let payload = object(json!({"name": "ngoaidmap-ken"}));
        assert!(upsert(&client, "ngoaidmap-ken", payload).is_err());
        assert!(client.calls.borrow().is_empty());
    }
}
