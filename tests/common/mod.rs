#![allow(dead_code)]

pub mod ckan_stub;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use aidmap_sync::catalog::CatalogClient;
use aidmap_sync::record::JsonObject;
use aidmap_sync::SyncError;

/// In-memory catalog that records every write.
#[derive(Default)]
pub struct MemoryCatalog {
    pub groups: BTreeSet<String>,
    pub datasets: RefCell<BTreeMap<String, JsonObject>>,
    pub calls: RefCell<Vec<String>>,
    /// Identifiers whose create/update should fail.
    pub failing: BTreeSet<String>,
}

impl MemoryCatalog {
    pub fn with_groups(groups: &[&str]) -> Self {
        Self {
            groups: groups.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn dataset(&self, identifier: &str) -> Option<JsonObject> {
        self.datasets.borrow().get(identifier).cloned()
    }

    fn name_of(payload: &JsonObject) -> String {
        payload
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    fn write(&self, verb: &str, payload: &JsonObject) -> Result<(), SyncError> {
        let name = Self::name_of(payload);
        self.calls.borrow_mut().push(format!("{verb} {name}"));
        if self.failing.contains(&name) {
            return Err(SyncError::CatalogApi {
                action: format!("package_{verb}"),
                kind: "Validation Error".into(),
                message: "simulated failure".into(),
            });
        }
        self.datasets.borrow_mut().insert(name, payload.clone());
        Ok(())
    }
}

impl CatalogClient for MemoryCatalog {
    fn group_exists(&self, code: &str) -> Result<bool, SyncError> {
        self.calls.borrow_mut().push(format!("group {code}"));
        Ok(self.groups.contains(code))
    }

    fn fetch_dataset(&self, identifier: &str) -> Result<Option<JsonObject>, SyncError> {
        self.calls.borrow_mut().push(format!("show {identifier}"));
        Ok(self.dataset(identifier))
    }

    fn create_dataset(&self, payload: &JsonObject) -> Result<(), SyncError> {
        let name = Self::name_of(payload);
        if self.datasets.borrow().contains_key(&name) {
            return Err(SyncError::CatalogApi {
                action: "package_create".into(),
                kind: "Validation Error".into(),
                message: "name: That URL is already in use.".into(),
            });
        }
        self.write("create", payload)
    }

    fn update_dataset(&self, payload: &JsonObject) -> Result<(), SyncError> {
        self.write("update", payload)
    }
}
