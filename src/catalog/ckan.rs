//! Blocking client for the CKAN action API.
//!
//! Every action is a `POST {base}/api/3/action/{name}` with a JSON body. The
//! reply is an envelope of the form
//! `{"success": bool, "result": ..., "error": {"__type": ..., "message": ...}}`.

use serde_json::{json, Value};

use crate::error::SyncError;
use crate::record::JsonObject;

use super::CatalogClient;

const NOT_FOUND_TYPE: &str = "Not Found Error";

/// A CKAN catalog reachable over HTTP(S).
pub struct CkanClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
    user_agent: Option<String>,
}

/// Decoded outcome of a single action call.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionReply {
    Success(Value),
    NotFound,
}

impl CkanClient {
    pub fn new(
        agent: ureq::Agent,
        base_url: &str,
        api_key: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            user_agent,
        }
    }

    fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{}", self.base_url, action)
    }

    /// Invoke one action and decode the envelope.
    pub fn call(&self, action: &str, body: &Value) -> Result<ActionReply, SyncError> {
        let url = self.action_url(action);
        log::debug!("POST {}", url);

        let mut request = self.agent.post(url.as_str());
        if let Some(api_key) = self.api_key.as_deref() {
            request = request.header("Authorization", api_key);
        }
        if let Some(user_agent) = self.user_agent.as_deref() {
            request = request.header("User-Agent", user_agent);
        }

        let mut response = request
            .send_json(body)
            .map_err(|source| SyncError::CatalogRequest {
                action: action.to_string(),
                message: source.to_string(),
            })?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|source| SyncError::CatalogRequest {
                action: action.to_string(),
                message: source.to_string(),
            })?;

        interpret_reply(action, status, &text)
    }

    /// Fetch the catalog's `status_show` summary.
    pub fn status(&self) -> Result<Value, SyncError> {
        match self.call("status_show", &json!({}))? {
            ActionReply::Success(result) => Ok(result),
            ActionReply::NotFound => Err(SyncError::CatalogResponse {
                action: "status_show".to_string(),
                message: "action not available".to_string(),
            }),
        }
    }

    /// Whether the API key's user may create datasets in `organization`.
    pub fn can_create_in(&self, organization: &str) -> Result<bool, SyncError> {
        let reply = self.call(
            "organization_list_for_user",
            &json!({ "permission": "create_dataset" }),
        )?;
        let ActionReply::Success(result) = reply else {
            return Ok(false);
        };

        let organizations = result
            .as_array()
            .ok_or_else(|| SyncError::CatalogResponse {
                action: "organization_list_for_user".to_string(),
                message: "expected a list of organizations".to_string(),
            })?;

        Ok(organizations.iter().any(|org| {
            ["name", "id"]
                .iter()
                .any(|key| org.get(key).and_then(Value::as_str) == Some(organization))
        }))
    }

    /// Startup check: the catalog answers and the key can write to `owner_org`.
    pub fn preflight(&self, owner_org: &str) -> Result<(), SyncError> {
        let status = self
            .status()
            .map_err(|err| SyncError::Preflight(format!("catalog not reachable: {err}")))?;
        log::info!(
            "Connected to {} (CKAN {})",
            self.base_url,
            status
                .get("ckan_version")
                .and_then(Value::as_str)
                .unwrap_or("unknown version")
        );

        if !self.can_create_in(owner_org)? {
            return Err(SyncError::Preflight(format!(
                "API key is not allowed to create datasets in organization '{owner_org}'"
            )));
        }
        Ok(())
    }
}

impl CatalogClient for CkanClient {
    fn group_exists(&self, code: &str) -> Result<bool, SyncError> {
        match self.call("group_show", &json!({ "id": code }))? {
            ActionReply::Success(_) => Ok(true),
            ActionReply::NotFound => Ok(false),
        }
    }

    fn fetch_dataset(&self, identifier: &str) -> Result<Option<JsonObject>, SyncError> {
        match self.call("package_show", &json!({ "id": identifier }))? {
            ActionReply::Success(Value::Object(dataset)) => Ok(Some(dataset)),
            ActionReply::Success(other) => Err(SyncError::CatalogResponse {
                action: "package_show".to_string(),
                message: format!("expected a dataset object, got {other}"),
            }),
            ActionReply::NotFound => Ok(None),
        }
    }

    fn create_dataset(&self, payload: &JsonObject) -> Result<(), SyncError> {
        self.write("package_create", payload)
    }

    fn update_dataset(&self, payload: &JsonObject) -> Result<(), SyncError> {
        self.write("package_update", payload)
    }
}

impl CkanClient {
    fn write(&self, action: &str, payload: &JsonObject) -> Result<(), SyncError> {
        match self.call(action, &Value::Object(payload.clone()))? {
            ActionReply::Success(_) => Ok(()),
            ActionReply::NotFound => Err(SyncError::CatalogApi {
                action: action.to_string(),
                kind: NOT_FOUND_TYPE.to_string(),
                message: "not found".to_string(),
            }),
        }
    }
}

/// Decode an action response body.
pub fn interpret_reply(action: &str, status: u16, body: &str) -> Result<ActionReply, SyncError> {
    let envelope: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if status == 404 => return Ok(ActionReply::NotFound),
        Err(source) => {
            return Err(SyncError::CatalogResponse {
                action: action.to_string(),
                message: format!("HTTP {status}, body is not JSON: {source}"),
            })
        }
    };

    if envelope.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(ActionReply::Success(
            envelope.get("result").cloned().unwrap_or(Value::Null),
        ));
    }

    let error = envelope.get("error").cloned().unwrap_or(Value::Null);
    let kind = error
        .get("__type")
        .and_then(Value::as_str)
        .unwrap_or("Error")
        .to_string();

    if kind == NOT_FOUND_TYPE || status == 404 {
        return Ok(ActionReply::NotFound);
    }

    Err(SyncError::CatalogApi {
        action: action.to_string(),
        kind,
        message: describe_error(&error, status),
    })
}

/// CKAN puts either a `message` or per-field validation lists in the error.
fn describe_error(error: &Value, status: u16) -> String {
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return message.to_string();
    }

    let Some(fields) = error.as_object() else {
        return format!("HTTP {status}");
    };

    let details: Vec<String> = fields
        .iter()
        .filter(|(key, _)| key.as_str() != "__type")
        .map(|(key, value)| match value {
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                    .collect();
                format!("{key}: {}", parts.join("; "))
            }
            Value::String(text) => format!("{key}: {text}"),
            other => format!("{key}: {other}"),
        })
        .collect();

    if details.is_empty() {
        format!("HTTP {status}")
    } else {
        details.join(", ")
    }
}
