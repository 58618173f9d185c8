//! Actions exchanged between the UI layer and the WebSocket client.
//!
//! An action whose `meta` names a `method` is a request intent: the client
//! turns it into a wire request. Every other action is a plain state
//! transition event, including the `Start`/`Success`/`Error` events the client
//! produces in reply.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn is_false(value: &bool) -> bool {
    !*value
}

/// JavaScript-style truthiness, used where the UI contract relies on it
/// (a `start` cursor of `0` means "no cursor").
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Request flags and event metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionMeta {
    /// Remote model, e.g. `machine`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Remote verb, e.g. `list`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Fetch this endpoint at most once per connection.
    #[serde(default, skip_serializing_if = "is_false")]
    pub cache: bool,
    /// Bypass the implicit once-per-connection rule for `*list` methods.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nocache: bool,
    /// Keep fetching pages while full pages come back.
    #[serde(default, skip_serializing_if = "is_false")]
    pub batch: bool,
    /// Page size to use after the first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsequent_limit: Option<u64>,
    /// Store the result in the file context instead of the event payload.
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_file_context: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_context_key: Option<String>,
    /// The result is a JSON document encoded as a string.
    #[serde(default, skip_serializing_if = "is_false")]
    pub json_response: bool,
    /// The request payload a lifecycle event refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Value>,
}

/// A UI action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Action {
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ActionMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

impl Action {
    pub fn new(r#type: impl Into<String>) -> Self {
        Self {
            r#type: r#type.into(),
            ..Default::default()
        }
    }

    /// A request intent for `<model>.<method>`.
    pub fn request(
        r#type: impl Into<String>,
        model: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            r#type: r#type.into(),
            meta: Some(ActionMeta {
                model: Some(model.into()),
                method: Some(method.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Set `payload.params`.
    pub fn with_params(mut self, params: Value) -> Self {
        let mut payload = Map::new();
        payload.insert("params".to_string(), params);
        self.payload = Some(Value::Object(payload));
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_meta(mut self, meta: ActionMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Mutable access to the metadata, creating it if absent.
    pub fn meta_mut(&mut self) -> &mut ActionMeta {
        self.meta.get_or_insert_with(ActionMeta::default)
    }

    /// An action carrying an RPC method is a request intent.
    pub fn is_request(&self) -> bool {
        self.meta.as_ref().is_some_and(|m| m.method.is_some())
    }

    /// `<model>.<method>` for request intents.
    pub fn endpoint(&self) -> Option<String> {
        let meta = self.meta.as_ref()?;
        Some(format!("{}.{}", meta.model.as_deref()?, meta.method.as_deref()?))
    }

    pub fn params(&self) -> Option<&Value> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("params"))
            .filter(|p| !p.is_null())
    }

    pub fn params_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.payload
            .as_mut()
            .and_then(|p| p.get_mut("params"))
            .and_then(Value::as_object_mut)
    }

    /// The request payload as reported in lifecycle events: `params` when
    /// present, otherwise the whole payload.
    pub fn item(&self) -> Option<Value> {
        self.params().or(self.payload.as_ref()).cloned()
    }

    /// Page size of a paginated request.
    pub fn limit(&self) -> Option<u64> {
        self.params()
            .and_then(|p| p.get("limit"))
            .and_then(Value::as_u64)
            .filter(|l| *l > 0)
    }

    /// Whether the request asks for a page after a cursor.
    pub fn has_start(&self) -> bool {
        self.params()
            .and_then(|p| p.get("start"))
            .is_some_and(is_truthy)
    }

    /// Event type for this action with a lifecycle suffix appended.
    pub fn suffixed(&self, suffix: &str) -> String {
        format!("{}{}", self.r#type, suffix)
    }
}
