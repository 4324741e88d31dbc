use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One row of a list window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    #[serde(rename = "Id")]
    pub code: ShortCode,
    #[serde(rename = "URL")]
    pub url: String,
    /// Hit count, always 0 when counting is disabled.
    #[serde(rename = "Count")]
    pub count: u64,
}

/// What an upsert did with a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertMessage {
    Inserted,
    Updated,
    Failed(String),
}

impl UpsertMessage {
    pub fn failed(err: impl Display) -> Self {
        Self::Failed(err.to_string())
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl Display for UpsertMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertMessage::Inserted => f.write_str("success/insert"),
            UpsertMessage::Updated => f.write_str("success/update"),
            UpsertMessage::Failed(reason) => write!(f, "fail:{reason}"),
        }
    }
}

/// Result of reconciling one externally supplied code.
///
/// `code` is the raw input text, so an item that failed to decode still
/// reports what the caller sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub code: String,
    pub message: UpsertMessage,
}

impl UpsertOutcome {
    pub fn new(code: impl Into<String>, message: UpsertMessage) -> Self {
        Self {
            code: code.into(),
            message,
        }
    }
}

/// Bulk-load response item, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertRespItem {
    #[serde(rename = "Id")]
    pub code: String,
    pub msg: String,
    #[serde(rename = "Pos")]
    pub pos: usize,
}

impl UpsertRespItem {
    pub fn new(outcome: UpsertOutcome, pos: usize) -> Self {
        Self {
            code: outcome.code,
            msg: outcome.message.to_string(),
            pos,
        }
    }
}

/// One item of a bulk-load request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItem {
    #[serde(alias = "URL", alias = "Url")]
    pub url: String,
    #[serde(rename = "Id", alias = "id", alias = "ID")]
    pub code: String,
}

/// Bulk-load request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    #[serde(alias = "Data", default)]
    pub data: Vec<BulkItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_entry_wire_shape() {
        let entry = ListEntry {
            code: ShortCode::from_id(36),
            url: "http://example.com".to_string(),
            count: 3,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "Id": "10", "URL": "http://example.com", "Count": 3 })
        );
    }

    #[test]
    fn upsert_messages() {
        assert_eq!(UpsertMessage::Inserted.to_string(), "success/insert");
        assert_eq!(UpsertMessage::Updated.to_string(), "success/update");
        assert_eq!(
            UpsertMessage::failed("invalid short code: bad").to_string(),
            "fail:invalid short code: bad"
        );
        assert!(!UpsertMessage::failed("x").is_success());
    }

    #[test]
    fn resp_item_wire_shape() {
        let item = UpsertRespItem::new(UpsertOutcome::new("5", UpsertMessage::Inserted), 0);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "Id": "5", "msg": "success/insert", "Pos": 0 })
        );
    }

    #[test]
    fn bulk_request_accepts_legacy_field_names() {
        let body = r#"{"Data":[{"url":"http://x","Id":"5"},{"URL":"http://y","id":"z"}]}"#;
        let request: BulkRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.data.len(), 2);
        assert_eq!(request.data[1].url, "http://y");
        assert_eq!(request.data[1].code, "z");
    }
}
