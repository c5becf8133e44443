use serde::{Deserialize, Serialize};

use crate::evaluator::Evaluation;

pub const STATUS_NO_CHANGE: u16 = 304;
pub const STATUS_OBJECT_DELETED: u16 = 202;

pub const NO_CHANGE: &str = "No Change";
pub const OBJECT_DELETED: &str = "Object Deleted";

/// Invocation response.
///
/// `body` holds the JSON encoding of the status text, so the serialized
/// form is `{"statusCode":202,"body":"\"Object Deleted\""}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub body: String,
}

impl Response {
    fn new(status_code: u16, text: &str) -> Self {
        Self {
            status_code,
            body: serde_json::Value::from(text).to_string(),
        }
    }

    pub fn no_change() -> Self {
        Self::new(STATUS_NO_CHANGE, NO_CHANGE)
    }

    pub fn object_deleted() -> Self {
        Self::new(STATUS_OBJECT_DELETED, OBJECT_DELETED)
    }
}

impl From<&Evaluation> for Response {
    fn from(evaluation: &Evaluation) -> Self {
        if evaluation.deleted {
            Self::object_deleted()
        } else {
            Self::no_change()
        }
    }
}
