//! Wire types for the remote API.
//!
//! Collections are paginated: each page carries its items in `data` and a
//! `pages.next_url` cursor to the next page, absent on the last one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a paginated GET response.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub data: Vec<Value>,
    #[serde(default)]
    pub pages: Option<Pages>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pages {
    #[serde(default)]
    pub next_url: Option<String>,
}

/// Envelope around every resource the service returns.
#[derive(Debug, Clone, Deserialize)]
pub struct Resource<T> {
    pub id: i64,
    pub object: String,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectData {
    #[serde(default)]
    pub characters: Option<String>,
    pub level: i64,
    pub slug: String,
    pub document_url: String,
    #[serde(default)]
    pub meaning_mnemonic: Option<String>,
    #[serde(default)]
    pub reading_mnemonic: Option<String>,
    #[serde(default)]
    pub hidden_at: Option<String>,
    pub meanings: Vec<MeaningData>,
    #[serde(default)]
    pub readings: Vec<ReadingData>,
    #[serde(default)]
    pub component_subject_ids: Vec<i64>,
    #[serde(default)]
    pub amalgamation_subject_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeaningData {
    pub meaning: String,
    pub primary: bool,
    pub accepted_answer: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadingData {
    pub reading: String,
    pub primary: bool,
    pub accepted_answer: bool,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentData {
    pub subject_id: i64,
    pub srs_stage: i64,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub available_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub unlocked_at: Option<String>,
}

/// The `user` endpoint wraps its data without an id.
#[derive(Debug, Clone, Deserialize)]
pub struct UserResource {
    pub data: UserData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub level: i64,
}

/// Body for POST `reviews`.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSubmission {
    pub review: ReviewPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewPayload {
    pub assignment_id: i64,
    pub incorrect_meaning_answers: i64,
    pub incorrect_reading_answers: i64,
    pub created_at: String,
}

/// Body for PUT `assignments/{id}/start`.
#[derive(Debug, Clone, Serialize)]
pub struct StartAssignmentPayload {
    pub started_at: String,
}
