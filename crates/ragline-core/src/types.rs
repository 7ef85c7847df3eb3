//! Domain types shared by the embedder, the vector store, the model
//! gateways and the orchestrator.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

pub type SegmentId = u64;

/// A stored span of a longer document.
///
/// - `id`: store-assigned insertion sequence number
/// - `text`: the chunk payload
/// - `distance`: distance to the query vector, present on retrieval results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub text: String,
    pub distance: Option<f32>,
}

/// Write-side segment: text plus its embedding. Immutable once stored.
#[derive(Debug, Clone)]
pub struct NewSegment {
    pub text: String,
    pub vector: Vec<f32>,
}

/// Segments ordered by ascending distance, ties broken by ascending id and
/// then by text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    segments: Vec<Segment>,
}

impl RetrievalResult {
    /// Sorts by `(distance, id, text)` and keeps at most `top_n` entries.
    /// Ids are only unique per writer, so text keeps the order total.
    pub fn from_unsorted(mut segments: Vec<Segment>, top_n: usize) -> Self {
        segments.sort_by(|a, b| {
            let da = a.distance.unwrap_or(f32::INFINITY);
            let db = b.distance.unwrap_or(f32::INFINITY);
            da.total_cmp(&db).then(a.id.cmp(&b.id)).then_with(|| a.text.cmp(&b.text))
        });
        segments.truncate(top_n);
        Self { segments }
    }

    pub fn empty() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.segments.len() }
    pub fn is_empty(&self) -> bool { self.segments.is_empty() }
    pub fn segments(&self) -> &[Segment] { &self.segments }
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> { self.segments.iter() }
    pub fn texts(&self) -> Vec<String> { self.segments.iter().map(|s| s.text.clone()).collect() }
    pub fn into_segments(self) -> Vec<Segment> { self.segments }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;
    fn into_iter(self) -> Self::IntoIter { self.segments.iter() }
}

/// Knobs forwarded to a chat-completion backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Outcome of one backend call. Gateways never raise; they return this.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Success { text: String },
    Failure { kind: ErrorKind, message: String },
}

impl ModelResponse {
    pub fn success(text: impl Into<String>) -> Self { ModelResponse::Success { text: text.into() } }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        ModelResponse::Failure { kind, message: message.into() }
    }

    pub fn is_success(&self) -> bool { matches!(self, ModelResponse::Success { .. }) }
}

impl From<Error> for ModelResponse {
    fn from(e: Error) -> Self { ModelResponse::failure(e.kind(), e.message()) }
}

/// Which registry slot served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSlot {
    Primary,
    Fallback,
}

impl BackendSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendSlot::Primary => "primary",
            BackendSlot::Fallback => "fallback",
        }
    }

    pub fn other(self) -> Self {
        match self {
            BackendSlot::Primary => BackendSlot::Fallback,
            BackendSlot::Fallback => BackendSlot::Primary,
        }
    }
}

impl std::fmt::Display for BackendSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for BackendSlot {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(BackendSlot::Primary),
            "fallback" => Ok(BackendSlot::Fallback),
            other => Err(format!("unknown backend slot '{other}', expected primary or fallback")),
        }
    }
}

/// The unit returned to the chat boundary.
///
/// `backend_used` is `None` only when no model call was attempted
/// (validation or retrieval failure). `sources` lists the retrieved
/// segment texts in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagAnswer {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub backend_used: Option<BackendSlot>,
    pub retrieved_count: usize,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl RagAnswer {
    pub fn answered(text: String, backend: BackendSlot, sources: Vec<String>) -> Self {
        Self { success: true, answer: text, error: None, backend_used: Some(backend), retrieved_count: sources.len(), sources }
    }

    pub fn failed(error: impl Into<String>, backend: Option<BackendSlot>, sources: Vec<String>) -> Self {
        Self { success: false, answer: String::new(), error: Some(error.into()), backend_used: backend, retrieved_count: sources.len(), sources }
    }
}
