use axum::body::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

// Extracted fields - requested field name -> value
pub type ExtractedFields = Map<String, Value>;

// One uploaded image inside a batch
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub index: usize,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl WorkItem {
    pub fn new(index: usize, filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            index,
            filename: filename.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    // Mime type sent along with the image, jpeg when the client did not say
    pub fn mime_type(&self) -> &str {
        match self.content_type.as_deref() {
            Some(mime) if mime.starts_with("image/") => mime,
            _ => "image/jpeg",
        }
    }

    // Short content digest, used to correlate log lines for the same upload
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(&self.bytes);
        format!("{:x}", hash)[..12].to_string()
    }
}

/// Terminal result for one [`WorkItem`].
///
/// A failure is kept apart from an extraction that found nothing, the two only
/// look the same once rendered for the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Extracted(ExtractedFields),
    Failed { reason: String },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn into_value(self) -> Value {
        match self {
            Outcome::Extracted(fields) => Value::Object(fields),
            Outcome::Failed { .. } => Value::Object(Map::new()),
        }
    }
}

// Outcomes in the same order as the submitted items
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult(pub Vec<Outcome>);

impl BatchResult {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.0.iter().filter(|outcome| outcome.is_failed()).count()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.0
    }
}

// POST /scan response format
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub results: Vec<Value>,
}

impl From<BatchResult> for ScanResponse {
    fn from(batch: BatchResult) -> Self {
        Self {
            results: batch.0.into_iter().map(Outcome::into_value).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_outcomes_render_as_empty_objects() {
        let mut fields = ExtractedFields::new();
        fields.insert("total".to_string(), json!(1200));

        let batch = BatchResult(vec![
            Outcome::Extracted(fields),
            Outcome::Failed {
                reason: "timed out".to_string(),
            },
            Outcome::Extracted(ExtractedFields::new()),
        ]);
        assert_eq!(batch.failed(), 1);

        let body = serde_json::to_value(ScanResponse::from(batch)).unwrap();
        assert_eq!(body, json!({ "results": [{ "total": 1200 }, {}, {}] }));
    }

    #[test]
    fn mime_type_falls_back_to_jpeg() {
        let item = WorkItem::new(0, "a.png", vec![1, 2, 3]);
        assert_eq!(item.mime_type(), "image/jpeg");
        assert_eq!(item.clone().with_content_type("image/png").mime_type(), "image/png");
        assert_eq!(
            item.with_content_type("application/octet-stream").mime_type(),
            "image/jpeg"
        );
    }

    #[test]
    fn digest_is_stable_and_short() {
        let a = WorkItem::new(0, "a.jpg", vec![1, 2, 3]);
        let b = WorkItem::new(5, "b.jpg", vec![1, 2, 3]);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 12);
    }
}
