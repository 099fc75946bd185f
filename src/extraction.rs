use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ExtractionError;
use crate::models::{ExtractedFields, WorkItem};

const INSTRUCTION_TEMPLATE: &str = "\
You are an OCR specialist that reads specific fields off a receipt.
Extract exactly the fields listed below from the attached image and answer in JSON.
Fields to extract:
{fields}
Rules:
- Answer with a single JSON object and nothing else.
- Any value that carries a date or time must be formatted as \"YYYY-MM-DD HH:MM:SS\".
- If a field is not present in the image, use an empty string (\"\") for text fields and 0 for numeric fields.
- Do not add explanations, comments or extra keys.
- Only report what is actually visible in the image, never guess.
- Every key must match the requested field name exactly.
";

/// Turns one image plus an ordered list of field names into structured data.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        item: &WorkItem,
        fields: &[String],
    ) -> Result<ExtractedFields, ExtractionError>;
}

pub fn build_instruction(fields: &[String]) -> String {
    let listed = serde_json::to_string(fields).unwrap_or_default();
    INSTRUCTION_TEMPLATE.replace("{fields}", &listed)
}

// data:image/jpeg;base64,... url for the image_url content part
pub fn image_data_url(item: &WorkItem) -> String {
    format!(
        "data:{};base64,{}",
        item.mime_type(),
        BASE64_STANDARD.encode(&item.bytes)
    )
}

// Chat completions response, only the parts we read
#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Deserialize, Debug)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Pulls the extracted object out of a chat completion.
///
/// The first choice must be a JSON object holding every requested field.
/// Keys nobody asked for are dropped, a missing one makes the reply malformed.
pub fn parse_reply(
    response: ChatCompletionResponse,
    fields: &[String],
) -> Result<ExtractedFields, ExtractionError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ExtractionError::EmptyResponse)?;

    match serde_json::from_str::<Value>(content.trim()) {
        Ok(Value::Object(reply)) => project_fields(reply, fields),
        Ok(other) => Err(ExtractionError::Malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ExtractionError::Malformed(e.to_string())),
    }
}

fn project_fields(
    mut reply: ExtractedFields,
    fields: &[String],
) -> Result<ExtractedFields, ExtractionError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|field| !reply.contains_key(field.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionError::Malformed(format!(
            "reply is missing requested fields {missing:?}"
        )));
    }

    let extra = reply.len().saturating_sub(fields.len());
    if extra > 0 {
        tracing::debug!(extra, "dropping unrequested fields from reply");
    }
    Ok(fields
        .iter()
        .filter_map(|field| reply.remove_entry(field.as_str()))
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// Extractor backed by an OpenAI-compatible chat/completions endpoint
pub struct OpenAiExtractor {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiExtractor {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        // add https:// if not present
        let base = if base_url.starts_with("http") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", base_url.trim_end_matches('/'))
        };
        Self {
            client,
            endpoint: format!("{base}/chat/completions"),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        }
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn request_body(&self, item: &WorkItem, fields: &[String]) -> Value {
        json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": build_instruction(fields) },
                    { "type": "image_url", "image_url": { "url": image_data_url(item) } },
                ],
            }],
            "max_tokens": self.max_tokens,
            "response_format": { "type": "json_object" },
        })
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn extract(
        &self,
        item: &WorkItem,
        fields: &[String],
    ) -> Result<ExtractedFields, ExtractionError> {
        tracing::debug!(
            index = item.index,
            file = %item.filename,
            digest = %item.digest(),
            model = %self.model,
            "calling extraction backend"
        );

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(item, fields))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion = res
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        parse_reply(completion, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: Option<&str>) -> ChatCompletionResponse {
        ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: ChatMessage {
                    content: content.map(str::to_string),
                },
            }],
        }
    }

    fn requested(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn parses_object_reply() {
        let fields = parse_reply(
            completion(Some(
                r#" {"store": "Cafe", "total": 4500, "date": "2024-05-01 12:30:00"} "#,
            )),
            &requested(&["store", "total", "date"]),
        )
        .unwrap();
        assert_eq!(fields["store"], "Cafe");
        assert_eq!(fields["total"], 4500);
        assert_eq!(fields["date"], "2024-05-01 12:30:00");
    }

    #[test]
    fn reply_without_requested_fields_is_malformed() {
        let err = parse_reply(
            completion(Some(r#"{"unrelated": "garbage"}"#)),
            &requested(&["store", "total"]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Malformed(ref msg) if msg.contains("store") && msg.contains("total")
        ));

        let err = parse_reply(
            completion(Some(r#"{"store": "Cafe"}"#)),
            &requested(&["store", "total"]),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed(ref msg) if msg.contains("total")));
    }

    #[test]
    fn unrequested_keys_are_dropped() {
        let fields = parse_reply(
            completion(Some(r#"{"store": "Cafe", "total": 0, "note": "thanks!"}"#)),
            &requested(&["store", "total"]),
        )
        .unwrap();
        assert_eq!(fields.len(), 2);
        assert!(!fields.contains_key("note"));
        assert_eq!(fields["total"], 0);
    }

    #[test]
    fn non_object_reply_is_malformed() {
        let fields = requested(&["store", "total"]);
        let err = parse_reply(completion(Some(r#"["store", "total"]"#)), &fields).unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed(ref msg) if msg.contains("an array")));

        let err = parse_reply(
            completion(Some("Sorry, I cannot read this receipt.")),
            &fields,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed(_)));
    }

    #[test]
    fn missing_content_is_empty_response() {
        let fields = requested(&["store"]);
        let err = parse_reply(ChatCompletionResponse { choices: vec![] }, &fields).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyResponse));

        let err = parse_reply(completion(None), &fields).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyResponse));

        let err = parse_reply(completion(Some("  ")), &fields).unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyResponse));
    }

    #[test]
    fn completion_body_deserializes() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"a\": \"\"}"}}]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parse_reply(parsed, &requested(&["a"])).unwrap()["a"], "");
    }

    #[test]
    fn request_body_carries_fields_and_image() {
        let extractor = OpenAiExtractor::new(
            reqwest::Client::new(),
            "api.example.com/v1/",
            "sk-test",
            "gpt-4.1-mini",
            4096,
        );
        assert_eq!(extractor.endpoint(), "https://api.example.com/v1/chat/completions");

        let item = WorkItem::new(0, "r.png", vec![0xff, 0xd8]).with_content_type("image/png");
        let fields = vec!["store".to_string(), "total".to_string()];
        let body = extractor.request_body(&item, &fields);

        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["response_format"]["type"], "json_object");

        let content = &body["messages"][0]["content"];
        assert!(content[0]["text"].as_str().unwrap().contains(r#"["store","total"]"#));
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,/9g=");
    }
}
