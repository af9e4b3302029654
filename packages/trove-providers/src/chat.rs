use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Sends one chat completion request and returns the JSON object the model answered with.
///
/// A single attempt is made. Transport failures, non-success statuses and answers that do not
/// contain a JSON object all surface as errors for the caller to absorb.
pub async fn complete_json(cfg: &trove_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"response_format": { "type": "json_object" },
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_chat_json(json)
}

fn parse_chat_json(json: Value) -> Result<Value> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat response is missing message content.".to_string(),
		})?;
	let object = extract_json_object(content).ok_or_else(|| Error::InvalidResponse {
		message: "Chat content does not contain a JSON object.".to_string(),
	})?;
	let parsed: Value = serde_json::from_str(object)?;

	if !parsed.is_object() {
		return Err(Error::InvalidResponse {
			message: "Chat content JSON is not an object.".to_string(),
		});
	}

	Ok(parsed)
}

// Models sometimes wrap the object in a markdown fence or add a sentence around it.
fn extract_json_object(content: &str) -> Option<&str> {
	let start = content.find('{')?;
	let end = content.rfind('}')?;

	(start < end).then(|| &content[start..=end])
}
