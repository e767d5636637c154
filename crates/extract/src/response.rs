//! Pulling the JSON document out of a model reply.

use serde_json::Value;

use crate::error::ExtractError;

/// Strip markdown fences and surrounding prose from a reply.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + 7..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    // Bare fence, possibly with another language tag on the opening line.
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let content_start = after.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after[content_start..].find("```") {
            return after[content_start..content_start + end].trim();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

/// Parse a reply into a JSON object.
pub fn parse_object(response: &str) -> Result<Value, ExtractError> {
    let json = extract_json(response);
    let value: Value = serde_json::from_str(json).map_err(|e| ExtractError::InvalidJson {
        reason: e.to_string(),
        raw_response: response.to_string(),
    })?;
    if !value.is_object() {
        return Err(ExtractError::InvalidJson {
            reason: "top-level value is not an object".into(),
            raw_response: response.to_string(),
        });
    }
    Ok(value)
}
