//! Processing service response model

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{UploadError, GENERIC_FAILURE};

/// Extracted details for one product. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub pick_up_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub drop_off_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub pick_up_location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub drop_off_location: Option<String>,
}

/// Structured data extracted from the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedData {
    /// Product name -> details. Keys are unique; iteration is by name.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub products: BTreeMap<String, ProductDetails>,
    /// OCR text the extraction ran on, when the service returns it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_ocr_text: Option<String>,
}

/// Parsed success body of `POST /process-image`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Identifier of the stored record; absent when the service skipped storage
    #[serde(default, deserialize_with = "lenient_text")]
    pub inserted_id: Option<String>,
    pub data: ExtractedData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl UploadResult {
    /// Parse a success body. Anything that is not a JSON object carrying a
    /// `data` object is [`UploadError::MalformedResponse`].
    pub fn from_slice(body: &[u8]) -> Result<Self, UploadError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| UploadError::MalformedResponse(format!("body is not JSON: {e}")))?;

        if !value.is_object() {
            return Err(UploadError::MalformedResponse(
                "body is not a JSON object".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| UploadError::MalformedResponse(e.to_string()))
    }

    /// Number of products extracted
    pub fn product_count(&self) -> usize {
        self.data.products.len()
    }

    /// Products ordered by name
    pub fn products(&self) -> impl Iterator<Item = (&str, &ProductDetails)> {
        self.data
            .products
            .iter()
            .map(|(name, details)| (name.as_str(), details))
    }
}

/// Message carried by a non-success body: `message`, then `detail`, then the
/// generic failure text.
pub(crate) fn rejection_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "detail"].iter().find_map(|key| {
                value
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_owned)
            })
        })
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}

/// Extraction output is loosely typed: accept strings, numbers and booleans as
/// text, treat `null` and blank strings as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        Some(other) => {
            return Err(de::Error::custom(format!("expected text, found {other}")));
        }
    })
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, ProductDetails>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, ProductDetails>>::deserialize(deserializer)?.unwrap_or_default())
}
