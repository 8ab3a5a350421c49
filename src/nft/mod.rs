//! NFT metadata: the structured object the model is asked to produce.

use chrono::DateTime;
use once_cell::sync::Lazy;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_NAME: &str = "nft_metadata";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Attribute {
    /// Key of the attribute
    #[schemars(length(min = 1, max = 5))]
    pub key: String,
    /// Value of the attribute
    #[schemars(length(min = 1, max = 5))]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NftMetadata {
    /// Name of the NFT. Japanese is supported.
    #[schemars(length(min = 1))]
    pub name: String,
    /// Symbol of the NFT
    #[schemars(length(min = 1, max = 10))]
    pub symbol: String,
    /// Description of the NFT. Markdown is supported.
    #[schemars(length(min = 1, max = 30))]
    pub description: String,
    /// URL of the official page of the NFT
    #[serde(rename = "external_url", default, skip_serializing_if = "Option::is_none")]
    #[schemars(url)]
    pub external_url: Option<String>,
    /// URL of the image of the NFT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(url)]
    pub image: Option<String>,
    /// Date when the event starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(extend("format" = "date-time"))]
    pub starts_at: Option<String>,
    /// Date when the event ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(extend("format" = "date-time"))]
    pub ends_at: Option<String>,
    /// Attributes of the NFT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(max = 3))]
    pub attributes: Option<Vec<Attribute>>,
    /// Description of how to acquire the NFT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_acquire: Option<String>,
    /// True if the NFT is used as a coupon.
    pub is_coupon: bool,
}

static SCHEMA: Lazy<Value> = Lazy::new(|| {
    let mut schema = schema_for!(NftMetadata).to_value();
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
    }
    schema
});

/// JSON schema handed to the model, derived from [`NftMetadata`]
pub fn schema() -> Value {
    SCHEMA.clone()
}

impl NftMetadata {
    /// Check the bounds the JSON schema states but the provider does not enforce
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let value = serde_json::to_value(self).map_err(|e| vec![e.to_string()])?;
        let mut errors = Vec::new();
        check_bounds(&value, &SCHEMA, &SCHEMA, "", &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn field_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

fn limit(schema: &Value, keyword: &str) -> Option<usize> {
    schema.get(keyword).and_then(Value::as_u64).map(|n| n as usize)
}

/// Walk `value` against the length, item count and format keywords of
/// `schema`. Types and required fields are left to serde.
fn check_bounds(value: &Value, schema: &Value, root: &Value, path: &str, errors: &mut Vec<String>) {
    if let Some(target) = schema.get("$ref").and_then(Value::as_str) {
        if let Some(resolved) = target.strip_prefix('#').and_then(|p| root.pointer(p)) {
            check_bounds(value, resolved, root, path, errors);
        }
        return;
    }

    match value {
        Value::String(text) => {
            let len = text.chars().count();
            if let Some(min) = limit(schema, "minLength").filter(|min| len < *min) {
                errors.push(format!("{} must be at least {} characters", path, min));
            }
            if let Some(max) = limit(schema, "maxLength").filter(|max| len > *max) {
                errors.push(format!("{} must be at most {} characters", path, max));
            }
            match schema.get("format").and_then(Value::as_str) {
                Some("uri") if url::Url::parse(text).is_err() => {
                    errors.push(format!("{} must be a URL", path));
                }
                Some("date-time") if DateTime::parse_from_rfc3339(text).is_err() => {
                    errors.push(format!("{} must be an RFC 3339 date-time", path));
                }
                _ => {}
            }
        }
        Value::Array(items) => {
            if let Some(max) = limit(schema, "maxItems").filter(|max| items.len() > *max) {
                errors.push(format!("{} must have at most {} entries", path, max));
            }
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    check_bounds(item, item_schema, root, &item_path, errors);
                }
            }
        }
        Value::Object(fields) => {
            let Some(properties) = schema.get("properties") else {
                return;
            };
            for (name, field) in fields {
                if let Some(field_schema) = properties.get(name) {
                    check_bounds(field, field_schema, root, &field_path(path, name), errors);
                }
            }
        }
        _ => {}
    }
}

/// Prompt wrapping the user's free-text context
pub fn prompt(context: &str) -> String {
    format!(
        "Generate NFT metadata with following context: {context}\n\
         Do not make stuff up for the external_url, howToAcquire, image, startsAt, endsAt fields.\n\
         If they are not provided, they should not be included in the output.\n\
         Provided dates are in JST.\n\
         For startsAt and endsAt, look for the date in the context \
         and use it as the date when the event starts and ends."
    )
}

/// Parse and validate the text the model streamed back
pub fn check_generated(text: &str) -> Result<NftMetadata, Vec<String>> {
    let metadata: NftMetadata = serde_json::from_str(text)
        .map_err(|e| vec![format!("not valid NFT metadata JSON: {}", e)])?;
    metadata.validate()?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NftMetadata {
        NftMetadata {
            name: "夏祭り".into(),
            symbol: "NATSU".into(),
            description: "Summer festival ticket".into(),
            external_url: Some("https://example.com/festival".into()),
            image: None,
            starts_at: Some("2024-08-01T18:00:00+09:00".into()),
            ends_at: None,
            attributes: Some(vec![Attribute {
                key: "day".into(),
                value: "1".into(),
            }]),
            how_to_acquire: None,
            is_coupon: false,
        }
    }

    #[test]
    fn wire_names_match_schema() {
        let v = serde_json::to_value(sample()).unwrap();
        assert!(v.get("external_url").is_some());
        assert!(v.get("startsAt").is_some());
        assert!(v.get("isCoupon").is_some());
        assert!(v.get("image").is_none());

        let properties = schema()["properties"].as_object().unwrap().clone();
        for key in v.as_object().unwrap().keys() {
            assert!(properties.contains_key(key), "{} missing from schema", key);
        }
    }

    #[test]
    fn valid_metadata_passes() {
        assert_eq!(sample().validate(), Ok(()));
        let text = serde_json::to_string(&sample()).unwrap();
        assert_eq!(check_generated(&text).unwrap(), sample());
    }

    #[test]
    fn bounds_are_enforced() {
        let mut nft = sample();
        nft.symbol = "TOOLONGSYMBOL".into();
        nft.external_url = Some("not a url".into());
        nft.ends_at = Some("tomorrow".into());
        nft.attributes = Some(vec![
            Attribute { key: "k".into(), value: "v".into() },
            Attribute { key: "k".into(), value: "v".into() },
            Attribute { key: "k".into(), value: "v".into() },
            Attribute { key: "toolong".into(), value: "".into() },
        ]);
        let errors = nft.validate().unwrap_err();
        assert_eq!(errors.len(), 6, "{:?}", errors);
        assert!(errors.contains(&"symbol must be at most 10 characters".to_string()));
        assert!(errors.contains(&"attributes must have at most 3 entries".to_string()));
        assert!(errors.contains(&"attributes[3].value must be at least 1 characters".to_string()));
    }

    #[test]
    fn schema_is_derived_from_struct() {
        let schema = schema();
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["properties"]["symbol"]["maxLength"], 10);
        assert_eq!(schema["properties"]["description"]["maxLength"], 30);
        assert_eq!(schema["properties"]["external_url"]["format"], "uri");
        assert_eq!(schema["properties"]["startsAt"]["format"], "date-time");
        assert_eq!(schema["properties"]["attributes"]["maxItems"], 3);
        assert_eq!(
            schema["properties"]["isCoupon"]["description"],
            "True if the NFT is used as a coupon."
        );

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        for field in ["name", "symbol", "description", "isCoupon"] {
            assert!(required.contains(&field), "{} not required", field);
        }
        assert!(!required.contains(&"image"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut v = serde_json::to_value(sample()).unwrap();
        v["rarity"] = "legendary".into();
        assert!(check_generated(&v.to_string()).is_err());
    }

    #[test]
    fn incomplete_text_is_rejected() {
        assert!(check_generated("{\"name\": \"x\"").is_err());
        assert!(check_generated("{\"name\": \"x\"}").is_err());
    }

    #[test]
    fn prompt_embeds_context() {
        let p = prompt("Concert on 8/1");
        assert!(p.starts_with("Generate NFT metadata with following context: Concert on 8/1\n"));
        assert!(p.contains("Provided dates are in JST."));
    }
}
