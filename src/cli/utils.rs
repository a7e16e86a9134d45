use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Map<String, Value>>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = Map::new();
            response.insert("success".into(), json!(true));
            response.insert("message".into(), json!(message));
            if let Some(fields) = data {
                response.extend(fields);
            }
            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Single key/value payload for `output_success`.
pub fn field(key: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value.into());
    map
}
