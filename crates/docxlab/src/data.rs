//! JSON data file loading
//!
//! A data file is a JSON object whose top-level keys become the binding.
//! Objects of the shape `{"$image": <path>, "width": <cm>, "height": <cm>}`
//! load an image from disk (path relative to the data file); plain objects
//! with `url`/`label` keys already work with LINK as maps.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use docxlab_core::{ImagePars, ReportData, Value};

fn number(json: &serde_json::Value, key: &str) -> Option<f64> {
    json.get(key).and_then(serde_json::Value::as_f64)
}

fn image_from_json(json: &serde_json::Value, path: &str, base_dir: &Path) -> Result<Value> {
    let image_path = base_dir.join(path);
    let bytes = std::fs::read(&image_path)
        .with_context(|| format!("cannot read image '{}'", image_path.display()))?;
    let extension = image_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .ok_or_else(|| anyhow!("image '{}' has no extension", image_path.display()))?;

    Ok(Value::Image(ImagePars {
        width: number(json, "width").unwrap_or(5.0),
        height: number(json, "height").unwrap_or(5.0),
        data: bytes,
        extension,
        caption: json
            .get("caption")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned),
    }))
}

fn convert(json: &serde_json::Value, base_dir: &Path) -> Result<Value> {
    if let serde_json::Value::Object(map) = json {
        if let Some(serde_json::Value::String(path)) = map.get("$image") {
            return image_from_json(json, path, base_dir);
        }
        let mut out = std::collections::BTreeMap::new();
        for (key, value) in map {
            out.insert(key.clone(), convert(value, base_dir)?);
        }
        return Ok(Value::Map(out));
    }
    if let serde_json::Value::Array(items) = json {
        let converted: Result<Vec<Value>> =
            items.iter().map(|item| convert(item, base_dir)).collect();
        return Ok(Value::List(converted?));
    }
    Ok(Value::from_json(json))
}

/// Load a data file into a report binding.
pub fn load_data(path: &Path) -> Result<ReportData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read data file '{}'", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("data file '{}' is not valid JSON", path.display()))?;
    let base_dir = path.parent().unwrap_or(Path::new("."));

    match convert(&json, base_dir)? {
        Value::Map(map) => Ok(map.into_iter().collect()),
        _ => Err(anyhow!(
            "data file '{}' must contain a JSON object",
            path.display()
        )),
    }
}
