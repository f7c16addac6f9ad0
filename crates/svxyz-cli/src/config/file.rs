use crate::error::{CliError, Result};
use crate::utils::parser::{self, Assignment};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Json,
    Toml,
}

impl Syntax {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Syntax::Toml,
            _ => Syntax::Json,
        }
    }
}

fn parse_error(path: &Path, source: impl Into<anyhow::Error>) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

/// Reads a configuration file into a generic document.
pub fn load_document(path: &Path) -> Result<Value> {
    debug!("Loading configuration from file: {:?}", path);
    let content = fs::read_to_string(path)?;
    match Syntax::of(path) {
        Syntax::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Syntax::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Reads `path`, applies the `-S` overrides and deserialises the result.
pub fn load<T: DeserializeOwned>(path: &Path, set_values: &[String]) -> Result<T> {
    let mut document = load_document(path)?;
    apply_set_values(&mut document, set_values)?;
    serde_json::from_value(document).map_err(|e| parse_error(path, e))
}

pub fn save<T: Serialize>(path: &Path, config: &T) -> Result<()> {
    let text = match Syntax::of(path) {
        Syntax::Json => {
            let mut text = serde_json::to_string_pretty(config).map_err(anyhow::Error::from)?;
            text.push('\n');
            text
        }
        Syntax::Toml => {
            let document = serde_json::to_value(config).map_err(anyhow::Error::from)?;
            toml::to_string_pretty(&without_nulls(document)).map_err(anyhow::Error::from)?
        }
    };
    fs::write(path, text)?;
    Ok(())
}

/// Writes `default` to `path` unless the file exists. Returns whether it was created.
pub fn create_if_missing<T: Serialize>(path: &Path, default: &T) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save(path, default)?;
    info!("Default configuration created: {}", path.display());
    Ok(true)
}

/// TOML has no null: open bounds are left out instead of written as `null`, so a range
/// with any open side is omitted entirely and reads back as unbounded.
fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| {
                    let v = without_nulls(v);
                    let drop = match &v {
                        Value::Null => true,
                        Value::Array(items) => items.iter().any(Value::is_null),
                        _ => false,
                    };
                    (!drop).then_some((k, v))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(without_nulls).collect()),
        other => other,
    }
}

pub fn apply_set_values(document: &mut Value, set_values: &[String]) -> Result<()> {
    for raw in set_values {
        let assignment =
            parser::parse_assignment(raw).map_err(|e| CliError::Config(e.to_string()))?;
        debug!("Applying override {}", raw);
        assign(document, assignment)?;
    }
    Ok(())
}

fn assign(document: &mut Value, assignment: Assignment) -> Result<()> {
    let Assignment { path, value } = assignment;
    let key = path.join(".");
    let mut slot = document;
    for segment in &path {
        if slot.is_null() {
            *slot = Value::Object(Map::new());
        }
        slot = match slot {
            Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
            Value::Array(items) => {
                let index: usize = segment.parse().map_err(|_| {
                    CliError::Config(format!("'{}' in '{}' is not an array index", segment, key))
                })?;
                let len = items.len();
                items.get_mut(index).ok_or_else(|| {
                    CliError::Config(format!(
                        "Index {} in '{}' is out of range ({} items)",
                        index, key, len
                    ))
                })?
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Cannot set '{}': '{}' is not a table",
                    key, segment
                )));
            }
        };
    }
    *slot = value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::tempdir;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        name: String,
        range: [Option<f64>; 2],
        nested: Nested,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Nested {
        on: bool,
        count: usize,
    }

    fn sample() -> Sample {
        Sample {
            name: "run".into(),
            range: [None, Some(2.5)],
            nested: Nested {
                on: true,
                count: 500,
            },
        }
    }

    #[test]
    fn syntax_follows_the_extension() {
        assert_eq!(Syntax::of(Path::new("txyz.json")), Syntax::Json);
        assert_eq!(Syntax::of(Path::new("txyz.TOML")), Syntax::Toml);
        assert_eq!(Syntax::of(Path::new("txyz")), Syntax::Json);
    }

    #[test]
    fn json_round_trips_with_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.json");
        save(&path, &sample()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("null"));
        assert_eq!(load::<Sample>(&path, &[]).unwrap(), sample());
    }

    #[test]
    fn toml_output_leaves_out_open_bounds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.toml");
        save(&path, &sample()).unwrap();
        let document = load_document(&path).unwrap();
        assert_eq!(
            document,
            json!({"name": "run", "nested": {"on": true, "count": 500}})
        );
    }

    #[test]
    fn overrides_reach_nested_keys_and_array_items() {
        let mut document = serde_json::to_value(sample()).unwrap();
        apply_set_values(
            &mut document,
            &[
                "nested.count=10".into(),
                "range.0=-1.5".into(),
                "name=relaxed".into(),
                "extra.deep=1".into(),
            ],
        )
        .unwrap();
        assert_eq!(document["nested"]["count"], json!(10));
        assert_eq!(document["range"], json!([-1.5, 2.5]));
        assert_eq!(document["name"], json!("relaxed"));
        assert_eq!(document["extra"], json!({"deep": 1}));
    }

    #[test]
    fn bad_overrides_are_config_errors() {
        let mut document = serde_json::to_value(sample()).unwrap();
        for bad in ["name.inner=1", "range.7=1", "range.x=1", "nested"] {
            let result = apply_set_values(&mut document, &[bad.to_string()]);
            assert!(matches!(result, Err(CliError::Config(_))), "{bad}");
        }
    }

    #[test]
    fn an_existing_file_is_not_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.json");
        assert!(create_if_missing(&path, &sample()).unwrap());
        fs::write(&path, "{\"kept\": true}").unwrap();
        assert!(!create_if_missing(&path, &sample()).unwrap());
        assert_eq!(load_document(&path).unwrap(), json!({"kept": true}));
    }

    #[test]
    fn malformed_files_name_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        match load_document(&path) {
            Err(CliError::FileParsing { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
