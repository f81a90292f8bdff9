/// Translation of JSON/YAML parameter files into the command-line flag set.
///
/// Keys are long flag names. `true` becomes a bare flag, `false` and `null` are
/// dropped, lists expand to one value per element and any other scalar becomes
/// `--key value`. A `params` wrapper, either a mapping or a list of mappings,
/// is flattened first.
///
/// Sample names and complements are text. A YAML plain scalar such as `1e3`
/// is read as a float and its spelling is lost, so non-integer numbers under
/// `samples` or `complement` are rejected and must be quoted.

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

/// Finds the parameter file as given, falling back to the input directory.
pub fn locate_config(file: &str, input_dir: &str) -> Result<PathBuf> {
    let direct = PathBuf::from(file);
    if direct.is_file() {
        return Ok(direct);
    }
    let in_input = Path::new(input_dir).join(file);
    if in_input.is_file() {
        return Ok(in_input);
    }
    Err(anyhow!("Parameter file {} not found (also looked in {})", file, input_dir))
}

pub fn read_config_flags(path: &Path, format: ConfigFormat) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Could not read parameter file: {}", path.display()))?;
    let value: Value = match format {
        ConfigFormat::Json => serde_json::from_str(&raw)
            .with_context(|| format!("Could not parse JSON file: {}", path.display()))?,
        ConfigFormat::Yaml => serde_yaml::from_str(&raw)
            .with_context(|| format!("Could not parse YAML file: {}", path.display()))?,
    };
    value_to_flags(&value)
}

pub fn value_to_flags(value: &Value) -> Result<Vec<String>> {
    let params = flatten_params(value)?;
    let mut flags = Vec::new();

    for (key, val) in params.iter() {
        let flag = format!("--{}", key.trim().replace('_', "-"));
        if flag == "--json" || flag == "--yaml" {
            return Err(anyhow!("Parameter files cannot reference other parameter files ({})", key));
        }
        match val {
            Value::Bool(true) => flags.push(flag),
            Value::Bool(false) | Value::Null => {}
            Value::Array(items) => {
                if items.is_empty() {
                    continue;
                }
                flags.push(flag);
                for item in items {
                    flags.push(scalar_to_string(key, item)?);
                }
            }
            other => {
                flags.push(flag);
                flags.push(scalar_to_string(key, other)?);
            }
        }
    }

    Ok(flags)
}

fn flatten_params(value: &Value) -> Result<Map<String, Value>> {
    let mut merged = Map::new();
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                if key == "params" {
                    merged.extend(flatten_params(val)?);
                } else {
                    merged.insert(key.clone(), val.clone());
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                merged.extend(flatten_params(item)?);
            }
        }
        Value::Null => {}
        other => return Err(anyhow!("Expected a mapping of parameters, found {}", other)),
    }
    Ok(merged)
}

/// Keys whose values are names rather than numbers.
const NAME_KEYS: [&str; 2] = ["samples", "complement"];

fn scalar_to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if !(n.is_i64() || n.is_u64())
            && NAME_KEYS.contains(&key.trim().replace('_', "-").as_str()) =>
        {
            Err(anyhow!("Value {} for `{}` looks like a number; quote sample names and complements", n, key))
        }
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(anyhow!("Unsupported value for `{}`: {}", key, value)),
    }
}
