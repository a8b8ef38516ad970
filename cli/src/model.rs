//! Model description loading: a JSON operator list plus an optional sibling
//! `.bin` weight blob. This is glue around the in-memory description the
//! engine consumes; the engine itself never parses anything.

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use quiver_core::record::{OpRecord, ParamValue};
use quiver_data::tensor::Tensor;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

#[derive(Deserialize)]
struct ModelFile {
    operators: Vec<OperatorDef>,
}

#[derive(Deserialize)]
struct OperatorDef {
    #[serde(rename = "type")]
    ty: String,
    name: String,
    #[serde(default)]
    params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    weight_key: Option<String>,
}

/// Loads the operator records, plus the weight table when a `.bin` file sits
/// next to the model description.
pub fn load(path: &Path) -> Result<(Vec<OpRecord>, HashMap<String, Tensor>)> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: ModelFile = serde_json::from_str(&text).context("parsing the model description")?;
    let mut records = Vec::with_capacity(file.operators.len());
    for def in file.operators {
        let mut record = OpRecord::new(def.ty, def.name);
        for (key, value) in def.params {
            let value = param_value(&key, value)?;
            record.params.insert(key, value);
        }
        record.inputs = def.inputs;
        record.outputs = def.outputs;
        record.weight_key = def.weight_key;
        records.push(record);
    }
    let blob = path.with_extension("bin");
    let weights = if blob.exists() { load_weights(&blob)? } else { HashMap::new() };
    Ok((records, weights))
}

fn param_value(key: &str, value: serde_json::Value) -> Result<ParamValue> {
    use serde_json::Value;
    Ok(match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => ParamValue::Int(i),
            None => ParamValue::Float(
                n.as_f64().with_context(|| format!("parameter {key} is not a finite number"))?
                    as f32,
            ),
        },
        Value::String(s) => ParamValue::Str(s),
        Value::Array(items) => {
            let ints: Option<Vec<i64>> = items.iter().map(|v| v.as_i64()).collect();
            match ints {
                Some(ints) => ParamValue::IntArray(ints),
                None => {
                    let mut floats = Vec::with_capacity(items.len());
                    for item in &items {
                        floats.push(item.as_f64().with_context(|| {
                            format!("parameter {key} holds a non-numeric array element")
                        })? as f32);
                    }
                    ParamValue::FloatArray(floats)
                }
            }
        }
        other => bail!("parameter {key} has an unsupported value {other}"),
    })
}

/// Weight blob format: repeated `[u32 name_len][name][u32 rank][u32 dims…]
/// [f32 values…]`, little endian.
fn load_weights(path: &Path) -> Result<HashMap<String, Tensor>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut cursor = std::io::Cursor::new(bytes.as_slice());
    let mut table = HashMap::new();
    while (cursor.position() as usize) < bytes.len() {
        let name_len = cursor.read_u32::<LittleEndian>()? as usize;
        let mut name = vec![0u8; name_len];
        cursor.read_exact(&mut name)?;
        let name = String::from_utf8(name).context("weight entry name is not utf-8")?;
        let rank = cursor.read_u32::<LittleEndian>()? as usize;
        if !(1..=3).contains(&rank) {
            bail!("weight entry {name} has unsupported rank {rank}");
        }
        let mut shape = Vec::with_capacity(rank);
        for _ in 0..rank {
            shape.push(cursor.read_u32::<LittleEndian>()? as usize);
        }
        let len: usize = shape.iter().product();
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(cursor.read_f32::<LittleEndian>()?);
        }
        table.insert(name, Tensor::from_vec(&shape, values));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_description() {
        let text = r#"{
            "operators": [
                {"type": "pnnx.Input", "name": "input_0", "outputs": ["in"]},
                {"type": "nn.LeakyRelu", "name": "lrelu_0",
                 "params": {"negative_slope": 0.1},
                 "inputs": ["in"], "outputs": ["out"]},
                {"type": "pnnx.Output", "name": "output_0", "inputs": ["out"]}
            ]
        }"#;
        let file: ModelFile = serde_json::from_str(text).unwrap();
        assert_eq!(file.operators.len(), 3);
        let slope = param_value(
            "negative_slope",
            file.operators[1].params["negative_slope"].clone(),
        )
        .unwrap();
        assert_eq!(slope, ParamValue::Float(0.1));
    }

    #[test]
    fn arrays_keep_their_numeric_kind() {
        let ints = param_value("k", serde_json::json!([1, 2, 3])).unwrap();
        assert_eq!(ints, ParamValue::IntArray(vec![1, 2, 3]));
        let floats = param_value("k", serde_json::json!([2.0, 0.5])).unwrap();
        assert_eq!(floats, ParamValue::FloatArray(vec![2.0, 0.5]));
    }
}
