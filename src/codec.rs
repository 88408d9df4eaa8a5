//! JSON wire format for result tables.
//!
//! A table is sent as `{"columns": [...], "data": [[...], ...]}`. Cells map
//! to JSON as follows:
//!
//! | Cell      | JSON                                   |
//! |-----------|----------------------------------------|
//! | `Null`    | `null`                                 |
//! | `Integer` | integer number                         |
//! | `Real`    | number (always written with a fraction)|
//! | `Text`    | string                                 |
//! | `Blob`    | string, standard base64 with padding   |
//!
//! Blobs use the same base64 alphabet and padding as Go's `encoding/json`
//! does for `[]byte`, so legacy callers read identical bytes. Since a
//! base64 string cannot be told apart from text, payloads holding blobs also
//! carry a `"blobs"` member listing their `[row, column]` coordinates. The
//! member is left out when there are no blobs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::db::{Cell, ResultTable, Row};
use crate::error::{RelayError, Result};

/// Wire representation of a [`ResultTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTable {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blobs: Vec<[usize; 2]>,
}

/// Converts a table to its wire representation.
pub fn encode(table: &ResultTable) -> Result<WireTable> {
    let mut blobs = Vec::new();
    let mut data = Vec::with_capacity(table.rows().len());

    for (r, row) in table.rows().iter().enumerate() {
        let mut values = Vec::with_capacity(row.len());
        for (c, cell) in row.iter().enumerate() {
            if matches!(cell, Cell::Blob(_)) {
                blobs.push([r, c]);
            }
            values.push(encode_cell(cell).map_err(|e| {
                RelayError::encoding(format!("row {r}, column {c}: {e}"))
            })?);
        }
        data.push(values);
    }

    Ok(WireTable {
        columns: table.columns().to_vec(),
        data,
        blobs,
    })
}

/// Serializes a table to a JSON string.
pub fn to_json(table: &ResultTable) -> Result<String> {
    let wire = encode(table)?;
    serde_json::to_string(&wire).map_err(|e| RelayError::encoding(e.to_string()))
}

fn encode_cell(cell: &Cell) -> std::result::Result<Value, String> {
    Ok(match cell {
        Cell::Null => Value::Null,
        Cell::Integer(i) => Value::Number((*i).into()),
        Cell::Real(r) => Number::from_f64(*r)
            .map(Value::Number)
            .ok_or_else(|| format!("{r} has no JSON representation"))?,
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Blob(b) => Value::String(STANDARD.encode(b)),
    })
}

/// Rebuilds a table from its wire representation.
///
/// Rejects rows whose length differs from the column count, blob
/// coordinates that do not point at a string, invalid base64, and values
/// that no cell variant can hold (booleans, arrays, objects).
pub fn decode(wire: &WireTable) -> Result<ResultTable> {
    let width = wire.columns.len();
    if let Some((r, row)) = wire
        .data
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != width)
    {
        return Err(RelayError::decoding(format!(
            "row {r} has {} values but {width} columns were declared",
            row.len()
        )));
    }

    let mut rows: Vec<Row> = wire
        .data
        .iter()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(c, value)| {
                    decode_value(value).map_err(|e| {
                        RelayError::decoding(format!("row {r}, column {c}: {e}"))
                    })
                })
                .collect()
        })
        .collect::<Result<_>>()?;

    for &[r, c] in &wire.blobs {
        let cell = rows
            .get_mut(r)
            .and_then(|row| row.get_mut(c))
            .ok_or_else(|| RelayError::decoding(format!("blob at [{r}, {c}] is out of range")))?;
        let Cell::Text(encoded) = &*cell else {
            return Err(RelayError::decoding(format!(
                "blob at [{r}, {c}] is not a string"
            )));
        };
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| RelayError::decoding(format!("blob at [{r}, {c}]: {e}")))?;
        *cell = Cell::Blob(bytes);
    }

    ResultTable::new(wire.columns.clone(), rows)
}

/// Parses a JSON string into a table.
pub fn from_json(json: &str) -> Result<ResultTable> {
    let wire: WireTable =
        serde_json::from_str(json).map_err(|e| RelayError::decoding(e.to_string()))?;
    decode(&wire)
}

fn decode_value(value: &Value) -> std::result::Result<Cell, String> {
    match value {
        Value::Null => Ok(Cell::Null),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(Cell::Real)
            .ok_or_else(|| format!("{n} is not a valid real")),
        Value::Number(n) => n
            .as_i64()
            .map(Cell::Integer)
            .ok_or_else(|| format!("{n} does not fit in a 64-bit integer")),
        Value::String(s) => Ok(Cell::Text(s.clone())),
        Value::Bool(_) => Err("booleans are not supported".to_string()),
        Value::Array(_) | Value::Object(_) => Err("nested values are not supported".to_string()),
    }
}
