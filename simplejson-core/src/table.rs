//! Table responses
//!
//! A table is a list of typed columns of equal length. On the wire it is sent
//! column-headers-first, followed by row-major cells:
//!
//! ```json
//! {"type":"table",
//!  "columns":[{"text":"Time","type":"time"},{"text":"Value","type":"number"}],
//!  "rows":[["2016-10-31T06:33:44.866Z",1.0]]}
//! ```
//!
//! Time cells use the RFC3339 range time format, not the millisecond epoch
//! used by timeseries datapoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{SimpleJsonError, SimpleJsonResult};
use crate::time::{self, Timestamp};

/// Marker carried in the `type` field of every table response
pub const TABLE_RESPONSE_TYPE: &str = "table";

/// Type tag of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Number,
    String,
    Time,
}

/// Values of a single column, one variant per column type
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Number(Vec<f64>),
    String(Vec<String>),
    Time(Vec<Timestamp>),
}

/// A labelled table column as produced by a table datasource
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub text: String,
    pub data: ColumnData,
}

/// Column header on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumnHeader {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

/// A single encoded cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableCell {
    Number(f64),
    String(String),
    Time(#[serde(with = "crate::time::range_time")] Timestamp),
}

/// Wire form of a table query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub columns: Vec<TableColumnHeader>,
    pub rows: Vec<Vec<TableCell>>,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Number => "number",
            ColumnKind::String => "string",
            ColumnKind::Time => "time",
        }
    }
}

impl FromStr for ColumnKind {
    type Err = SimpleJsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "number" => Ok(ColumnKind::Number),
            "string" => Ok(ColumnKind::String),
            "time" => Ok(ColumnKind::Time),
            other => Err(SimpleJsonError::InvalidColumnType(other.to_string())),
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Number(_) => ColumnKind::Number,
            ColumnData::String(_) => ColumnKind::String,
            ColumnData::Time(_) => ColumnKind::Time,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Number(values) => values.len(),
            ColumnData::String(values) => values.len(),
            ColumnData::Time(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, row: usize) -> Option<TableCell> {
        match self {
            ColumnData::Number(values) => values.get(row).map(|v| TableCell::Number(*v)),
            ColumnData::String(values) => values.get(row).map(|v| TableCell::String(v.clone())),
            ColumnData::Time(values) => values.get(row).map(|v| TableCell::Time(*v)),
        }
    }

    fn empty(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Number => ColumnData::Number(Vec::new()),
            ColumnKind::String => ColumnData::String(Vec::new()),
            ColumnKind::Time => ColumnData::Time(Vec::new()),
        }
    }
}

impl TableColumn {
    pub fn number<S: Into<String>>(text: S, values: Vec<f64>) -> Self {
        Self {
            text: text.into(),
            data: ColumnData::Number(values),
        }
    }

    pub fn string<S: Into<String>>(text: S, values: Vec<String>) -> Self {
        Self {
            text: text.into(),
            data: ColumnData::String(values),
        }
    }

    pub fn time<S: Into<String>>(text: S, values: Vec<Timestamp>) -> Self {
        Self {
            text: text.into(),
            data: ColumnData::Time(values),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }
}

/// Encode a set of columns into a table response.
///
/// The row count is taken from the first column; any column of a different
/// length fails the whole table.
pub fn encode_table(columns: &[TableColumn]) -> SimpleJsonResult<TableResponse> {
    let row_count = columns.first().map(|c| c.data.len()).unwrap_or(0);

    for column in columns {
        if column.data.len() != row_count {
            return Err(SimpleJsonError::ColumnLengthMismatch {
                column: column.text.clone(),
                expected: row_count,
                actual: column.data.len(),
            });
        }
    }

    let headers = columns
        .iter()
        .map(|column| TableColumnHeader {
            text: column.text.clone(),
            kind: column.kind(),
        })
        .collect();

    let rows = (0..row_count)
        .map(|row| {
            columns
                .iter()
                .filter_map(|column| column.data.cell(row))
                .collect()
        })
        .collect();

    Ok(TableResponse {
        kind: TABLE_RESPONSE_TYPE,
        columns: headers,
        rows,
    })
}

#[derive(Deserialize)]
struct RawTable {
    #[serde(rename = "type", default)]
    kind: String,
    columns: Vec<RawColumnHeader>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct RawColumnHeader {
    text: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Decode a wire table back into typed columns.
pub fn decode_table(value: serde_json::Value) -> SimpleJsonResult<Vec<TableColumn>> {
    let raw: RawTable = serde_json::from_value(value)?;
    if raw.kind != TABLE_RESPONSE_TYPE {
        return Err(SimpleJsonError::decode(format!(
            "expected a table response, got type {:?}",
            raw.kind
        )));
    }

    let mut columns = raw
        .columns
        .into_iter()
        .map(|header| {
            let kind = header.kind.parse::<ColumnKind>()?;
            Ok(TableColumn {
                text: header.text,
                data: ColumnData::empty(kind),
            })
        })
        .collect::<SimpleJsonResult<Vec<_>>>()?;

    for (row_index, row) in raw.rows.into_iter().enumerate() {
        if row.len() != columns.len() {
            return Err(SimpleJsonError::decode(format!(
                "row {} has {} cells, expected {}",
                row_index,
                row.len(),
                columns.len()
            )));
        }
        for (column, cell) in columns.iter_mut().zip(row) {
            push_cell(column, cell, row_index)?;
        }
    }

    Ok(columns)
}

fn push_cell(column: &mut TableColumn, cell: serde_json::Value, row: usize) -> SimpleJsonResult<()> {
    let kind = column.kind();
    let text = column.text.as_str();
    let mismatch = || {
        SimpleJsonError::decode(format!(
            "row {} column {:?}: expected a {} cell",
            row, text, kind
        ))
    };

    match &mut column.data {
        ColumnData::Number(values) => values.push(cell.as_f64().ok_or_else(mismatch)?),
        ColumnData::String(values) => {
            values.push(cell.as_str().ok_or_else(mismatch)?.to_string())
        }
        ColumnData::Time(values) => {
            let raw = cell.as_str().ok_or_else(mismatch)?;
            values.push(time::decode_range_time(raw)?)
        }
    }
    Ok(())
}
