//! Incremental decoder for the annotated CSV dialect returned by `/api/v2/query`.
//!
//! A response is a sequence of tables separated by blank lines. Each table
//! starts with `#datatype` / `#group` / `#default` annotation rows, then a
//! header row, then data rows. The first column of every row is the
//! annotation column and carries no data. A table whose header is
//! `,error,reference` reports a failure that happened after the response
//! status was already sent.

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Display;
use std::pin::Pin;

use chrono::DateTime;
use futures::stream::{self, Stream, StreamExt};

use super::flux_record::{FluxRecord, FluxValue};
use super::query_executor_trait::RecordStream;
use super::store_error::StoreError;

type Decoded = Result<FluxRecord, StoreError>;

#[derive(Debug, Default)]
struct TableSchema {
    datatypes: Vec<String>,
    defaults: Vec<String>,
    columns: Option<Vec<String>>,
    error_table: bool,
}

/// Line splitter plus per-table schema tracking.
#[derive(Debug, Default)]
pub struct FluxCsvDecoder {
    buf: Vec<u8>,
    scanned: usize,
    in_quotes: bool,
    table: TableSchema,
}

impl FluxCsvDecoder {
    /// Buffers `chunk` and decodes every complete line it closes.
    pub fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<Decoded>) {
        self.buf.extend_from_slice(chunk);

        // Newlines inside quoted cells do not end a row.
        let mut lines = Vec::new();
        let mut start = 0;
        for i in self.scanned..self.buf.len() {
            match self.buf[i] {
                b'"' => self.in_quotes = !self.in_quotes,
                b'\n' if !self.in_quotes => {
                    lines.push((start, i));
                    start = i + 1;
                }
                _ => {}
            }
        }

        for (from, to) in lines {
            if let Some(item) = Self::decode_line(&mut self.table, &self.buf[from..to]) {
                let failed = item.is_err();
                out.push_back(item);
                if failed {
                    break;
                }
            }
        }

        self.buf.drain(..start);
        self.scanned = self.buf.len();
    }

    /// Decodes a trailing line that was not newline-terminated.
    pub fn finish(&mut self, out: &mut VecDeque<Decoded>) {
        if self.buf.is_empty() {
            return;
        }
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        self.in_quotes = false;
        if let Some(item) = Self::decode_line(&mut self.table, &rest) {
            out.push_back(item);
        }
    }

    fn decode_line(table: &mut TableSchema, raw: &[u8]) -> Option<Decoded> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            *table = TableSchema::default();
            return None;
        }

        let fields = match split_fields(raw) {
            Ok(fields) => fields,
            Err(err) => return Some(Err(err)),
        };

        if fields.first().is_some_and(|f| f.starts_with('#')) {
            // Annotations after data mean a new table without a blank separator.
            if table.columns.is_some() {
                *table = TableSchema::default();
            }
            if fields[0] == "#datatype" {
                table.datatypes = fields;
            } else if fields[0] == "#default" {
                table.defaults = fields;
            }
            return None;
        }

        if table.columns.is_none() {
            table.error_table = fields.get(1).map(String::as_str) == Some("error");
            table.columns = Some(fields);
            return None;
        }

        if table.error_table {
            let message = fields
                .get(1)
                .filter(|m| !m.is_empty())
                .cloned()
                .unwrap_or_else(|| "unknown error".to_string());
            return Some(Err(StoreError::Execution(message)));
        }

        Some(build_record(table, &fields))
    }
}

fn split_fields(raw: &[u8]) -> Result<Vec<String>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw);
    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Ok(record.iter().map(str::to_string).collect()),
        Ok(false) => Ok(Vec::new()),
        Err(err) => Err(StoreError::Decode(err.to_string())),
    }
}

fn build_record(table: &TableSchema, fields: &[String]) -> Decoded {
    let columns = table.columns.as_deref().unwrap_or_default();
    let mut values = BTreeMap::new();

    for (i, name) in columns.iter().enumerate() {
        if name.is_empty() {
            continue;
        }
        let mut cell = fields.get(i).map(String::as_str).unwrap_or("");
        if cell.is_empty() {
            cell = table.defaults.get(i).map(String::as_str).unwrap_or("");
        }
        let datatype = table.datatypes.get(i).map(String::as_str).unwrap_or("string");
        let value = parse_cell(datatype, cell)
            .map_err(|err| StoreError::Decode(format!("column {name}: {err}")))?;
        values.insert(name.clone(), value);
    }

    Ok(FluxRecord::new(values))
}

fn parse_cell(datatype: &str, cell: &str) -> Result<FluxValue, String> {
    if cell.is_empty() {
        return Ok(FluxValue::Null);
    }

    let value = match datatype {
        "long" => FluxValue::Long(cell.parse().map_err(|e| format!("{e} in {cell:?}"))?),
        "unsignedLong" => {
            FluxValue::UnsignedLong(cell.parse().map_err(|e| format!("{e} in {cell:?}"))?)
        }
        "double" => FluxValue::Double(cell.parse().map_err(|e| format!("{e} in {cell:?}"))?),
        "boolean" => match cell {
            "true" => FluxValue::Bool(true),
            "false" => FluxValue::Bool(false),
            other => return Err(format!("invalid boolean {other:?}")),
        },
        "duration" => FluxValue::Duration(cell.to_string()),
        "base64Binary" => FluxValue::Base64(cell.to_string()),
        t if t.starts_with("dateTime") => FluxValue::Time(
            DateTime::parse_from_rfc3339(cell).map_err(|e| format!("{e} in {cell:?}"))?,
        ),
        _ => FluxValue::String(cell.to_string()),
    };

    Ok(value)
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: FluxCsvDecoder,
    pending: VecDeque<Decoded>,
    done: bool,
}

/// Turns a response body into a stream of records.
///
/// The first error (transport, decode or in-band) is yielded once and ends
/// the stream.
pub fn decode_flux_csv<S, B, E>(body: S) -> RecordStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: FluxCsvDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                if item.is_err() {
                    st.pending.clear();
                    st.done = true;
                }
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => st.decoder.feed(chunk.as_ref(), &mut st.pending),
                Some(Err(err)) => st
                    .pending
                    .push_back(Err(StoreError::Stream(err.to_string()))),
                None => {
                    st.decoder.finish(&mut st.pending);
                    st.done = true;
                }
            }
        }
    })
    .boxed()
}
