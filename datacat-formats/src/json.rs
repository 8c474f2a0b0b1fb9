use std::{io::Cursor, sync::Arc};

use arrow::{
    error::ArrowError,
    json::{
        reader::{infer_json_schema, infer_json_schema_from_iterator},
        LineDelimitedWriter, ReaderBuilder,
    },
    record_batch::RecordBatch,
};
use bytes::Bytes;
use serde_json::Value;

use crate::{collect_batches, error::FormatError, Result};

/// Decode newline delimited JSON, one record per line.
pub fn decode_lines(bytes: &Bytes) -> Result<RecordBatch> {
    let (schema, _) = infer_json_schema(Cursor::new(bytes.as_ref()), None)?;
    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone()).build(Cursor::new(bytes.as_ref()))?;
    collect_batches(schema, reader)
}

/// Decode a JSON document holding an array of records, or a single record.
pub fn decode_document(bytes: &Bytes) -> Result<RecordBatch> {
    let rows = match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(rows) => rows,
        record @ Value::Object(_) => vec![record],
        other => {
            let kind = match other {
                Value::Null => "null",
                Value::Bool(_) => "a boolean",
                Value::Number(_) => "a number",
                _ => "a string",
            };
            return Err(FormatError::InvalidJsonDocument(kind.to_string()));
        }
    };

    let schema = Arc::new(infer_json_schema_from_iterator(
        rows.iter().map(Ok::<_, ArrowError>),
    )?);
    let mut decoder = ReaderBuilder::new(schema.clone())
        .with_batch_size(rows.len().max(1))
        .build_decoder()?;
    decoder.serialize(&rows)?;

    Ok(decoder
        .flush()?
        .unwrap_or_else(|| RecordBatch::new_empty(schema)))
}

/// Line delimited JSON is the only JSON flavour written.
pub fn encode_lines(batches: &[RecordBatch]) -> Result<Bytes> {
    let mut writer = LineDelimitedWriter::new(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs)?;
    writer.finish()?;
    Ok(Bytes::from(writer.into_inner()))
}
