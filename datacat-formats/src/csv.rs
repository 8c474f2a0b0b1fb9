use std::{io::Cursor, sync::Arc};

use arrow::{
    csv::{reader::Format, ReaderBuilder, WriterBuilder},
    record_batch::RecordBatch,
};
use bytes::Bytes;

use crate::{collect_batches, Result};

/// Decode a CSV payload with a header row, inferring column types from every record.
pub fn decode(bytes: &Bytes) -> Result<RecordBatch> {
    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(Cursor::new(bytes.as_ref()), None)?;
    let schema = Arc::new(schema);

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(Cursor::new(bytes.as_ref()))?;

    collect_batches(schema, reader)
}

pub fn encode(batches: &[RecordBatch]) -> Result<Bytes> {
    let mut writer = WriterBuilder::new().with_header(true).build(Vec::new());
    for batch in batches {
        writer.write(batch)?;
    }
    Ok(Bytes::from(writer.into_inner()))
}
