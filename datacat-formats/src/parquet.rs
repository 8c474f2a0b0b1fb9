use ::parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;

use crate::{collect_batches, error::FormatError, Result};

pub fn decode(bytes: &Bytes) -> Result<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    collect_batches(schema, reader)
}

/// Snappy compressed parquet, schema taken from the first batch.
pub fn encode(batches: &[RecordBatch]) -> Result<Bytes> {
    let schema = batches.first().ok_or(FormatError::NoData)?.schema();
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props))?;
    for batch in batches {
        writer.write(batch)?;
    }
    Ok(Bytes::from(writer.into_inner()?))
}
