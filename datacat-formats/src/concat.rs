//! Relaxed ("diagonal") concatenation of record batches whose schemas drifted
//! between partitions: columns are unioned by name, types are widened to a
//! common super type and absent columns are filled with nulls.

use std::sync::Arc;

use arrow::{
    array::{new_null_array, ArrayRef},
    compute::{cast, concat_batches},
    datatypes::{DataType, Field, Fields, Schema, SchemaRef, TimeUnit},
    record_batch::{RecordBatch, RecordBatchOptions},
};

use crate::{error::FormatError, Result};

pub fn diagonal_concat(batches: &[RecordBatch]) -> Result<RecordBatch> {
    if batches.is_empty() {
        return Err(FormatError::NoData);
    }
    let schemas: Vec<SchemaRef> = batches.iter().map(|b| b.schema()).collect();
    let schema = Arc::new(super_type_schema(&schemas)?);

    let aligned = batches
        .iter()
        .map(|batch| align_to_schema(batch, &schema))
        .collect::<Result<Vec<_>>>()?;

    Ok(concat_batches(&schema, &aligned)?)
}

/// Project `batch` onto `schema`, casting existing columns and null filling missing ones.
pub fn align_to_schema(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let num_rows = batch.num_rows();
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch.column_by_name(field.name()) {
            Some(column) if column.data_type() == field.data_type() => Ok(column.clone()),
            Some(column) => Ok(cast(column, field.data_type())?),
            None => Ok(new_null_array(field.data_type(), num_rows)),
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    Ok(RecordBatch::try_new_with_options(
        schema.clone(),
        columns,
        &options,
    )?)
}

/// Union of all fields in first-seen order, every field nullable.
pub fn super_type_schema(schemas: &[SchemaRef]) -> Result<Schema> {
    if schemas.is_empty() {
        return Err(FormatError::NoData);
    }

    let mut fields: indexmap::IndexMap<String, DataType> = indexmap::IndexMap::new();
    for schema in schemas {
        for field in schema.fields().iter() {
            let dtype = field.data_type();
            match fields.get_mut(field.name()) {
                Some(existing) => {
                    let merged = super_type(existing, dtype).ok_or_else(|| {
                        FormatError::NoCommonSuperType {
                            left: existing.clone(),
                            right: dtype.clone(),
                            column_name: field.name().to_string(),
                        }
                    })?;
                    *existing = merged;
                }
                None => {
                    fields.insert(field.name().to_string(), dtype.clone());
                }
            }
        }
    }

    Ok(Schema::new(Fields::from(
        fields
            .into_iter()
            .map(|(name, dtype)| Field::new(name, dtype, true))
            .collect::<Vec<_>>(),
    )))
}

/// Smallest common type two columns can both be cast to, following the
/// Polars/Numpy promotion conventions for mixed signed and unsigned integers.
pub fn super_type(left: &DataType, right: &DataType) -> Option<DataType> {
    use DataType::*;

    if left == right {
        return Some(left.clone());
    }

    match (left, right) {
        (Null, other) | (other, Null) => Some(other.clone()),
        (LargeUtf8, _) | (_, LargeUtf8) => Some(LargeUtf8),
        (Utf8, _) | (_, Utf8) => Some(Utf8),
        (Timestamp(_, _), Timestamp(_, _)) => Some(Timestamp(TimeUnit::Microsecond, None)),
        (Date32, Date64) | (Date64, Date32) => Some(Date64),
        (Date32 | Date64, Timestamp(unit, tz)) | (Timestamp(unit, tz), Date32 | Date64) => {
            Some(Timestamp(*unit, tz.clone()))
        }
        (l, r) if is_numeric(l) && is_numeric(r) => Some(numeric_super_type(l, r)),
        _ => None,
    }
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Boolean) || integer_info(dtype).is_some() || float_bits(dtype).is_some()
}

fn integer_info(dtype: &DataType) -> Option<(bool, u8)> {
    match dtype {
        DataType::Int8 => Some((true, 8)),
        DataType::Int16 => Some((true, 16)),
        DataType::Int32 => Some((true, 32)),
        DataType::Int64 => Some((true, 64)),
        DataType::UInt8 => Some((false, 8)),
        DataType::UInt16 => Some((false, 16)),
        DataType::UInt32 => Some((false, 32)),
        DataType::UInt64 => Some((false, 64)),
        _ => None,
    }
}

fn float_bits(dtype: &DataType) -> Option<u8> {
    match dtype {
        DataType::Float16 => Some(16),
        DataType::Float32 => Some(32),
        DataType::Float64 => Some(64),
        _ => None,
    }
}

fn integer_type(signed: bool, bits: u8) -> DataType {
    match (signed, bits) {
        (true, 8) => DataType::Int8,
        (true, 16) => DataType::Int16,
        (true, 32) => DataType::Int32,
        (true, _) => DataType::Int64,
        (false, 8) => DataType::UInt8,
        (false, 16) => DataType::UInt16,
        (false, 32) => DataType::UInt32,
        (false, _) => DataType::UInt64,
    }
}

fn numeric_super_type(left: &DataType, right: &DataType) -> DataType {
    // Booleans promote to whatever they are combined with.
    if matches!(left, DataType::Boolean) {
        return right.clone();
    }
    if matches!(right, DataType::Boolean) {
        return left.clone();
    }

    match (float_bits(left), float_bits(right)) {
        (Some(_), Some(_)) => DataType::Float64,
        (Some(bits), None) | (None, Some(bits)) => {
            let int_bits = integer_info(left)
                .or_else(|| integer_info(right))
                .map(|(_, b)| b)
                .unwrap_or(64);
            if bits == 32 && int_bits <= 16 {
                DataType::Float32
            } else {
                DataType::Float64
            }
        }
        (None, None) => {
            let (Some((l_signed, l_bits)), Some((r_signed, r_bits))) =
                (integer_info(left), integer_info(right))
            else {
                return DataType::Float64;
            };
            if l_signed == r_signed {
                return integer_type(l_signed, l_bits.max(r_bits));
            }
            let (signed_bits, unsigned_bits) = if l_signed {
                (l_bits, r_bits)
            } else {
                (r_bits, l_bits)
            };
            if signed_bits > unsigned_bits {
                integer_type(true, signed_bits)
            } else if unsigned_bits < 64 {
                integer_type(true, unsigned_bits * 2)
            } else {
                DataType::Float64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Array, Float64Array, Int32Array, Int64Array, StringArray};

    use super::*;

    fn batch(fields: Vec<(&str, ArrayRef)>) -> RecordBatch {
        RecordBatch::try_from_iter(fields).unwrap()
    }

    #[test]
    fn integer_promotion_follows_numpy() {
        assert_eq!(super_type(&DataType::Int8, &DataType::UInt8), Some(DataType::Int16));
        assert_eq!(super_type(&DataType::Int64, &DataType::UInt32), Some(DataType::Int64));
        assert_eq!(super_type(&DataType::Int32, &DataType::UInt64), Some(DataType::Float64));
        assert_eq!(super_type(&DataType::UInt8, &DataType::UInt32), Some(DataType::UInt32));
        assert_eq!(super_type(&DataType::Int16, &DataType::Float32), Some(DataType::Float32));
        assert_eq!(super_type(&DataType::Int32, &DataType::Float32), Some(DataType::Float64));
        assert_eq!(super_type(&DataType::Boolean, &DataType::Int16), Some(DataType::Int16));
    }

    #[test]
    fn strings_absorb_everything() {
        assert_eq!(super_type(&DataType::Int64, &DataType::Utf8), Some(DataType::Utf8));
        assert_eq!(super_type(&DataType::Null, &DataType::Float64), Some(DataType::Float64));
        assert_eq!(super_type(&DataType::Binary, &DataType::Int64), None);
    }

    #[test]
    fn diagonal_concat_fills_missing_columns_with_nulls() {
        let first = batch(vec![
            ("state", Arc::new(StringArray::from(vec!["AK", "AL"])) as ArrayRef),
            ("count", Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef),
        ]);
        let second = batch(vec![
            ("count", Arc::new(Int64Array::from(vec![3])) as ArrayRef),
            ("rate", Arc::new(Float64Array::from(vec![0.5])) as ArrayRef),
        ]);

        let combined = diagonal_concat(&[first, second]).unwrap();
        assert_eq!(combined.num_rows(), 3);
        let names: Vec<_> = combined.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["state", "count", "rate"]);

        let count = combined.column(1).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(count.values().to_vec(), vec![1, 2, 3]);

        let state = combined.column(0);
        assert!(state.is_null(2));
        let rate = combined.column(2);
        assert_eq!(rate.null_count(), 2);
    }

    #[test]
    fn conflicting_types_are_reported_with_the_column() {
        let first = batch(vec![(
            "blob",
            Arc::new(arrow::array::BinaryArray::from(vec![b"x".as_ref()])) as ArrayRef,
        )]);
        let second = batch(vec![("blob", Arc::new(Int32Array::from(vec![1])) as ArrayRef)]);
        let err = diagonal_concat(&[first, second]).unwrap_err();
        assert!(matches!(err, FormatError::NoCommonSuperType { column_name, .. } if column_name == "blob"));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(diagonal_concat(&[]), Err(FormatError::NoData)));
    }
}
