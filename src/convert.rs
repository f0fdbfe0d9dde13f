//! CSV to Parquet conversion.
//!
//! The whole source file is scanned once to infer column types, then read again
//! as Arrow record batches and written through a Parquet `ArrowWriter`.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow_csv::{reader::Format, ReaderBuilder};
use parquet::{
    arrow::ArrowWriter,
    basic::Compression,
    file::properties::WriterProperties,
};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed csv {path}: {source}")]
    Csv {
        path: PathBuf,
        source: arrow::error::ArrowError,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parquet encoding failed for {path}: {source}")]
    Parquet {
        path: PathBuf,
        source: parquet::errors::ParquetError,
    },
    #[error("conversion task aborted: {0}")]
    Aborted(String),
}

/// Converts `source` into a Parquet file at `destination`, returning the number of
/// data rows (the header row is not counted).
pub fn csv_to_parquet(source: &Path, destination: &Path) -> Result<u64, ConversionError> {
    let open = |p: &Path| {
        File::open(p).map_err(|e| ConversionError::Read {
            path: p.to_path_buf(),
            source: e,
        })
    };
    let csv_err = |e| ConversionError::Csv {
        path: source.to_path_buf(),
        source: e,
    };
    let parquet_err = |e| ConversionError::Parquet {
        path: destination.to_path_buf(),
        source: e,
    };

    // short rows are padded with nulls rather than rejected
    let format = Format::default().with_header(true).with_truncated_rows(true);
    let (schema, _) = format.infer_schema(open(source)?, None).map_err(csv_err)?;
    let schema = Arc::new(schema);

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(open(source)?)
        .map_err(csv_err)?;

    let out = File::create(destination).map_err(|e| ConversionError::Write {
        path: destination.to_path_buf(),
        source: e,
    })?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(out, schema, Some(props)).map_err(parquet_err)?;

    let mut rows: u64 = 0;
    for batch in reader {
        let batch = batch.map_err(csv_err)?;
        rows += batch.num_rows() as u64;
        writer.write(&batch).map_err(parquet_err)?;
    }
    writer.close().map_err(parquet_err)?;

    debug!(source = %source.display(), destination = %destination.display(), rows, "csv converted");
    Ok(rows)
}

/// Runs [`csv_to_parquet`] on the blocking pool so request tasks stay responsive.
pub async fn convert(source: PathBuf, destination: PathBuf) -> Result<u64, ConversionError> {
    tokio::task::spawn_blocking(move || csv_to_parquet(&source, &destination))
        .await
        .map_err(|e| ConversionError::Aborted(e.to_string()))?
}

/// Parquet artifact name for an uploaded CSV: the trailing `.csv` becomes `.parquet`.
pub fn parquet_name(csv_name: &str) -> String {
    match csv_name.strip_suffix(".csv") {
        Some(stem) => format!("{stem}.parquet"),
        None => format!("{csv_name}.parquet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn converts_rows_and_writes_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("id,name,score\n");
        for i in 0..10 {
            body.push_str(&format!("{i},user{i},{}.5\n", i * 3));
        }
        let src = write_csv(dir.path(), "data.csv", &body);
        let dst = dir.path().join("data.parquet");

        let rows = csv_to_parquet(&src, &dst).expect("convert");
        assert_eq!(rows, 10);

        let reader = SerializedFileReader::new(File::open(&dst).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 10);
        assert_eq!(
            reader.metadata().file_metadata().schema_descr().num_columns(),
            3
        );
    }

    #[test]
    fn short_rows_are_padded_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_csv(dir.path(), "ragged.csv", "a,b,c\n1,2,3\n4,5\n6,7,8\n");
        let dst = dir.path().join("ragged.parquet");

        let rows = csv_to_parquet(&src, &dst).expect("convert");
        assert_eq!(rows, 3);

        let reader = SerializedFileReader::new(File::open(&dst).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 3);
    }

    #[test]
    fn missing_source_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = csv_to_parquet(&dir.path().join("nope.csv"), &dir.path().join("nope.parquet"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::Read { .. }));
    }

    #[test]
    fn unwritable_destination_fails() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_csv(dir.path(), "a.csv", "x\n1\n");
        let dst = dir.path().join("missing-dir").join("a.parquet");
        let err = csv_to_parquet(&src, &dst).unwrap_err();
        assert!(matches!(err, ConversionError::Write { .. }));
    }

    #[tokio::test]
    async fn async_convert_counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_csv(dir.path(), "b.csv", "k,v\na,1\nb,2\n");
        let rows = convert(src, dir.path().join("b.parquet")).await.unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn parquet_name_replaces_suffix_only() {
        assert_eq!(parquet_name("data.csv"), "data.parquet");
        assert_eq!(parquet_name("my.csv.backup.csv"), "my.csv.backup.parquet");
        assert_eq!(parquet_name("noext"), "noext.parquet");
    }
}
