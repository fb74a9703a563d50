//! Forward-only row sequences over one data source.
//!
//! A stream is opened eagerly: file handles and HTTP bodies are acquired in
//! the constructor and released when the stream is exhausted or dropped. Rows
//! are pulled through [`Iterator::next`]; a row that fails to decode or to
//! match the table schema is reported as [`StreamError::Row`] and iteration
//! can continue with the next row.
//!
//! [`DataStream::rewind`] succeeds exactly once, before the first row is
//! read. There is no seeking back.

use crate::{DataSource, StreamError};
use datapackage_table::{write_csv, CsvSource, NativeSource, RowSource, Table, TableSchema};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamVariant {
    /// Raw lines of a file or URL, or the elements of inline data.
    Default,
    /// Typed records of a CSV file or URL.
    Tabular,
    /// Typed records of inline data.
    TabularInline,
}

enum Rows {
    Lines(BufReader<Box<dyn Read>>),
    Values(std::vec::IntoIter<Value>),
    Table(Table<Box<dyn RowSource>>),
}

impl Rows {
    fn empty() -> Self {
        Self::Values(Vec::new().into_iter())
    }

    /// Next row, or the reason it could not be produced. The flag is set
    /// when the underlying reader cannot make progress after the error.
    fn pull(&mut self) -> Option<Result<Value, (String, bool)>> {
        match self {
            Self::Lines(reader) => {
                // raw bytes; invalid UTF-8 is replaced rather than rejected
                let mut line = Vec::new();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => None,
                    Ok(_) => Some(Ok(Value::String(
                        String::from_utf8_lossy(&line).into_owned(),
                    ))),
                    Err(e) => Some(Err((e.to_string(), true))),
                }
            }
            Self::Values(values) => values.next().map(Ok),
            Self::Table(table) => table.next().map(|row| {
                row.map(Value::Object)
                    .map_err(|e| (e.to_string(), false))
            }),
        }
    }
}

pub struct DataStream {
    variant: StreamVariant,
    source: DataSource,
    schema: Option<TableSchema>,
    rows: Rows,
    line: usize,
    rewound: bool,
    finished: bool,
}

impl DataStream {
    /// Open a default stream. File and URL sources yield one string per line
    /// (terminator included); inline data yields each array element, or the
    /// value itself when it is not an array.
    pub fn open_default(source: DataSource) -> Result<Self, StreamError> {
        let rows = match &source {
            DataSource::Inline(Value::Array(items)) => Rows::Values(items.clone().into_iter()),
            DataSource::Inline(value) => Rows::Values(vec![value.clone()].into_iter()),
            other => Rows::Lines(BufReader::new(other.open()?)),
        };
        debug!("opened default stream over {source}");
        Ok(Self::new(StreamVariant::Default, source, None, rows))
    }

    /// Open a tabular stream under the resource's `schema`. `dialect` may set
    /// a single-character `delimiter` for CSV sources. Header problems and
    /// malformed schemas are reported as open failures.
    pub fn open_tabular(
        source: DataSource,
        schema: &Value,
        dialect: Option<&Value>,
    ) -> Result<Self, StreamError> {
        let open_err = |reason: String| StreamError::Open {
            data_source: source.to_string(),
            reason,
        };
        let table_schema = TableSchema::from_value(schema).map_err(|e| open_err(e.to_string()))?;

        let (variant, row_source): (StreamVariant, Box<dyn RowSource>) = match &source {
            DataSource::Inline(data) => {
                let rows = inline_records(data).map_err(open_err)?;
                (
                    StreamVariant::TabularInline,
                    Box::new(NativeSource::new(rows)) as Box<dyn RowSource>,
                )
            }
            other => {
                let delimiter = dialect
                    .and_then(|d| d.get("delimiter"))
                    .and_then(Value::as_str)
                    .filter(|d| d.len() == 1)
                    .map_or(b',', |d| d.as_bytes()[0]);
                let reader = other.open()?;
                (
                    StreamVariant::Tabular,
                    Box::new(CsvSource::with_delimiter(reader, delimiter)) as Box<dyn RowSource>,
                )
            }
        };

        let table = Table::new(row_source, table_schema.clone())
            .map_err(|e| open_err(e.to_string()))?;
        debug!("opened {variant:?} stream over {source}");
        Ok(Self::new(variant, source, Some(table_schema), Rows::Table(table)))
    }

    fn new(
        variant: StreamVariant,
        source: DataSource,
        schema: Option<TableSchema>,
        rows: Rows,
    ) -> Self {
        Self {
            variant,
            source,
            schema,
            rows,
            line: 0,
            rewound: false,
            finished: false,
        }
    }

    pub fn variant(&self) -> StreamVariant {
        self.variant
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// 1-based number of the last row handed out; 0 before the first.
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Position the stream at its start. Allowed once, before any row has
    /// been read.
    pub fn rewind(&mut self) -> Result<(), StreamError> {
        if self.rewound || self.line > 0 {
            return Err(StreamError::RewindUnsupported);
        }
        self.rewound = true;
        Ok(())
    }

    /// Persist the source to `target`. File and URL sources are copied byte
    /// for byte from a fresh handle; inline tabular data is written as CSV
    /// and other inline data as one JSON value per line. The iteration state
    /// of `self` is not touched.
    pub fn save(&self, target: &Path) -> Result<(), StreamError> {
        debug!("saving {} to {}", self.source, target.display());
        let mut out = File::create(target)?;
        match (&self.source, &self.schema) {
            (DataSource::Inline(data), Some(schema)) => {
                let rows = inline_records(data).map_err(|reason| StreamError::Open {
                    data_source: self.source.to_string(),
                    reason,
                })?;
                let table = Table::new(NativeSource::new(rows), schema.clone())?;
                write_csv(schema, table, &mut out)?;
            }
            (DataSource::Inline(data), None) => {
                let items = match data {
                    Value::Array(items) => items.as_slice(),
                    other => std::slice::from_ref(other),
                };
                for item in items {
                    writeln!(out, "{item}")?;
                }
            }
            (other, _) => {
                let mut reader = other.open()?;
                io::copy(&mut reader, &mut out)?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

impl Iterator for DataStream {
    type Item = Result<Value, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let Some(pulled) = self.rows.pull() else {
            self.finished = true;
            // release the file or connection as soon as the data ends
            self.rows = Rows::empty();
            return None;
        };
        self.line += 1;
        match pulled {
            Ok(row) => Some(Ok(row)),
            Err((reason, fatal)) => {
                if fatal {
                    self.finished = true;
                    self.rows = Rows::empty();
                }
                Some(Err(StreamError::Row {
                    line: self.line,
                    reason,
                }))
            }
        }
    }
}

impl fmt::Debug for DataStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStream")
            .field("variant", &self.variant)
            .field("source", &self.source.to_string())
            .field("line", &self.line)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Normalize inline tabular data into records. When the first element is an
/// array it is taken as the header row and the remaining array rows are
/// zipped with it; otherwise elements are passed through as records.
fn inline_records(data: &Value) -> Result<Vec<Value>, String> {
    let Value::Array(items) = data else {
        return Err("inline tabular data must be an array".to_owned());
    };
    let Some(Value::Array(header)) = items.first() else {
        return Ok(items.clone());
    };
    let names: Vec<String> = header
        .iter()
        .map(|h| h.as_str().map_or_else(|| h.to_string(), str::to_owned))
        .collect();
    Ok(items[1..]
        .iter()
        .map(|row| match row {
            Value::Array(cells) => Value::Object(
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), cells.get(i).cloned().unwrap_or(Value::Null)))
                    .collect(),
            ),
            other => other.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id_name_schema() -> Value {
        json!({"fields": [
            {"name": "id", "type": "integer"},
            {"name": "name", "type": "string"}
        ]})
    }

    fn collect(stream: DataStream) -> Vec<Value> {
        stream.map(Result::unwrap).collect()
    }

    #[test]
    fn default_file_lines_keep_terminators() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        std::fs::write(&path, "a\nb\nc").unwrap();
        let stream = DataStream::open_default(DataSource::Local(path)).unwrap();
        assert_eq!(collect(stream), vec![json!("a\n"), json!("b\n"), json!("c")]);
    }

    #[test]
    fn trailing_newline_gives_no_empty_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        std::fs::write(&path, "a\n").unwrap();
        let stream = DataStream::open_default(DataSource::Local(path)).unwrap();
        assert_eq!(collect(stream), vec![json!("a\n")]);
    }

    #[test]
    fn default_inline_elements() {
        let s = DataStream::open_default(DataSource::Inline(json!([1, "two", {"x": 3}]))).unwrap();
        assert_eq!(collect(s), vec![json!(1), json!("two"), json!({"x": 3})]);
        let s = DataStream::open_default(DataSource::Inline(json!("scalar"))).unwrap();
        assert_eq!(collect(s), vec![json!("scalar")]);
    }

    #[test]
    fn rewind_once_then_error() {
        let mut s = DataStream::open_default(DataSource::Inline(json!([1, 2]))).unwrap();
        s.rewind().unwrap();
        assert!(matches!(s.rewind(), Err(StreamError::RewindUnsupported)));

        let mut s = DataStream::open_default(DataSource::Inline(json!([1, 2]))).unwrap();
        s.next();
        assert!(matches!(s.rewind(), Err(StreamError::RewindUnsupported)));
    }

    #[test]
    fn tabular_inline_with_header_row() {
        let data = json!([["id", "name"], [1, "one"], [2, "two"]]);
        let s = DataStream::open_tabular(DataSource::Inline(data), &id_name_schema(), None).unwrap();
        assert_eq!(s.variant(), StreamVariant::TabularInline);
        assert_eq!(
            collect(s),
            vec![json!({"id": 1, "name": "one"}), json!({"id": 2, "name": "two"})]
        );
    }

    #[test]
    fn tabular_inline_records() {
        let data = json!([{"name": "one", "id": 1}]);
        let s = DataStream::open_tabular(DataSource::Inline(data), &id_name_schema(), None).unwrap();
        assert_eq!(collect(s), vec![json!({"id": 1, "name": "one"})]);
    }

    #[test]
    fn tabular_inline_must_be_array() {
        let err = DataStream::open_tabular(
            DataSource::Inline(json!({"id": 1})),
            &id_name_schema(),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("inline tabular data must be an array"));
    }

    #[test]
    fn tabular_row_error_carries_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "id,name\n1,one\nx,two\n3,three\n").unwrap();
        let mut s = DataStream::open_tabular(DataSource::Local(path), &id_name_schema(), None).unwrap();
        assert!(s.next().unwrap().is_ok());
        match s.next().unwrap() {
            Err(StreamError::Row { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("'x'"), "{reason}");
            }
            other => panic!("expected row error, got {other:?}"),
        }
        assert_eq!(s.next().unwrap().unwrap()["id"], json!(3));
        assert!(s.next().is_none());
        assert_eq!(s.line_number(), 3);
    }

    #[test]
    fn tabular_header_mismatch_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "id\n1\n").unwrap();
        let err = DataStream::open_tabular(DataSource::Local(path), &id_name_schema(), None)
            .unwrap_err();
        assert!(matches!(err, StreamError::Open { .. }), "{err}");
    }

    #[test]
    fn dialect_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "id;name\n1;one\n").unwrap();
        let s = DataStream::open_tabular(
            DataSource::Local(path),
            &id_name_schema(),
            Some(&json!({"delimiter": ";"})),
        )
        .unwrap();
        assert_eq!(collect(s), vec![json!({"id": 1, "name": "one"})]);
    }

    #[test]
    fn save_copies_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.txt");
        std::fs::write(&src, "x\ny\n").unwrap();
        let mut s = DataStream::open_default(DataSource::Local(src)).unwrap();
        s.next();
        let out = dir.path().join("out.txt");
        s.save(&out).unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "x\ny\n");
    }

    #[test]
    fn save_inline_tabular_as_csv() {
        let dir = tempfile::tempdir().unwrap();
        let data = json!([["id", "name"], [1, "one"], [2, "two"]]);
        let s = DataStream::open_tabular(DataSource::Inline(data), &id_name_schema(), None).unwrap();
        let out = dir.path().join("out.csv");
        s.save(&out).unwrap();
        assert_eq!(
            std::fs::read_to_string(out).unwrap(),
            "id,name\n1,one\n2,two\n"
        );
    }

    #[test]
    fn save_inline_default_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let s = DataStream::open_default(DataSource::Inline(json!(["a", 1]))).unwrap();
        let out = dir.path().join("out.json");
        s.save(&out).unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "\"a\"\n1\n");
    }
}
