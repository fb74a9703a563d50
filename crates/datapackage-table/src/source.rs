//! Row sources and the typed [`Table`] iterator over them.

use crate::{Record, TableError, TableSchema};
use serde_json::Value;
use std::io::{Read, Write};
use tracing::debug;

/// One untyped row as produced by a source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// Positional cells, matched to fields by index.
    Cells(Vec<Value>),
    /// Cells keyed by field name.
    Record(Record),
}

pub trait RowSource {
    /// Column names, for sources that carry a header row.
    fn header(&mut self) -> Result<Option<Vec<String>>, TableError>;

    fn next_row(&mut self) -> Option<Result<RawRow, TableError>>;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn header(&mut self) -> Result<Option<Vec<String>>, TableError> {
        (**self).header()
    }

    fn next_row(&mut self) -> Option<Result<RawRow, TableError>> {
        (**self).next_row()
    }
}

/// CSV text with a header row.
pub struct CsvSource<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CsvSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_delimiter(reader, b',')
    }

    pub fn with_delimiter(reader: R, delimiter: u8) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);
        Self { reader }
    }
}

impl<R: Read> RowSource for CsvSource<R> {
    fn header(&mut self) -> Result<Option<Vec<String>>, TableError> {
        let header = self.reader.headers()?;
        Ok(Some(header.iter().map(str::to_owned).collect()))
    }

    fn next_row(&mut self) -> Option<Result<RawRow, TableError>> {
        let mut record = csv::StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => Some(Ok(RawRow::Cells(
                record.iter().map(|c| Value::String(c.to_owned())).collect(),
            ))),
            Ok(false) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// In-memory rows: objects are records, arrays are positional cells.
pub struct NativeSource {
    rows: std::vec::IntoIter<Value>,
}

impl NativeSource {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowSource for NativeSource {
    fn header(&mut self) -> Result<Option<Vec<String>>, TableError> {
        Ok(None)
    }

    fn next_row(&mut self) -> Option<Result<RawRow, TableError>> {
        self.rows.next().map(|row| match row {
            Value::Object(record) => Ok(RawRow::Record(record)),
            Value::Array(cells) => Ok(RawRow::Cells(cells)),
            other => Err(TableError::NotARecord(other.to_string())),
        })
    }
}

/// Typed rows of a source under a schema.
pub struct Table<S> {
    source: S,
    schema: TableSchema,
}

impl<S: RowSource> Table<S> {
    /// Wrap `source`, reading and checking its header (if any) up front.
    pub fn new(mut source: S, schema: TableSchema) -> Result<Self, TableError> {
        if let Some(header) = source.header()? {
            debug!("table header: {header:?}");
            schema.check_header(&header)?;
        }
        Ok(Self { source, schema })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }
}

impl<S: RowSource> Iterator for Table<S> {
    type Item = Result<Record, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.source.next_row()?;
        Some(row.and_then(|raw| match raw {
            RawRow::Cells(cells) => self.schema.cast_row(&cells),
            RawRow::Record(record) => self.schema.cast_record(&record),
        }))
    }
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Write typed records as CSV with a header row of field names.
pub fn write_csv<W, I>(schema: &TableSchema, rows: I, writer: W) -> Result<(), TableError>
where
    W: Write,
    I: IntoIterator<Item = Result<Record, TableError>>,
{
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(schema.field_names())?;
    for row in rows {
        let row = row?;
        let cells: Vec<String> = schema
            .fields
            .iter()
            .map(|f| row.get(&f.name).map(csv_cell).unwrap_or_default())
            .collect();
        out.write_record(&cells)?;
    }
    out.flush()?;
    Ok(())
}
