use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, ErrorKind, Result};
use crate::record::Row;

/// Builds a [`Writer`] with the given configuration.
#[derive(Clone)]
pub struct WriterBuilder {
    delimiter: u8,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl WriterBuilder {
    /// Create a new [`WriterBuilder`] with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter to be used by the created [`Writer`].
    ///
    /// This delimiter must be a single byte.
    ///
    /// Will default to a comma.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    /// Create a new [`Writer`] writing to the provided sink implementing
    /// [`std::io::Write`].
    pub fn from_writer<W: Write>(&self, writer: W) -> Writer<W> {
        Writer {
            inner: csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .flexible(true)
                .from_writer(writer),
            wrote_header: false,
        }
    }

    /// Create a new [`Writer`] writing to a file created at `path`.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let path = path.as_ref();

        let file = File::create(path).map_err(|err| {
            Error::new(ErrorKind::Sink {
                path: path.to_path_buf(),
                err,
            })
        })?;

        Ok(self.from_writer(file))
    }
}

/// A header-then-rows serializer over an arbitrary sink, independent of
/// any table. Useful for producing synthetic delimited output record by
/// record.
pub struct Writer<W: Write> {
    inner: csv::Writer<W>,
    wrote_header: bool,
}

impl Writer<File> {
    /// Create a new [`Writer`] with default configuration, writing to a
    /// file created at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: Write> Writer<W> {
    /// Create a new [`Writer`] with default configuration, writing to the
    /// provided sink.
    pub fn from_writer(writer: W) -> Self {
        WriterBuilder::new().from_writer(writer)
    }

    /// Write the header line. Fails if a header was already written
    /// through this writer.
    pub fn write_header<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        if self.wrote_header {
            return Err(Error::new(ErrorKind::AlreadySet {
                what: "writer header",
            }));
        }

        self.inner.write_record(names)?;
        self.wrote_header = true;

        Ok(())
    }

    /// Append one record of raw cells, written as-is.
    pub fn append<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.inner.write_record(cells)?;

        Ok(())
    }

    /// Append a table row, its cells passed through the coders of the
    /// table it came from.
    pub fn append_row(&mut self, row: &Row) -> Result<()> {
        self.append(row.to_cells())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;

        Ok(())
    }

    /// Unwrap the underlying sink, flushing any buffered output.
    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|err| Error::from(err.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::coder::FnCoder;
    use crate::record::Record;
    use crate::table::Table;

    fn contents(writer: Writer<Vec<u8>>) -> String {
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_header_then_rows() {
        let mut writer = Writer::from_writer(Vec::new());

        writer.write_header(["name", "age"]).unwrap();
        writer.append(["Colby", "25"]).unwrap();
        writer.append(["Sarah", "22"]).unwrap();

        assert_eq!(contents(writer), "name,age\nColby,25\nSarah,22\n");
    }

    #[test]
    fn test_header_can_only_be_written_once() {
        let mut writer = Writer::from_writer(Vec::new());

        writer.write_header(["name"]).unwrap();

        let err = writer.write_header(["name"]).unwrap_err();
        assert_eq!(err.to_string(), "writer header has already been set");
    }

    #[test]
    fn test_custom_delimiter_and_quoting() {
        let mut builder = WriterBuilder::new();
        builder.delimiter(b'\t');

        let mut writer = builder.from_writer(Vec::new());

        writer.write_header(["name", "note"]).unwrap();
        writer.append(["Colby", "says \"hi\"\tloudly"]).unwrap();

        assert_eq!(
            contents(writer),
            "name\tnote\nColby\t\"says \"\"hi\"\"\tloudly\"\n"
        );
    }

    #[test]
    fn test_append_row_applies_coders() {
        let mut table = Table::builder()
            .coder(
                "age",
                FnCoder::new(
                    |v: &str| format!("{}y", v),
                    |v: &str| v.trim_end_matches('y').to_string(),
                ),
            )
            .from_rows(["name", "age"], [Record::from(["Colby", "25y"])])
            .unwrap();

        let mut writer = Writer::from_writer(Vec::new());
        writer.write_header(table.display_header()).unwrap();

        let row = table.first().unwrap().unwrap();
        writer.append_row(&row).unwrap();

        assert_eq!(contents(writer), "name,age\nColby,25y\n");
    }
}
