use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::coder::{Coder, Coders};
use crate::error::{Error, ErrorKind, Result};
use crate::groups::GroupCache;
use crate::header::Header;
use crate::record::{Record, Row, RowMut};
use crate::search::{Filter, Search};
use crate::writer::WriterBuilder;

/// The iteration strategy of a [`Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every record is pulled into memory when the source is opened.
    Buffered,

    /// One record is live at a time, pulled from the source on demand.
    Streaming,

    /// Streaming, forwarding every surviving record to a mirror sink as
    /// the traversal advances.
    Alter,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Mode::Buffered => "buffered",
            Mode::Streaming => "streaming",
            Mode::Alter => "alter",
        })
    }
}

fn unsupported(operation: &'static str, mode: Mode) -> Error {
    Error::new(ErrorKind::UnsupportedInMode { operation, mode })
}

/// Everything a record needs to resolve itself: the header index, the
/// coder registry, the group cache and the arity policy. Shared by every
/// [`Row`]/[`RowMut`] handed out by a table.
pub(crate) struct Schema {
    pub(crate) header: Header,
    pub(crate) coders: Coders,
    pub(crate) groups: GroupCache,
    pub(crate) strict: bool,
    pub(crate) delimiter: u8,
    pub(crate) source: Option<PathBuf>,
}

impl Schema {
    pub(crate) fn new(delimiter: u8) -> Self {
        Self {
            header: Header::default(),
            coders: Coders::default(),
            groups: GroupCache::default(),
            strict: true,
            delimiter,
            source: None,
        }
    }
}

fn open_reader(schema: &Schema, skip_header: bool) -> Result<csv::Reader<File>> {
    let Some(path) = schema.source.as_ref() else {
        return Err(Error::new(ErrorKind::NoSource));
    };

    let file = File::open(path).map_err(|err| {
        Error::new(ErrorKind::Open {
            path: path.clone(),
            err,
        })
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(schema.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    if skip_header {
        let mut raw = csv::ByteRecord::new();
        reader.read_byte_record(&mut raw)?;
    }

    Ok(reader)
}

fn open_sink(path: &Path, delimiter: u8) -> Result<csv::Writer<File>> {
    let file = File::create(path).map_err(|err| {
        Error::new(ErrorKind::Sink {
            path: path.to_path_buf(),
            err,
        })
    })?;

    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(file))
}

fn read_cells(reader: &mut csv::Reader<File>, select: Option<&[usize]>) -> Result<Option<Vec<String>>> {
    let mut raw = csv::StringRecord::new();

    if !reader.read_record(&mut raw)? {
        return Ok(None);
    }

    let cells = match select {
        Some(indices) => indices
            .iter()
            .map(|&index| raw.get(index).unwrap_or_default().to_string())
            .collect(),
        None => raw.iter().map(String::from).collect(),
    };

    Ok(Some(cells))
}

/// The single-slot cursor shared by the streaming and alter strategies.
///
/// `cursor` is dropped on exhaustion, releasing the source handle. For a
/// projected table, `select` holds the physical column indices to keep.
struct Stream {
    cursor: Option<csv::Reader<File>>,
    select: Option<Vec<usize>>,
    current: Option<Record>,
}

impl Stream {
    fn open(schema: &Schema, select: Option<Vec<usize>>) -> Result<Self> {
        Ok(Self {
            cursor: Some(open_reader(schema, true)?),
            select,
            current: None,
        })
    }

    fn from_reader(reader: csv::Reader<File>) -> Self {
        Self {
            cursor: Some(reader),
            select: None,
            current: None,
        }
    }

    /// Pull the next admitted record into the current slot. Returns false
    /// on exhaustion, dropping the source handle.
    fn pull(&mut self, schema: &Schema, admit: &Search) -> Result<bool> {
        loop {
            let Some(reader) = self.cursor.as_mut() else {
                self.current = None;
                return Ok(false);
            };

            let Some(cells) = read_cells(reader, self.select.as_deref())? else {
                self.cursor = None;
                self.current = None;
                return Ok(false);
            };

            let record = Record::from_cells(schema, cells)?;

            if admit.run_filters(&Row {
                schema,
                record: &record,
            }) {
                self.current = Some(record);
                return Ok(true);
            }
        }
    }
}

fn mirror_record(
    schema: &Schema,
    sink: &mut Option<csv::Writer<File>>,
    wrote_header: &mut bool,
    record: Record,
) -> Result<()> {
    let Some(writer) = sink.as_mut() else {
        return Ok(());
    };

    if !*wrote_header {
        writer.write_record(schema.header.display_names())?;
        *wrote_header = true;
    }

    let mut cells = record.cells;
    schema.coders.encode_cells(&schema.header, &mut cells);
    writer.write_record(&cells)?;

    Ok(())
}

fn mirror_finish(
    schema: &Schema,
    sink: &mut Option<csv::Writer<File>>,
    wrote_header: &mut bool,
) -> Result<()> {
    let Some(mut writer) = sink.take() else {
        return Ok(());
    };

    if !*wrote_header {
        writer.write_record(schema.header.display_names())?;
        *wrote_header = true;
    }

    writer.flush()?;

    Ok(())
}

enum State {
    Buffered {
        rows: Vec<Option<Record>>,
        pos: usize,
    },
    Streaming(Stream),
    Alter {
        stream: Stream,
        sink: Option<csv::Writer<File>>,
        wrote_header: bool,
    },
}

/// A header-aware table over delimited text.
///
/// A table owns the header index, the coder registry, the group cache and
/// one of three iteration strategies: buffered (the whole source loaded up
/// front), streaming (one record live at a time) and alter (streaming,
/// with every surviving record forwarded to a mirror sink). The strategy
/// is picked at construction through a [`TableBuilder`] and never changes
/// afterwards; every consuming operation (`each`, `map`, `pluck`,
/// `first`, `next_row`, `write_to`) behaves the same way on top of any of
/// them, except where a mode forbids an operation outright.
pub struct Table {
    schema: Schema,
    state: State,
    admit: Search,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table").finish_non_exhaustive()
    }
}

impl Table {
    /// Read a whole delimited file into a buffered table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        TableBuilder::new().open(path)
    }

    /// Start configuring a table.
    pub fn builder() -> TableBuilder {
        TableBuilder::new()
    }

    /// Build a buffered table from an in-memory header and records.
    pub fn from_rows<H, S, R>(header: H, rows: R) -> Result<Self>
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = Record>,
    {
        TableBuilder::new().from_rows(header, rows)
    }

    /// The iteration strategy of the table.
    pub fn mode(&self) -> Mode {
        match &self.state {
            State::Buffered { .. } => Mode::Buffered,
            State::Streaming(_) => Mode::Streaming,
            State::Alter { .. } => Mode::Alter,
        }
    }

    /// The column names, in file order, without aliasing applied.
    pub fn header(&self) -> &[String] {
        self.schema.header.names()
    }

    /// The header as it would be serialized, aliases substituted when
    /// alias display is switched on.
    pub fn display_header(&self) -> Vec<String> {
        self.schema.header.display_names()
    }

    pub fn column_count(&self) -> usize {
        self.schema.header.len()
    }

    pub fn delimiter(&self) -> u8 {
        self.schema.delimiter
    }

    /// The source path behind the table, if it was opened from one.
    pub fn source(&self) -> Option<&Path> {
        self.schema.source.as_deref()
    }

    /// Number of surviving records of a buffered table.
    pub fn count(&self) -> Result<usize> {
        let State::Buffered { rows, .. } = &self.state else {
            return Err(unsupported("counting", self.mode()));
        };

        Ok(rows.iter().flatten().count())
    }

    /// Switch header serialization to alias names where one exists. This
    /// affects `write_to`, the mirror sink, `to_pairs` and `to_json`.
    pub fn use_aliases(&mut self) {
        self.schema.header.set_use_aliases(true);
    }

    /// Declare `alias → real name` lookups. See [`TableBuilder::alias`].
    pub fn apply_aliases<I, S>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        self.schema.header.apply_aliases(pairs)
    }

    /// Bind a coder to a column, replacing any previous one.
    ///
    /// Decoding happens when records are constructed, so a coder added to
    /// an already-loaded buffered table only affects serialization.
    pub fn add_coder(&mut self, column: impl Into<String>, coder: impl Coder + 'static) {
        self.schema.coders.add(column, Box::new(coder));
    }

    /// Declare a named column group over a mandatory prefix and, for
    /// correlated groups, additional prefixes sharing its suffixes.
    /// Records expose the group through [`Row::group`].
    pub fn define_group(&mut self, name: &str, mandatory: &str, additional: &[&str]) {
        let Schema { header, groups, .. } = &mut self.schema;
        groups.define(header, name, mandatory, additional);
    }

    /// The subset of `columns` that does not resolve against the header,
    /// aliases included.
    pub fn missing_columns<'a>(&self, columns: &[&'a str]) -> Vec<&'a str> {
        columns
            .iter()
            .copied()
            .filter(|column| self.schema.header.index_of(column).is_none())
            .collect()
    }

    /// Append a record to a buffered table.
    ///
    /// The incoming cells are reconciled against the header (strict mode
    /// rejects a mismatched count, otherwise short records are padded)
    /// and run through the registered decoders.
    pub fn append(&mut self, record: impl Into<Record>) -> Result<()> {
        if !self.schema.header.is_set() {
            return Err(Error::new(ErrorKind::HeaderNotSet {
                operation: "appending rows",
            }));
        }

        let mode = self.mode();

        let State::Buffered { rows, .. } = &mut self.state else {
            return Err(unsupported("appending", mode));
        };

        let record = Record::from_cells(&self.schema, record.into().cells)?;
        rows.push(Some(record));

        Ok(())
    }

    fn push_record(&mut self, record: Record) {
        if let State::Buffered { rows, .. } = &mut self.state {
            rows.push(Some(record));
        }
    }

    /// A shared view of the record at `index` in a buffered table. `None`
    /// for a deleted or out-of-range position.
    pub fn row(&self, index: usize) -> Result<Option<Row<'_>>> {
        let State::Buffered { rows, .. } = &self.state else {
            return Err(unsupported("random row access", self.mode()));
        };

        Ok(rows
            .get(index)
            .and_then(Option::as_ref)
            .map(|record| Row {
                schema: &self.schema,
                record,
            }))
    }

    /// A mutable view of the record at `index` in a buffered table.
    pub fn row_mut(&mut self, index: usize) -> Result<Option<RowMut<'_>>> {
        let mode = self.mode();

        let State::Buffered { rows, .. } = &mut self.state else {
            return Err(unsupported("random row access", mode));
        };

        Ok(rows
            .get_mut(index)
            .filter(|slot| slot.is_some())
            .map(|slot| RowMut {
                schema: &self.schema,
                slot,
            }))
    }

    /// Delete the record at `index` in a buffered table. Returns whether
    /// a record was actually deleted.
    ///
    /// With `reindex` the sequence is compacted and every later record
    /// shifts down one position; without it a hole is left in place so
    /// later positions keep their indices until [`Self::reindex_rows`]
    /// or a compacting traversal runs.
    pub fn delete_at(&mut self, index: usize, reindex: bool) -> Result<bool> {
        let mode = self.mode();

        let State::Buffered { rows, pos } = &mut self.state else {
            return Err(unsupported("deleting by position", mode));
        };

        if !rows.get(index).is_some_and(Option::is_some) {
            return Ok(false);
        }

        if reindex {
            rows.remove(index);

            // Keep the manual iteration cursor on the same record.
            if *pos > index {
                *pos -= 1;
            }
        } else {
            rows[index] = None;
        }

        Ok(true)
    }

    /// Compact a buffered table, dropping the holes left by non-reindexing
    /// deletes and resetting the manual iteration cursor.
    pub fn reindex_rows(&mut self) -> Result<()> {
        let mode = self.mode();

        let State::Buffered { rows, pos } = &mut self.state else {
            return Err(unsupported("reindexing", mode));
        };

        rows.retain(Option::is_some);
        *pos = 0;

        Ok(())
    }

    /// Append a column to a buffered table, assigning `default` to every
    /// record and rebuilding the defined column groups.
    pub fn add_column(&mut self, title: &str, default: &str) -> Result<()> {
        let mode = self.mode();

        if mode != Mode::Buffered {
            return Err(unsupported("adding a column", mode));
        }

        let mut names = self.schema.header.names().to_vec();
        names.push(title.to_string());

        self.schema.header.set(names, true)?;
        self.schema.groups.rebuild(&self.schema.header);

        let State::Buffered { rows, .. } = &mut self.state else {
            unreachable!();
        };

        for record in rows.iter_mut().flatten() {
            record.cells.push(default.to_string());
        }

        Ok(())
    }

    /// Advance the streaming or alter cursor, flushing the previous record
    /// to the mirror sink first in alter mode. Never yields in buffered
    /// mode, where records are addressed through [`Self::next_row`]
    /// directly.
    fn advance(&mut self) -> Result<bool> {
        match &mut self.state {
            State::Buffered { .. } => Ok(false),
            State::Streaming(stream) => stream.pull(&self.schema, &self.admit),
            State::Alter {
                stream,
                sink,
                wrote_header,
            } => {
                if let Some(record) = stream.current.take() {
                    mirror_record(&self.schema, sink, wrote_header, record)?;
                }

                if stream.pull(&self.schema, &self.admit)? {
                    return Ok(true);
                }

                mirror_finish(&self.schema, sink, wrote_header)?;

                Ok(false)
            }
        }
    }

    /// Move to the next surviving record and return a mutable view of it,
    /// or `None` on exhaustion.
    ///
    /// In buffered mode this walks an internal cursor over the in-memory
    /// records (reset by [`Self::rewind`]); in streaming and alter modes
    /// it pulls the next record from the source, forwarding the previous
    /// one to the mirror sink in alter mode unless it was deleted.
    pub fn next_row(&mut self) -> Result<Option<RowMut<'_>>> {
        if let State::Buffered { .. } = &self.state {
            let found = if let State::Buffered { rows, pos } = &mut self.state {
                let mut found = None;
                while *pos < rows.len() {
                    let index = *pos;
                    *pos += 1;

                    if rows[index].is_some() {
                        found = Some(index);
                        break;
                    }
                }
                found
            } else {
                unreachable!()
            };

            let State::Buffered { rows, .. } = &mut self.state else {
                unreachable!()
            };

            return Ok(found.map(|index| RowMut {
                schema: &self.schema,
                slot: &mut rows[index],
            }));
        }

        if !self.advance()? {
            return Ok(None);
        }

        let (State::Streaming(stream) | State::Alter { stream, .. }) = &mut self.state else {
            unreachable!();
        };

        Ok(Some(RowMut {
            schema: &self.schema,
            slot: &mut stream.current,
        }))
    }

    /// Restart iteration from the first record.
    ///
    /// A buffered table resets its cursor; a streaming table reopens the
    /// source and skips the header row. Alter mode is single-pass and
    /// cannot be rewound.
    pub fn rewind(&mut self) -> Result<()> {
        match &mut self.state {
            State::Buffered { pos, .. } => {
                *pos = 0;
                Ok(())
            }
            State::Streaming(stream) => {
                stream.current = None;
                stream.cursor = Some(open_reader(&self.schema, true)?);
                Ok(())
            }
            State::Alter { .. } => Err(unsupported("rewinding", Mode::Alter)),
        }
    }

    /// The first record of a buffered table (resetting the cursor), or
    /// the currently live record of a stream, pulling it if none is live
    /// yet.
    pub fn first(&mut self) -> Result<Option<Row<'_>>> {
        let needs_pull = match &mut self.state {
            State::Buffered { pos, .. } => {
                *pos = 0;
                false
            }
            State::Streaming(stream) | State::Alter { stream, .. } => stream.current.is_none(),
        };

        if needs_pull {
            self.advance()?;
        }

        let row = match &self.state {
            State::Buffered { rows, .. } => rows.iter().flatten().next(),
            State::Streaming(stream) | State::Alter { stream, .. } => stream.current.as_ref(),
        }
        .map(|record| Row {
            schema: &self.schema,
            record,
        });

        Ok(row)
    }

    /// Run `f` over every surviving record, start to finish, with a
    /// shared view. Streaming and alter tables are consumed to
    /// exhaustion.
    fn traverse<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(Row<'_>) -> Result<()>,
    {
        if let State::Buffered { rows, .. } = &self.state {
            for record in rows.iter().flatten() {
                f(Row {
                    schema: &self.schema,
                    record,
                })?;
            }

            return Ok(());
        }

        while self.advance()? {
            let (State::Streaming(stream) | State::Alter { stream, .. }) = &self.state else {
                unreachable!();
            };

            if let Some(record) = stream.current.as_ref() {
                f(Row {
                    schema: &self.schema,
                    record,
                })?;
            }
        }

        Ok(())
    }

    /// Run `f` over every surviving record with a mutable view, allowing
    /// edits and deletion.
    ///
    /// A buffered table is compacted after the pass when any record was
    /// deleted. In alter mode every record that survives `f` is forwarded
    /// to the mirror sink, and the sink is finished when the source is
    /// exhausted.
    pub fn each<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut RowMut) -> Result<()>,
    {
        if let State::Buffered { rows, pos } = &mut self.state {
            let mut deleted = false;

            for slot in rows.iter_mut() {
                if slot.is_none() {
                    continue;
                }

                let mut row = RowMut {
                    schema: &self.schema,
                    slot,
                };

                f(&mut row)?;

                deleted = deleted || row.is_deleted();
            }

            if deleted {
                rows.retain(Option::is_some);
                *pos = 0;
            }

            return Ok(());
        }

        while self.advance()? {
            let (State::Streaming(stream) | State::Alter { stream, .. }) = &mut self.state else {
                unreachable!();
            };

            let mut row = RowMut {
                schema: &self.schema,
                slot: &mut stream.current,
            };

            f(&mut row)?;
        }

        Ok(())
    }

    /// Collect `f(row)` for every surviving record.
    pub fn map<T, F>(&mut self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row) -> T,
    {
        let mut out = Vec::new();

        self.traverse(|row| {
            out.push(f(&row));
            Ok(())
        })?;

        Ok(out)
    }

    /// Collect one column's value from every surviving record.
    pub fn pluck(&mut self, column: &str) -> Result<Vec<String>> {
        let index = self.schema.header.index_of(column).ok_or_else(|| {
            Error::new(ErrorKind::ColumnNotFound {
                name: column.to_string(),
            })
        })?;

        let mut out = Vec::new();

        self.traverse(|row| {
            out.push(row.get_index(index)?.to_string());
            Ok(())
        })?;

        Ok(out)
    }

    fn derived(&self, header: Header) -> Table {
        Table {
            schema: Schema {
                header,
                coders: Coders::default(),
                groups: self.schema.groups.clone(),
                strict: self.schema.strict,
                delimiter: self.schema.delimiter,
                source: None,
            },
            state: State::Buffered {
                rows: Vec::new(),
                pos: 0,
            },
            admit: Search::new(),
        }
    }

    /// Collect every record matching `search` into a new buffered table
    /// sharing this table's header, in original order. A streaming source
    /// is consumed to exhaustion.
    pub fn run_search(&mut self, search: &Search) -> Result<Table> {
        if self.mode() == Mode::Alter {
            return Err(unsupported("searching", Mode::Alter));
        }

        let mut results = self.derived(self.schema.header.clone());

        self.traverse(|row| {
            if search.run_filters(&row) {
                results.push_record(row.record.clone());
            }

            Ok(())
        })?;

        Ok(results)
    }

    /// Correlate this table's records against a buffered `other` table.
    ///
    /// For every pair of records, the `(local column, other column)`
    /// pairs are checked in order and the first equal pair admits the
    /// *other* record into the result, once, regardless of what the
    /// remaining column pairs would say. The result is a new buffered
    /// table with `other`'s header.
    pub fn find_matches(&mut self, other: &Table, pairs: &[(&str, &str)]) -> Result<Table> {
        if self.mode() == Mode::Alter {
            return Err(unsupported("searching", Mode::Alter));
        }

        let State::Buffered {
            rows: candidates, ..
        } = &other.state
        else {
            return Err(unsupported("matching records", other.mode()));
        };

        let mut results = other.derived(other.schema.header.clone());
        let mut admitted = vec![false; candidates.len()];

        self.traverse(|row| {
            for (position, candidate) in candidates.iter().enumerate() {
                let Some(candidate) = candidate else {
                    continue;
                };

                let candidate_row = Row {
                    schema: &other.schema,
                    record: candidate,
                };

                for (local, remote) in pairs {
                    let value = row.get(local);

                    if value.is_some() && value == candidate_row.get(remote) {
                        if !admitted[position] {
                            admitted[position] = true;
                            results.push_record(candidate.clone());
                        }

                        break;
                    }
                }
            }

            Ok(())
        })?;

        Ok(results)
    }

    /// Derive a streaming table over the same source restricted to the
    /// given columns, labelled exactly as requested (aliases are resolved
    /// and become the projected column names). The projection reads full
    /// physical rows and keeps only the chosen positions, so strict arity
    /// is switched off.
    pub fn only(&self, columns: &[&str]) -> Result<Table> {
        if !self.schema.header.is_set() {
            return Err(Error::new(ErrorKind::HeaderNotSet {
                operation: "projecting columns",
            }));
        }

        let mut select = Vec::with_capacity(columns.len());

        for column in columns {
            let index = self.schema.header.index_of(column).ok_or_else(|| {
                Error::new(ErrorKind::ColumnNotFound {
                    name: column.to_string(),
                })
            })?;

            select.push(index);
        }

        let mut schema = Schema::new(self.schema.delimiter);
        schema.strict = false;
        schema.source = self.schema.source.clone();
        schema
            .header
            .set(columns.iter().map(|c| c.to_string()).collect(), false)?;

        let stream = Stream::open(&schema, Some(select))?;

        Ok(Table {
            schema,
            state: State::Streaming(stream),
            admit: Search::new(),
        })
    }

    /// Serialize the table to a sink: header first (aliases substituted
    /// when alias display is on), then every surviving record with its
    /// coders applied. A streaming source is consumed to exhaustion.
    pub fn write_to<W: Write>(&mut self, sink: W) -> Result<()> {
        if !self.schema.header.is_set() {
            return Err(Error::new(ErrorKind::HeaderNotSet {
                operation: "writing",
            }));
        }

        let mut builder = WriterBuilder::new();
        builder.delimiter(self.schema.delimiter);

        let mut writer = builder.from_writer(sink);
        writer.write_header(self.schema.header.display_names())?;

        self.traverse(|row| writer.append(row.to_cells()))?;

        writer.flush()
    }

    /// Serialize the table to a file created at `path`.
    pub fn write<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();

        let file = File::create(path).map_err(|err| {
            Error::new(ErrorKind::Sink {
                path: path.to_path_buf(),
                err,
            })
        })?;

        self.write_to(file)
    }
}

/// Builds a [`Table`] with the given configuration.
///
/// Unlike a plain reader configuration, a builder carries coders and
/// filters, which are not clonable, so its setters consume and return the
/// builder and the finishing calls consume it entirely.
pub struct TableBuilder {
    delimiter: u8,
    strict: bool,
    buffered: bool,
    alter: Option<PathBuf>,
    aliases: Vec<(String, String)>,
    coders: Vec<(String, Box<dyn Coder>)>,
    filters: Vec<Filter>,
    groups: Vec<(String, String, Vec<String>)>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self {
            delimiter: b',',
            strict: true,
            buffered: true,
            alter: None,
            aliases: Vec::new(),
            coders: Vec::new(),
            filters: Vec::new(),
            groups: Vec::new(),
        }
    }
}

impl TableBuilder {
    /// Create a new [`TableBuilder`] with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter to be used by the created [`Table`].
    ///
    /// This delimiter must be a single byte.
    ///
    /// Will default to a comma.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Indicate whether a record whose cell count differs from the header
    /// length is an error. When switched off, short records are padded
    /// with empty cells instead.
    ///
    /// Will default to `true`.
    pub fn strict(mut self, yes: bool) -> Self {
        self.strict = yes;
        self
    }

    /// Indicate whether the created [`Table`] should load the whole
    /// source into memory when opened, rather than streaming it record by
    /// record.
    ///
    /// Will default to `true`.
    pub fn buffered(mut self, yes: bool) -> Self {
        self.buffered = yes;
        self
    }

    /// Mirror every surviving record to a second file as the table is
    /// traversed. This puts the table in alter mode, which streams the
    /// source regardless of [`Self::buffered`]; deleting a record during
    /// traversal leaves it out of the mirror.
    pub fn alter<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.alter = Some(path.as_ref().to_path_buf());
        self
    }

    /// Declare an alternate lookup name for a real header column. An
    /// alias equal to a real column name is rejected when the header
    /// becomes known.
    pub fn alias(mut self, alias: impl Into<String>, real: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), real.into()));
        self
    }

    /// Bind a coder to a column: its `decode` runs over the column's cell
    /// when a record is read, its `encode` when the record is written
    /// back out. Columns absent from the header are skipped.
    pub fn coder(mut self, column: impl Into<String>, coder: impl Coder + 'static) -> Self {
        self.coders.push((column.into(), Box::new(coder)));
        self
    }

    /// Only admit records matching the predicate. Filters are checked in
    /// declaration order while reading, so a record failing one is never
    /// seen by iteration and, in alter mode, never reaches the mirror.
    pub fn filter(mut self, filter: impl Fn(&Row) -> bool + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Declare a named column group, replayed once the header is known.
    /// See [`Table::define_group`].
    pub fn group(
        mut self,
        name: impl Into<String>,
        mandatory: impl Into<String>,
        additional: &[&str],
    ) -> Self {
        self.groups.push((
            name.into(),
            mandatory.into(),
            additional.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    fn build_schema(&mut self, source: Option<PathBuf>) -> Result<Schema> {
        let mut schema = Schema::new(self.delimiter);
        schema.strict = self.strict;
        schema.source = source;

        schema.header.apply_aliases(std::mem::take(&mut self.aliases))?;

        for (column, coder) in self.coders.drain(..) {
            schema.coders.add(column, coder);
        }

        Ok(schema)
    }

    fn define_groups(schema: &mut Schema, groups: &[(String, String, Vec<String>)]) {
        let Schema {
            header,
            groups: cache,
            ..
        } = schema;

        for (name, mandatory, additional) in groups {
            let additional: Vec<&str> = additional.iter().map(String::as_str).collect();
            cache.define(header, name, mandatory, &additional);
        }
    }

    /// Open `path` and build a table over it, reading the header row and,
    /// for a buffered table, every record.
    pub fn open<P: AsRef<Path>>(mut self, path: P) -> Result<Table> {
        let mut schema = self.build_schema(Some(path.as_ref().to_path_buf()))?;
        let admit = Search::new().filters(std::mem::take(&mut self.filters));

        let mut reader = open_reader(&schema, false)?;

        let mut raw = csv::StringRecord::new();

        if !reader.read_record(&mut raw)? {
            return Err(Error::new(ErrorKind::HeaderNotSet {
                operation: "reading records",
            }));
        }

        schema.header.set(raw.iter().map(String::from).collect(), false)?;

        Self::define_groups(&mut schema, &self.groups);

        let state = if let Some(alter_path) = self.alter.take() {
            State::Alter {
                stream: Stream::from_reader(reader),
                sink: Some(open_sink(&alter_path, self.delimiter)?),
                wrote_header: false,
            }
        } else if self.buffered {
            let mut stream = Stream::from_reader(reader);
            let mut rows = Vec::new();

            while stream.pull(&schema, &admit)? {
                rows.push(stream.current.take());
            }

            State::Buffered { rows, pos: 0 }
        } else {
            State::Streaming(Stream::from_reader(reader))
        };

        Ok(Table {
            schema,
            state,
            admit,
        })
    }

    /// Build a buffered table from an in-memory header and records,
    /// applying the same arity, coder and filter treatment as a read from
    /// a source.
    pub fn from_rows<H, S, R>(mut self, header: H, rows: R) -> Result<Table>
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = Record>,
    {
        let mut schema = self.build_schema(None)?;
        let admit = Search::new().filters(std::mem::take(&mut self.filters));

        schema
            .header
            .set(header.into_iter().map(Into::into).collect(), false)?;

        Self::define_groups(&mut schema, &self.groups);

        let mut out = Vec::new();

        for record in rows {
            let record = Record::from_cells(&schema, record.cells)?;

            if admit.run_filters(&Row {
                schema: &schema,
                record: &record,
            }) {
                out.push(Some(record));
            }
        }

        Ok(Table {
            schema,
            state: State::Buffered { rows: out, pos: 0 },
            admit,
        })
    }
}
