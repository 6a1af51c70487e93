use serde_json::{Map, Value};

use crate::error::{Error, ErrorKind, Result};
use crate::groups::GroupData;
use crate::table::Schema;

/// One row of decoded cell values.
///
/// A record holds nothing but its cells: resolution by name, alias or
/// group goes through a [`Row`]/[`RowMut`] guard, which pairs the record
/// with the schema of its owning table. The record never keeps the table
/// alive.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Record {
    pub(crate) cells: Vec<String>,
}

impl Record {
    /// Build a record from raw cells, reconciling arity against the
    /// header and applying every registered decoder.
    ///
    /// Under strict mode a cell count differing from the header length is
    /// an error carrying the expected/actual counts and the source path
    /// when one is known. Otherwise short records are right-padded with
    /// empty cells and overlong records keep their first header-length
    /// cells, so that a record always matches the header width.
    pub(crate) fn from_cells(schema: &Schema, mut cells: Vec<String>) -> Result<Self> {
        let expected = schema.header.len();

        if cells.len() != expected {
            if schema.strict {
                return Err(Error::new(ErrorKind::ArityMismatch {
                    expected,
                    len: cells.len(),
                    source: schema.source.clone(),
                }));
            }

            if cells.len() < expected {
                cells.resize(expected, String::new());
            } else {
                cells.truncate(expected);
            }
        }

        schema.coders.decode_cells(&schema.header, &mut cells);

        Ok(Self { cells })
    }

    /// Number of cells of the record.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns whether the record has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The raw decoded cells, in header order.
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub(crate) fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

impl<I, S> From<I> for Record
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from(value: I) -> Self {
        Self {
            cells: value.into_iter().map(Into::into).collect(),
        }
    }
}

fn get<'r>(schema: &Schema, record: &'r Record, name: &str) -> Option<&'r str> {
    schema
        .header
        .index_of(name)
        .and_then(|index| record.cell(index))
}

fn get_index<'r>(record: &'r Record, index: usize) -> Result<&'r str> {
    record.cell(index).ok_or_else(|| {
        Error::new(ErrorKind::IndexOutOfRange {
            index,
            len: record.len(),
        })
    })
}

fn is_empty_in(schema: &Schema, record: &Record, columns: &[&str]) -> bool {
    columns
        .iter()
        .any(|column| get(schema, record, column).map_or(true, str::is_empty))
}

fn output_cells(schema: &Schema, record: &Record) -> Vec<String> {
    let mut cells = record.cells.clone();
    schema.coders.encode_cells(&schema.header, &mut cells);
    cells
}

fn output_pairs(schema: &Schema, record: &Record) -> Vec<(String, String)> {
    schema
        .header
        .display_names()
        .into_iter()
        .zip(output_cells(schema, record))
        .collect()
}

/// A shared view of a [`Record`] bound to its table's schema, resolving
/// cells by column name, alias or position.
pub struct Row<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) record: &'a Record,
}

impl std::fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row").field("record", self.record).finish_non_exhaustive()
    }
}

impl<'a> Row<'a> {
    /// Get a cell by column name or alias.
    ///
    /// A name that does not resolve yields `None` rather than an error, so
    /// defensive callers can probe for optional columns.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        get(self.schema, self.record, name)
    }

    /// Get a cell by its zero-based position.
    pub fn get_index(&self, index: usize) -> Result<&'a str> {
        get_index(self.record, index)
    }

    /// Returns whether any cell of the row is empty.
    pub fn is_empty(&self) -> bool {
        self.record.cells.iter().any(String::is_empty)
    }

    /// Returns whether any of the given columns holds an empty value.
    /// A column that does not resolve counts as empty.
    pub fn is_empty_in(&self, columns: &[&str]) -> bool {
        is_empty_in(self.schema, self.record, columns)
    }

    /// The row's cells with every registered encoder applied, in header
    /// order.
    pub fn to_cells(&self) -> Vec<String> {
        output_cells(self.schema, self.record)
    }

    /// The row as `(column, value)` pairs in header order, using alias
    /// names when alias display is switched on, values encoded.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        output_pairs(self.schema, self.record)
    }

    /// The row as a JSON object, keyed like [`Self::to_pairs`].
    pub fn to_json(&self) -> String {
        let mut map = Map::new();

        for (column, value) in self.to_pairs() {
            map.insert(column, Value::String(value));
        }

        Value::Object(map).to_string()
    }

    /// Extract a column group defined on the owning table, with group
    /// suffixes trimmed from the keys. Returns `None` for an unknown
    /// group name.
    pub fn group(&self, name: &str) -> Option<GroupData> {
        self.schema.groups.resolve(name, self.record, true)
    }

    /// Same as [`Self::group`], keeping each suffix appended to its keys.
    pub fn group_suffixed(&self, name: &str) -> Option<GroupData> {
        self.schema.groups.resolve(name, self.record, false)
    }
}

/// A mutable view of a record slot during iteration or random access.
///
/// On top of the [`Row`] read surface this allows editing cells and
/// deleting the row: a deleted row is removed from a buffered table and
/// skipped by the mirror sink in alter mode.
pub struct RowMut<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) slot: &'a mut Option<Record>,
}

impl<'a> RowMut<'a> {
    /// Reborrow as a shared [`Row`], unless the row was deleted.
    pub fn as_row(&self) -> Option<Row<'_>> {
        self.slot.as_ref().map(|record| Row {
            schema: self.schema,
            record,
        })
    }

    /// Get a cell by column name or alias; `None` if the name does not
    /// resolve or the row was deleted.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.slot
            .as_ref()
            .and_then(|record| get(self.schema, record, name))
    }

    /// Get a cell by its zero-based position.
    pub fn get_index(&self, index: usize) -> Result<&str> {
        match self.slot.as_ref() {
            Some(record) => get_index(record, index),
            None => Err(Error::new(ErrorKind::IndexOutOfRange { index, len: 0 })),
        }
    }

    /// Set a cell by column name or alias.
    ///
    /// Fails when the name does not resolve. Writes to a deleted row are
    /// dropped.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let index = self.schema.header.index_of(name).ok_or_else(|| {
            Error::new(ErrorKind::ColumnNotFound {
                name: name.to_string(),
            })
        })?;

        if let Some(record) = self.slot.as_mut() {
            record.cells[index] = value.into();
        }

        Ok(())
    }

    /// Set a cell by its zero-based position.
    pub fn set_index(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        let Some(record) = self.slot.as_mut() else {
            return Err(Error::new(ErrorKind::IndexOutOfRange { index, len: 0 }));
        };

        let len = record.len();

        match record.cells.get_mut(index) {
            Some(cell) => {
                *cell = value.into();
                Ok(())
            }
            None => Err(Error::new(ErrorKind::IndexOutOfRange { index, len })),
        }
    }

    /// Delete the row.
    ///
    /// In a buffered table this leaves a tombstone at the row's position
    /// (compacted by a reindexing delete); in alter mode the row is simply
    /// never forwarded to the mirror sink.
    pub fn delete(&mut self) {
        *self.slot = None;
    }

    /// Returns whether the row was deleted.
    pub fn is_deleted(&self) -> bool {
        self.slot.is_none()
    }

    /// See [`Row::is_empty`]. A deleted row is empty.
    pub fn is_empty(&self) -> bool {
        self.as_row().map_or(true, |row| row.is_empty())
    }

    /// See [`Row::is_empty_in`].
    pub fn is_empty_in(&self, columns: &[&str]) -> bool {
        self.as_row().map_or(true, |row| row.is_empty_in(columns))
    }

    /// See [`Row::to_cells`]. A deleted row has no cells.
    pub fn to_cells(&self) -> Vec<String> {
        self.as_row().map(|row| row.to_cells()).unwrap_or_default()
    }

    /// See [`Row::to_pairs`].
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.as_row().map(|row| row.to_pairs()).unwrap_or_default()
    }

    /// See [`Row::group`].
    pub fn group(&self, name: &str) -> Option<GroupData> {
        self.as_row().and_then(|row| row.group(name))
    }

    /// See [`Row::group_suffixed`].
    pub fn group_suffixed(&self, name: &str) -> Option<GroupData> {
        self.as_row().and_then(|row| row.group_suffixed(name))
    }
}
