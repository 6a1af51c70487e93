/*!
The `csv-table` crate provides header-aware access to delimited text data:
rows resolved by column name, alias or position, per-column encode/decode
coders, cached grouped-column extraction, predicate search, and three read
strategies including a streaming "alter" mode that rewrites a second file
while the source is traversed.

Tokenization is delegated to the [`csv`](https://docs.rs/csv/) crate; this
crate owns everything above it: the header index, record arity policy,
aliasing, coders, grouping and the iteration modes.

# Examples

*Reading a whole file into memory*

```
use csv_table::Table;

let mut table = Table::open("people.csv")?;

table.each(|row| {
    println!("{} is {}", row.get("name").unwrap(), row.get("age").unwrap());
    Ok(())
})?;
```

*Streaming row by row, without materializing the file*

```
use csv_table::TableBuilder;

let mut table = TableBuilder::new()
    .buffered(false)
    .open("people.csv")?;

while let Some(row) = table.next_row()? {
    println!("{:?}", row.get("name"));
}
```

*Rewriting a file as it streams ("alter" mode)*

```
use csv_table::TableBuilder;

let mut table = TableBuilder::new()
    .alter("people.clean.csv")
    .open("people.csv")?;

table.each(|row| {
    // Deleted rows are left out of people.clean.csv; everything else,
    // edits included, is forwarded.
    if row.is_empty_in(&["email"]) {
        row.delete();
    }
    Ok(())
})?;
```

*Extracting repeating column families*

```
use csv_table::Table;

// Specification 1,Value 1,UOM 1,Specification 2,Value 2,UOM 2,...
let mut table = Table::open("products.csv")?;
table.define_group("specs", "Specification", &["Value", "UOM"]);

let row = table.first()?.unwrap();

for spec in row.group("specs").unwrap().maps().unwrap() {
    // [("Specification", "Length"), ("Value", "20"), ("UOM", "in")], ...
    println!("{:?}", spec);
}
```

# Design notes

## Iteration modes

A [`Table`] is one type carrying one of three strategies, fixed at
construction: buffered (the source is loaded eagerly and the handle
closed), streaming (a single-slot cursor, one record live at a time) and
alter (streaming, with the previously current record forwarded to a
mirror sink on every advance unless it was deleted in between). All
consuming operations sit on top of the same internal cursor protocol, so
they behave identically regardless of the strategy; operations that
fundamentally require another shape, random row access on a stream or
searching a single-pass mirror for instance, fail with
[`ErrorKind::UnsupportedInMode`] instead of silently degrading.

## Cell resolution

Records store plain decoded cells and nothing else. Name, alias and group
resolution go through [`Row`]/[`RowMut`] guards pairing a record with its
table's schema, so a record never keeps its table alive nor can it
outlive the lookups it needs. Reading by a name that does not resolve
yields `None`; writing by one is an error.

## Column groups

Grouped extraction ("all columns starting with X", optionally correlated
across several prefixes by shared suffix) scans the header once per
definition and caches the resulting index sets. Definitions made before
the header exists are replayed once it arrives, and rebuilt if the header
is ever widened by a column addition.
*/

mod coder;
mod error;
mod groups;
mod header;
mod record;
mod search;
mod table;
mod writer;

pub use coder::{Coder, FnCoder, Trim};
pub use error::{Error, ErrorKind, Result};
pub use groups::GroupData;
pub use record::{Record, Row, RowMut};
pub use search::{Filter, Search};
pub use table::{Mode, Table, TableBuilder};
pub use writer::{Writer, WriterBuilder};
