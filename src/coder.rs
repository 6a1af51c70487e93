use crate::header::Header;

/// A column-scoped encode/decode transform pair.
///
/// `decode` runs when a record is constructed from raw cells, `encode` runs
/// when a record is serialized back out. Coders are stateless and
/// column-agnostic: the column binding lives in the table's registry, not
/// in the coder itself.
pub trait Coder {
    /// Transform a cell value on its way out to a sink.
    fn encode(&self, value: &str) -> String;

    /// Transform a raw cell value on its way into a record.
    fn decode(&self, value: &str) -> String;
}

/// Adapt a pair of closures into a [`Coder`].
pub struct FnCoder<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCoder<E, D>
where
    E: Fn(&str) -> String,
    D: Fn(&str) -> String,
{
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<E, D> Coder for FnCoder<E, D>
where
    E: Fn(&str) -> String,
    D: Fn(&str) -> String,
{
    fn encode(&self, value: &str) -> String {
        (self.encode)(value)
    }

    fn decode(&self, value: &str) -> String {
        (self.decode)(value)
    }
}

/// Trim surrounding whitespace when decoding; encoding passes values
/// through untouched.
pub struct Trim;

impl Coder for Trim {
    fn encode(&self, value: &str) -> String {
        value.to_string()
    }

    fn decode(&self, value: &str) -> String {
        value.trim().to_string()
    }
}

/// The column → coder registry of a table. At most one coder per column.
///
/// Registered columns absent from the current header are silently skipped
/// when applying, so one registry can be reused across tables with
/// different schemas.
#[derive(Default)]
pub(crate) struct Coders {
    by_column: Vec<(String, Box<dyn Coder>)>,
}

impl Coders {
    pub(crate) fn is_empty(&self) -> bool {
        self.by_column.is_empty()
    }

    pub(crate) fn add(&mut self, column: impl Into<String>, coder: Box<dyn Coder>) {
        let column = column.into();

        self.by_column.retain(|(existing, _)| *existing != column);
        self.by_column.push((column, coder));
    }

    pub(crate) fn decode_cells(&self, header: &Header, cells: &mut [String]) {
        for (column, coder) in self.by_column.iter() {
            if let Some(index) = header.index_of(column) {
                if let Some(cell) = cells.get_mut(index) {
                    *cell = coder.decode(cell);
                }
            }
        }
    }

    pub(crate) fn encode_cells(&self, header: &Header, cells: &mut [String]) {
        for (column, coder) in self.by_column.iter() {
            if let Some(index) = header.index_of(column) {
                if let Some(cell) = cells.get_mut(index) {
                    *cell = coder.encode(cell);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Header {
        let mut header = Header::default();
        header
            .set(names.iter().map(|n| n.to_string()).collect(), false)
            .unwrap();
        header
    }

    #[test]
    fn test_trim_coder() {
        assert_eq!(Trim.decode("   Colby   "), "Colby");
        assert_eq!(Trim.encode("   Colby   "), "   Colby   ");
    }

    #[test]
    fn test_registry_applies_by_column() {
        let header = header(&["name", "age"]);

        let mut coders = Coders::default();
        coders.add("age", Box::new(FnCoder::new(|v| format!("{}y", v), |v| v.trim_end_matches('y').to_string())));

        let mut cells = vec!["Colby".to_string(), "25y".to_string()];
        coders.decode_cells(&header, &mut cells);
        assert_eq!(cells, vec!["Colby".to_string(), "25".to_string()]);

        coders.encode_cells(&header, &mut cells);
        assert_eq!(cells, vec!["Colby".to_string(), "25y".to_string()]);
    }

    #[test]
    fn test_registry_skips_columns_absent_from_header() {
        let header = header(&["name"]);

        let mut coders = Coders::default();
        coders.add("age", Box::new(Trim));

        let mut cells = vec!["  Colby  ".to_string()];
        coders.decode_cells(&header, &mut cells);

        // No coder is bound to "name", and "age" does not resolve.
        assert_eq!(cells, vec!["  Colby  ".to_string()]);
    }

    #[test]
    fn test_one_coder_per_column() {
        let header = header(&["name"]);

        let mut coders = Coders::default();
        coders.add("name", Box::new(FnCoder::new(|v| v.to_string(), |v| format!("{}!", v))));
        coders.add("name", Box::new(Trim));

        let mut cells = vec!["  Colby  ".to_string()];
        coders.decode_cells(&header, &mut cells);

        assert_eq!(cells, vec!["Colby".to_string()]);
    }
}
