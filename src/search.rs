use crate::record::Row;

/// A predicate evaluated against a [`Row`].
pub type Filter = Box<dyn Fn(&Row) -> bool>;

/// An ordered chain of row predicates, combined with a short-circuit AND.
///
/// ```no_run
/// use csv_table::Search;
///
/// let search = Search::new()
///     .filter(|row| row.get("age").map_or(false, |age| age.parse::<u32>().unwrap() < 30))
///     .filter(|row| row.get("name").map_or(false, |name| name.len() < 6));
/// ```
#[derive(Default)]
pub struct Search {
    filters: Vec<Filter>,
}

impl Search {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate to the chain.
    pub fn filter(mut self, filter: impl Fn(&Row) -> bool + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Append already-boxed predicates to the chain.
    pub fn filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Returns whether no predicate has been registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluate the chain against a row: the first predicate returning
    /// false stops evaluation.
    pub fn run_filters(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| filter(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::rc::Rc;

    use crate::record::Record;
    use crate::table::Schema;

    fn schema(names: &[&str]) -> Schema {
        let mut schema = Schema::new(b',');
        schema
            .header
            .set(names.iter().map(|n| n.to_string()).collect(), false)
            .unwrap();
        schema
    }

    #[test]
    fn test_filters_are_anded() {
        let s = schema(&["name", "age"]);
        let record = Record::from(["Sarah", "22"]);
        let row = Row {
            schema: &s,
            record: &record,
        };

        let search = Search::new()
            .filter(|row| row.get("age").map_or(false, |age| age.parse::<u32>().unwrap() < 30))
            .filter(|row| row.get("name").map_or(false, |name| name.len() < 6));

        assert!(search.run_filters(&row));

        let record = Record::from(["Frankenstein", "26"]);
        let row = Row {
            schema: &s,
            record: &record,
        };

        assert!(!search.run_filters(&row));
    }

    #[test]
    fn test_evaluation_short_circuits() {
        let s = schema(&["name"]);
        let record = Record::from(["Sarah"]);
        let row = Row {
            schema: &s,
            record: &record,
        };

        let reached = Rc::new(Cell::new(false));
        let witness = Rc::clone(&reached);

        let search = Search::new().filter(|_| false).filter(move |_| {
            witness.set(true);
            true
        });

        assert!(!search.run_filters(&row));
        assert!(!reached.get());
    }

    #[test]
    fn test_empty_chain_matches_everything() {
        let s = schema(&["name"]);
        let record = Record::from(["Sarah"]);
        let row = Row {
            schema: &s,
            record: &record,
        };

        assert!(Search::new().run_filters(&row));
    }
}
