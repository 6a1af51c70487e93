use std::collections::HashMap;

use crate::error::{Error, ErrorKind, Result};

/// Bidirectional mapping between column names (and their aliases) and
/// zero-based column positions.
///
/// Real names are unique and locked once set; aliases are alternate lookup
/// keys pointing at an existing column, never a distinct storage slot.
#[derive(Debug, Default, Clone)]
pub(crate) struct Header {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
    aliases: Vec<(String, String)>,
    use_aliases: bool,
}

impl Header {
    pub(crate) fn is_set(&self) -> bool {
        !self.names.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    /// The column names, in file order, without aliasing applied.
    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    /// Install the header names.
    ///
    /// Fails when called twice (unless `overwrite` is passed, used
    /// internally by projection and column addition), when any name occurs
    /// more than once, or when a previously declared alias collides with
    /// one of the incoming names.
    pub(crate) fn set(&mut self, names: Vec<String>, overwrite: bool) -> Result<()> {
        if self.is_set() && !overwrite {
            return Err(Error::new(ErrorKind::AlreadySet { what: "header" }));
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut duplicated = Vec::new();

        for name in names.iter() {
            let count = counts.entry(name).or_insert(0);
            *count += 1;

            if *count == 2 {
                duplicated.push(name.clone());
            }
        }

        if !duplicated.is_empty() {
            return Err(Error::new(ErrorKind::DuplicateHeader { names: duplicated }));
        }

        self.validate_aliases(&names, self.aliases.iter().map(|(alias, _)| alias))?;

        self.names = names;
        self.rebuild_lookup();

        Ok(())
    }

    /// Declare aliases as `(alias, real name)` pairs.
    ///
    /// An alias whose target does not currently resolve is kept around
    /// without a lookup entry (it will gain one if the header is ever
    /// replaced with a matching column). An alias equal to a real column
    /// name is rejected.
    pub(crate) fn apply_aliases<I, S>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let incoming: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(alias, real)| (alias.into(), real.into()))
            .collect();

        self.validate_aliases(&self.names, incoming.iter().map(|(alias, _)| alias))?;

        for (alias, real) in incoming {
            self.aliases.retain(|(existing, _)| *existing != alias);
            self.aliases.push((alias, real));
        }

        self.rebuild_lookup();

        Ok(())
    }

    fn validate_aliases<'a, I>(&self, names: &[String], aliases: I) -> Result<()>
    where
        I: Iterator<Item = &'a String>,
    {
        let mut invalid = Vec::new();

        for alias in aliases {
            if names.contains(alias) && !invalid.contains(alias) {
                invalid.push(alias.clone());
            }
        }

        if !invalid.is_empty() {
            return Err(Error::new(ErrorKind::InvalidAlias { aliases: invalid }));
        }

        Ok(())
    }

    fn rebuild_lookup(&mut self) {
        self.lookup = self
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();

        for (alias, real) in self.aliases.iter() {
            if let Some(&index) = self.lookup.get(real.as_str()) {
                self.lookup.insert(alias.clone(), index);
            }
        }
    }

    /// Resolve a column name or alias to its position.
    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// The real column name at a position.
    pub(crate) fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// The first declared alias pointing at a real column name, if any.
    pub(crate) fn alias_of(&self, real: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, target)| target == real)
            .map(|(alias, _)| alias.as_str())
    }

    pub(crate) fn set_use_aliases(&mut self, yes: bool) {
        self.use_aliases = yes;
    }

    /// The header as it should be serialized: real names, or aliases in
    /// their place when alias display is switched on.
    pub(crate) fn display_names(&self) -> Vec<String> {
        if !self.use_aliases {
            return self.names.clone();
        }

        self.names
            .iter()
            .map(|name| match self.alias_of(name) {
                Some(alias) => alias.to_string(),
                None => name.clone(),
            })
            .collect()
    }
}
