use std::collections::HashMap;

use crate::header::Header;
use crate::record::Record;

/// The values extracted from a record for one named column group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupData {
    /// A mandatory-prefix-only group: the non-empty values of every column
    /// whose name starts with the prefix, in header order.
    Single(Vec<String>),

    /// A correlated group: one ordered `(search term, value)` map per
    /// suffix found after the mandatory prefix, in header-scan order.
    Multiple(Vec<Vec<(String, String)>>),
}

impl GroupData {
    /// The flat values of a `Single` group.
    pub fn values(self) -> Option<Vec<String>> {
        match self {
            GroupData::Single(values) => Some(values),
            GroupData::Multiple(_) => None,
        }
    }

    /// The per-suffix maps of a `Multiple` group.
    pub fn maps(self) -> Option<Vec<Vec<(String, String)>>> {
        match self {
            GroupData::Single(_) => None,
            GroupData::Multiple(maps) => Some(maps),
        }
    }
}

#[derive(Debug, Clone)]
struct GroupDef {
    name: String,
    mandatory: String,
    additional: Vec<String>,
}

#[derive(Debug, Clone)]
enum CachedGroup {
    Single {
        indices: Vec<usize>,
    },
    Multiple {
        search: Vec<String>,
        groups: Vec<SuffixGroup>,
    },
}

/// One distinct suffix found after the mandatory prefix, with the column
/// index of each search term sharing it (`None` when an additional term
/// has no column under this suffix). Index 0 is always the mandatory term.
#[derive(Debug, Clone)]
struct SuffixGroup {
    suffix: String,
    indices: Vec<Option<usize>>,
}

/// Per-table cache of column-group index mappings.
///
/// Definitions are kept in a replayable ledger: a group declared before
/// the header is known is built as soon as the header arrives, and every
/// group is rebuilt when the header is replaced (projection, column
/// addition). Built entries are immutable; resolving is read-only.
#[derive(Debug, Default, Clone)]
pub(crate) struct GroupCache {
    defs: Vec<GroupDef>,
    entries: HashMap<String, CachedGroup>,
}

impl GroupCache {
    /// Declare a group. Redefining a name overwrites its cached entry.
    pub(crate) fn define(
        &mut self,
        header: &Header,
        name: &str,
        mandatory: &str,
        additional: &[&str],
    ) {
        let def = GroupDef {
            name: name.to_string(),
            mandatory: mandatory.to_string(),
            additional: additional.iter().map(|s| s.to_string()).collect(),
        };

        if header.is_set() {
            self.build(header, &def);
        }

        self.defs.retain(|existing| existing.name != def.name);
        self.defs.push(def);
    }

    /// Rebuild every cached entry against a (new) header, replaying the
    /// definitions ledger.
    pub(crate) fn rebuild(&mut self, header: &Header) {
        self.entries.clear();

        let defs = std::mem::take(&mut self.defs);

        for def in defs.iter() {
            self.build(header, def);
        }

        self.defs = defs;
    }

    fn build(&mut self, header: &Header, def: &GroupDef) {
        // Prefix matching is a literal, case-sensitive leading-substring
        // test: "Spec" also matches a column named "Specifications".
        let matches = header
            .names()
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(&def.mandatory));

        let cached = if def.additional.is_empty() {
            CachedGroup::Single {
                indices: matches.map(|(index, _)| index).collect(),
            }
        } else {
            let mut groups = Vec::new();

            for (index, name) in matches {
                let suffix = name[def.mandatory.len()..].to_string();

                let mut indices = vec![Some(index)];

                for term in def.additional.iter() {
                    indices.push(header.index_of(&format!("{}{}", term, suffix)));
                }

                groups.push(SuffixGroup { suffix, indices });
            }

            let mut search = vec![def.mandatory.clone()];
            search.extend(def.additional.iter().cloned());

            CachedGroup::Multiple { search, groups }
        };

        self.entries.insert(def.name.clone(), cached);
    }

    /// Extract a group's values from a record. `trim_suffixes` controls
    /// whether the keys of a `Multiple` group keep their suffix appended.
    pub(crate) fn resolve(
        &self,
        name: &str,
        record: &Record,
        trim_suffixes: bool,
    ) -> Option<GroupData> {
        match self.entries.get(name)? {
            CachedGroup::Single { indices } => {
                let values = indices
                    .iter()
                    .filter_map(|&index| record.cell(index))
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
                    .collect();

                Some(GroupData::Single(values))
            }
            CachedGroup::Multiple { search, groups } => {
                let maps = groups
                    .iter()
                    .map(|group| {
                        search
                            .iter()
                            .zip(group.indices.iter())
                            .filter_map(|(term, index)| {
                                let value = record.cell((*index)?)?.to_string();

                                let key = if trim_suffixes {
                                    term.clone()
                                } else {
                                    format!("{}{}", term, group.suffix)
                                };

                                Some((key, value))
                            })
                            .collect()
                    })
                    .collect();

                Some(GroupData::Multiple(maps))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_header() -> Header {
        let mut header = Header::default();
        header
            .set(
                [
                    "Specification 1",
                    "Value 1",
                    "UOM 1",
                    "Specification 2",
                    "Value 2",
                    "UOM 2",
                    "Specification 3",
                    "Value 3",
                    "UOM 3",
                ]
                .iter()
                .map(|n| n.to_string())
                .collect(),
                false,
            )
            .unwrap();
        header
    }

    fn spec_record() -> Record {
        Record::from(["Length", "20", "in", "Height", "30", "in", "Weight", "100", "lb"])
    }

    #[test]
    fn test_correlated_grouping() {
        let header = spec_header();

        let mut cache = GroupCache::default();
        cache.define(&header, "specs", "Specification", &["Value", "UOM"]);

        let maps = cache
            .resolve("specs", &spec_record(), true)
            .unwrap()
            .maps()
            .unwrap();

        assert_eq!(maps.len(), 3);
        assert_eq!(
            maps[1],
            vec![
                ("Specification".to_string(), "Height".to_string()),
                ("Value".to_string(), "30".to_string()),
                ("UOM".to_string(), "in".to_string()),
            ]
        );
    }

    #[test]
    fn test_correlated_grouping_keeping_suffixes() {
        let header = spec_header();

        let mut cache = GroupCache::default();
        cache.define(&header, "specs", "Specification", &["Value", "UOM"]);

        let maps = cache
            .resolve("specs", &spec_record(), false)
            .unwrap()
            .maps()
            .unwrap();

        assert_eq!(
            maps[2],
            vec![
                ("Specification 3".to_string(), "Weight".to_string()),
                ("Value 3".to_string(), "100".to_string()),
                ("UOM 3".to_string(), "lb".to_string()),
            ]
        );
    }

    #[test]
    fn test_single_grouping_skips_empty_values() {
        let header = spec_header();

        let mut cache = GroupCache::default();
        cache.define(&header, "specs", "Specification", &[]);

        let values = cache
            .resolve("specs", &spec_record(), true)
            .unwrap()
            .values()
            .unwrap();

        assert_eq!(values, vec!["Length", "Height", "Weight"]);

        let sparse = Record::from(["Length", "20", "in", "", "30", "in", "Weight", "100", "lb"]);
        let values = cache
            .resolve("specs", &sparse, true)
            .unwrap()
            .values()
            .unwrap();

        assert_eq!(values, vec!["Length", "Weight"]);
    }

    #[test]
    fn test_resolving_is_deterministic() {
        let header = spec_header();
        let record = spec_record();

        let mut cache = GroupCache::default();
        cache.define(&header, "specs", "Specification", &["Value", "UOM"]);

        let first = cache.resolve("specs", &record, true);
        let second = cache.resolve("specs", &record, true);

        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_group_and_no_matches() {
        let mut header = Header::default();
        header.set(vec!["testing".to_string()], false).unwrap();

        let mut cache = GroupCache::default();
        cache.define(&header, "selling_props", "selling-prop-", &[]);

        let record = Record::from(["woop woop"]);

        assert_eq!(
            cache.resolve("selling_props", &record, true),
            Some(GroupData::Single(Vec::new()))
        );
        assert_eq!(cache.resolve("nope", &record, true), None);
    }

    #[test]
    fn test_prefix_match_is_literal() {
        let mut header = Header::default();
        header
            .set(
                vec!["Spec".to_string(), "Specifications".to_string(), "spec".to_string()],
                false,
            )
            .unwrap();

        let mut cache = GroupCache::default();
        cache.define(&header, "g", "Spec", &[]);

        let record = Record::from(["a", "b", "c"]);

        // Case-sensitive leading-substring test: "spec" is out,
        // "Specifications" is in.
        assert_eq!(
            cache.resolve("g", &record, true).unwrap().values().unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_definition_before_header_is_replayed() {
        let empty = Header::default();

        let mut cache = GroupCache::default();
        cache.define(&empty, "specs", "Specification", &[]);

        assert_eq!(cache.resolve("specs", &spec_record(), true), None);

        cache.rebuild(&spec_header());

        assert_eq!(
            cache
                .resolve("specs", &spec_record(), true)
                .unwrap()
                .values()
                .unwrap(),
            vec!["Length", "Height", "Weight"]
        );
    }
}
