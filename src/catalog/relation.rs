//! Join declarations and the relations built from them

use crate::types::Row;

/// One row of a coverage's feature class schema table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDefinition {
    pub table1: String,
    pub table1_key: String,
    pub table2: String,
    pub table2_key: String,
}

impl JoinDefinition {
    pub fn new(table1: &str, table1_key: &str, table2: &str, table2_key: &str) -> Self {
        Self {
            table1: table1.trim().to_string(),
            table1_key: table1_key.trim().to_string(),
            table2: table2.trim().to_string(),
            table2_key: table2_key.trim().to_string(),
        }
    }

    /// Read `table1`, `table1_key`, `table2`, `table2_key` from a schema table row
    pub fn from_row(row: &Row) -> Option<Self> {
        let text = |name: &str| row.get(name).and_then(|v| v.as_str()).map(str::trim);
        Some(Self::new(
            text("table1")?,
            text("table1_key")?,
            text("table2")?,
            text("table2_key")?,
        ))
    }
}

/// Equality join: rows of the joined table are found by matching
/// `joined_key` against the foreign row's `foreign_key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRelation {
    pub joined_table: String,
    pub joined_key: String,
    /// Column set index of the joined side
    pub joined_set: usize,
    pub foreign_table: String,
    pub foreign_key: String,
    /// Column set index of the foreign side
    pub foreign_set: usize,
}

impl TableRelation {
    /// Same join in either direction, ignoring case
    pub fn is_equivalent(&self, other: &TableRelation) -> bool {
        let same = |a: &str, b: &str| a.eq_ignore_ascii_case(b);
        let forward = same(&self.joined_table, &other.joined_table)
            && same(&self.joined_key, &other.joined_key)
            && same(&self.foreign_table, &other.foreign_table)
            && same(&self.foreign_key, &other.foreign_key);
        let mirror = same(&self.joined_table, &other.foreign_table)
            && same(&self.joined_key, &other.foreign_key)
            && same(&self.foreign_table, &other.joined_table)
            && same(&self.foreign_key, &other.joined_key);
        forward || mirror
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(joined: (&str, &str), foreign: (&str, &str)) -> TableRelation {
        TableRelation {
            joined_table: joined.0.into(),
            joined_key: joined.1.into(),
            joined_set: 1,
            foreign_table: foreign.0.into(),
            foreign_key: foreign.1.into(),
            foreign_set: 0,
        }
    }

    #[test]
    fn test_mirror_relations_are_equivalent() {
        let a = relation(("edg", "id"), ("roadl.lft", "edg_id"));
        let b = relation(("ROADL.LFT", "EDG_ID"), ("EDG", "ID"));
        let c = relation(("edg", "id"), ("roadl.lft", "other_id"));
        assert!(a.is_equivalent(&a));
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }
}
