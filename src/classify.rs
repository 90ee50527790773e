/// Display categories
///
/// Rows are colored and grouped by a coarse value kind. The mapping from type
/// names to categories is pure and total: every input lands in exactly one of
/// twelve buckets, with `Other` as the catch-all.

use serde::{Deserialize, Serialize};

/// Extra classification for array-library values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpecializedKind {
    Array,
    Scalar,
    #[default]
    Unknown,
}

/// Coarse value kind used for row coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayCategory {
    Boolean,
    Numeric,
    Text,
    Temporal,
    Sequence,
    Set,
    TupleLike,
    Mapping,
    Array,
    Table,
    Image,
    Other,
}

impl DisplayCategory {
    pub const ALL: [DisplayCategory; 12] = [
        DisplayCategory::Boolean,
        DisplayCategory::Numeric,
        DisplayCategory::Text,
        DisplayCategory::Temporal,
        DisplayCategory::Sequence,
        DisplayCategory::Set,
        DisplayCategory::TupleLike,
        DisplayCategory::Mapping,
        DisplayCategory::Array,
        DisplayCategory::Table,
        DisplayCategory::Image,
        DisplayCategory::Other,
    ];

    /// Palette slot, 1-based
    pub fn group(&self) -> usize {
        match self {
            DisplayCategory::Boolean => 1,
            DisplayCategory::Numeric => 2,
            DisplayCategory::Text => 3,
            DisplayCategory::Temporal => 4,
            DisplayCategory::Sequence => 5,
            DisplayCategory::Set => 6,
            DisplayCategory::TupleLike => 7,
            DisplayCategory::Mapping => 8,
            DisplayCategory::Array => 9,
            DisplayCategory::Table => 10,
            DisplayCategory::Image => 11,
            DisplayCategory::Other => 12,
        }
    }
}

/// Maps a runtime type name plus its specialized kind to a category.
///
/// A known specialized kind wins over the type name.
pub fn classify(type_name: &str, specialized: SpecializedKind) -> DisplayCategory {
    match specialized {
        SpecializedKind::Array => return DisplayCategory::Array,
        SpecializedKind::Scalar => return DisplayCategory::Numeric,
        SpecializedKind::Unknown => {}
    }

    match type_name {
        "bool" => DisplayCategory::Boolean,
        "int" | "float" | "complex" => DisplayCategory::Numeric,
        "str" | "unicode" => DisplayCategory::Text,
        t if t.contains("datetime") || t == "date" => DisplayCategory::Temporal,
        "list" => DisplayCategory::Sequence,
        "set" | "frozenset" => DisplayCategory::Set,
        "tuple" => DisplayCategory::TupleLike,
        "dict" => DisplayCategory::Mapping,
        "MaskedArray" | "Matrix" | "NDArray" => DisplayCategory::Array,
        "DataFrame" | "Series" => DisplayCategory::Table,
        t if t.contains("Index") => DisplayCategory::Table,
        "PIL.Image.Image" => DisplayCategory::Image,
        _ => DisplayCategory::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        let u = SpecializedKind::Unknown;
        assert_eq!(classify("bool", u), DisplayCategory::Boolean);
        assert_eq!(classify("int", u), DisplayCategory::Numeric);
        assert_eq!(classify("complex", u), DisplayCategory::Numeric);
        assert_eq!(classify("str", u), DisplayCategory::Text);
        assert_eq!(classify("datetime", u), DisplayCategory::Temporal);
        assert_eq!(classify("date", u), DisplayCategory::Temporal);
        assert_eq!(classify("list", u), DisplayCategory::Sequence);
        assert_eq!(classify("frozenset", u), DisplayCategory::Set);
        assert_eq!(classify("tuple", u), DisplayCategory::TupleLike);
        assert_eq!(classify("dict", u), DisplayCategory::Mapping);
    }

    #[test]
    fn test_library_types() {
        let u = SpecializedKind::Unknown;
        assert_eq!(classify("NDArray", u), DisplayCategory::Array);
        assert_eq!(classify("DataFrame", u), DisplayCategory::Table);
        assert_eq!(classify("DatetimeIndex", u), DisplayCategory::Table);
        assert_eq!(classify("datetime64", u), DisplayCategory::Temporal);
        assert_eq!(classify("RangeIndex", u), DisplayCategory::Table);
        assert_eq!(classify("PIL.Image.Image", u), DisplayCategory::Image);
    }

    #[test]
    fn test_specialized_kind_takes_precedence() {
        assert_eq!(classify("float64", SpecializedKind::Scalar), DisplayCategory::Numeric);
        assert_eq!(classify("dict", SpecializedKind::Array), DisplayCategory::Array);
    }

    #[test]
    fn test_unmatched_is_other() {
        assert_eq!(classify("Foobar", SpecializedKind::Unknown), DisplayCategory::Other);
        assert_eq!(classify("", SpecializedKind::Unknown), DisplayCategory::Other);
    }

    #[test]
    fn test_groups_are_distinct() {
        let mut groups: Vec<usize> = DisplayCategory::ALL.iter().map(|c| c.group()).collect();
        groups.dedup();
        assert_eq!(groups, (1..=12).collect::<Vec<_>>());
    }
}
