//! Column descriptors for table files

use crate::error::{Result, VpfError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data type, keyed by the one-character type code stored in table headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// `I`: 4-byte signed integer
    LongInteger,
    /// `S`: 2-byte signed integer
    ShortInteger,
    /// `F`: 4-byte float
    ShortFloat,
    /// `R`: 8-byte float
    LongFloat,
    /// `C`: 2D coordinate, 4-byte floats
    Coordinate2DFloat,
    /// `Z`: 3D coordinate, 4-byte floats
    Coordinate3DFloat,
    /// `B`: 2D coordinate, 8-byte floats
    Coordinate2DReal,
    /// `Y`: 3D coordinate, 8-byte floats
    Coordinate3DReal,
    /// `K`: triplet id (id, tile id, external id)
    TripletId,
    /// `T`: ASCII text
    Text,
    /// `L`: level 1 (Latin-1) text
    Level1Text,
    /// `N`: level 2 text
    Level2Text,
    /// `M`: level 3 text
    Level3Text,
    /// `D`: 20-character date and time
    Date,
    /// `X`: null field, occupies no bytes
    NullField,
}

/// What a column's values mean once decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticType {
    Integer,
    Float,
    Text,
    Date,
    Geometry,
    Triplet,
    Null,
}

impl ColumnType {
    pub fn from_code(code: char) -> Result<Self> {
        Ok(match code.to_ascii_uppercase() {
            'I' => Self::LongInteger,
            'S' => Self::ShortInteger,
            'F' => Self::ShortFloat,
            'R' => Self::LongFloat,
            'C' => Self::Coordinate2DFloat,
            'Z' => Self::Coordinate3DFloat,
            'B' => Self::Coordinate2DReal,
            'Y' => Self::Coordinate3DReal,
            'K' => Self::TripletId,
            'T' => Self::Text,
            'L' => Self::Level1Text,
            'N' => Self::Level2Text,
            'M' => Self::Level3Text,
            'D' => Self::Date,
            'X' => Self::NullField,
            other => return Err(VpfError::UnknownTypeCode(other)),
        })
    }

    pub fn code(&self) -> char {
        match self {
            Self::LongInteger => 'I',
            Self::ShortInteger => 'S',
            Self::ShortFloat => 'F',
            Self::LongFloat => 'R',
            Self::Coordinate2DFloat => 'C',
            Self::Coordinate3DFloat => 'Z',
            Self::Coordinate2DReal => 'B',
            Self::Coordinate3DReal => 'Y',
            Self::TripletId => 'K',
            Self::Text => 'T',
            Self::Level1Text => 'L',
            Self::Level2Text => 'N',
            Self::Level3Text => 'M',
            Self::Date => 'D',
            Self::NullField => 'X',
        }
    }

    /// Bytes per element. `None` for triplet ids, whose width is stored per value.
    pub fn width(&self) -> Option<usize> {
        match self {
            Self::LongInteger => Some(4),
            Self::ShortInteger => Some(2),
            Self::ShortFloat => Some(4),
            Self::LongFloat => Some(8),
            Self::Coordinate2DFloat => Some(8),
            Self::Coordinate3DFloat => Some(12),
            Self::Coordinate2DReal => Some(16),
            Self::Coordinate3DReal => Some(24),
            Self::TripletId => None,
            Self::Text | Self::Level1Text | Self::Level2Text | Self::Level3Text => Some(1),
            Self::Date => Some(20),
            Self::NullField => Some(0),
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Self::LongInteger | Self::ShortInteger => SemanticType::Integer,
            Self::ShortFloat | Self::LongFloat => SemanticType::Float,
            Self::Coordinate2DFloat
            | Self::Coordinate3DFloat
            | Self::Coordinate2DReal
            | Self::Coordinate3DReal => SemanticType::Geometry,
            Self::TripletId => SemanticType::Triplet,
            Self::Text | Self::Level1Text | Self::Level2Text | Self::Level3Text => {
                SemanticType::Text
            }
            Self::Date => SemanticType::Date,
            Self::NullField => SemanticType::Null,
        }
    }

    pub fn is_text(&self) -> bool {
        self.semantic_type() == SemanticType::Text
    }

    pub fn is_coordinate(&self) -> bool {
        self.semantic_type() == SemanticType::Geometry
    }
}

/// Number of elements per value: a fixed count, or `*` (count stored with each value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementCount {
    Fixed(u32),
    Variable,
}

impl ElementCount {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(Self::Variable);
        }
        raw.parse::<u32>()
            .map(Self::Fixed)
            .map_err(|_| VpfError::header(format!("bad element count '{}'", raw)))
    }

    pub fn fixed(&self) -> Option<u32> {
        match self {
            Self::Fixed(n) => Some(*n),
            Self::Variable => None,
        }
    }
}

impl fmt::Display for ElementCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::Variable => f.write_str("*"),
        }
    }
}

/// Key role a column plays in its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    Primary,
    Unique,
    NonUnique,
}

impl KeyType {
    pub fn from_code(raw: &str) -> Self {
        match raw.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('P') => Self::Primary,
            Some('U') => Self::Unique,
            _ => Self::NonUnique,
        }
    }
}

/// Column definition (immutable once built)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, lowercased
    pub name: String,
    pub column_type: ColumnType,
    pub element_count: ElementCount,
    pub key_type: KeyType,
    pub description: String,
    /// Value description table, when the header names one
    pub value_description_table: Option<String>,
    pub thematic_index: Option<String>,
    pub narrative_table: Option<String>,
    /// Values may need resolving through a value description table
    pub lookup: bool,
}

impl Column {
    pub fn new(name: &str, column_type: ColumnType, element_count: ElementCount) -> Self {
        Self {
            name: name.trim().to_ascii_lowercase(),
            column_type,
            element_count,
            key_type: KeyType::NonUnique,
            description: String::new(),
            value_description_table: None,
            thematic_index: None,
            narrative_table: None,
            lookup: column_type == ColumnType::ShortInteger,
        }
    }

    /// The single geometry column of a merged feature schema
    pub fn geometry(name: &str) -> Self {
        Self::new(name, ColumnType::Coordinate2DReal, ElementCount::Variable)
    }

    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.column_type.semantic_type()
    }

    /// Fixed on-disk size of one value; `None` when the width varies per row
    pub fn byte_size(&self) -> Option<usize> {
        let width = self.column_type.width()?;
        let count = self.element_count.fixed()?;
        Some(width * count as usize)
    }

    pub fn is_id(&self) -> bool {
        self.name == "id"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        for code in "ISFRCZBYKTLNMDX".chars() {
            let ty = ColumnType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
        assert_eq!(ColumnType::from_code('i').unwrap(), ColumnType::LongInteger);
        assert!(matches!(ColumnType::from_code('Q'), Err(VpfError::UnknownTypeCode('Q'))));
    }

    #[test]
    fn test_coordinates_are_geometry() {
        assert_eq!(ColumnType::Coordinate2DFloat.semantic_type(), SemanticType::Geometry);
        assert_eq!(ColumnType::Coordinate3DReal.semantic_type(), SemanticType::Geometry);
        assert_eq!(ColumnType::LongFloat.semantic_type(), SemanticType::Float);
    }

    #[test]
    fn test_byte_size() {
        let col = Column::new("f_code", ColumnType::Text, ElementCount::Fixed(5));
        assert_eq!(col.byte_size(), Some(5));

        let col = Column::new("coordinate", ColumnType::Coordinate3DFloat, ElementCount::Fixed(2));
        assert_eq!(col.byte_size(), Some(24));

        let col = Column::new("coordinates", ColumnType::Coordinate2DFloat, ElementCount::Variable);
        assert_eq!(col.byte_size(), None);

        let col = Column::new("left_face", ColumnType::TripletId, ElementCount::Fixed(1));
        assert_eq!(col.byte_size(), None);
    }

    #[test]
    fn test_lookup_flag_only_for_short_integer() {
        assert!(Column::new("exs", ColumnType::ShortInteger, ElementCount::Fixed(1)).lookup);
        assert!(!Column::new("id", ColumnType::LongInteger, ElementCount::Fixed(1)).lookup);
        assert!(!Column::new("nam", ColumnType::Text, ElementCount::Variable).lookup);
    }

    #[test]
    fn test_names_are_lowercased() {
        let col = Column::new(" F_CODE ", ColumnType::Text, ElementCount::Fixed(5));
        assert_eq!(col.name, "f_code");
    }
}
