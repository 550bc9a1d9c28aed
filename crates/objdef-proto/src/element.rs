//! Element references: typed handles to objects, assets and documents.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// The category of a referencable element.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A data object.
    Object,
    /// An asset (image, video, file, ...).
    Asset,
    /// A document (page, snippet, email, ...).
    Document,
}

impl ElementKind {
    /// All kinds, in query-column enum order.
    pub const ALL: [ElementKind; 3] = [ElementKind::Document, ElementKind::Asset, ElementKind::Object];

    /// Textual tag used in storage and query columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Object => "object",
            ElementKind::Asset => "asset",
            ElementKind::Document => "document",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "object" => Ok(ElementKind::Object),
            "asset" => Ok(ElementKind::Asset),
            "document" => Ok(ElementKind::Document),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// A `(kind, id)` handle to one element.
///
/// Two references are equal iff both kind and id match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub struct ElementRef {
    /// Element kind.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Numeric element id.
    pub id: u64,
}

impl ElementRef {
    /// Create a new reference.
    pub fn new(kind: ElementKind, id: u64) -> Self {
        Self { kind, id }
    }

    /// Reference to a data object.
    pub fn object(id: u64) -> Self {
        Self::new(ElementKind::Object, id)
    }

    /// Reference to an asset.
    pub fn asset(id: u64) -> Self {
        Self::new(ElementKind::Asset, id)
    }

    /// Reference to a document.
    pub fn document(id: u64) -> Self {
        Self::new(ElementKind::Document, id)
    }

    /// Dependency key, `"<kind>_<id>"`.
    pub fn dependency_key(&self) -> String {
        format!("{}_{}", self.kind, self.id)
    }

    /// Parse a `"<kind>|<id>"` token.
    ///
    /// Trailing characters after the digits are ignored, so `"asset|17x"`
    /// parses as asset 17.
    pub fn parse_token(token: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidToken(token.to_string());
        let (kind, rest) = token.split_once('|').ok_or_else(invalid)?;
        let kind: ElementKind = kind.parse().map_err(|_| invalid())?;
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        let id = digits.parse().map_err(|_| invalid())?;
        Ok(Self::new(kind, id))
    }

    /// Render as a `"<kind>|<id>"` token.
    pub fn to_token(&self) -> String {
        format!("{}|{}", self.kind, self.id)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
