//! Field definitions.
//!
//! A [`FieldDefinition`] is one of a closed set of field types, tagged by
//! `fieldtype` in its JSON form. The tag is the enum variant, so it cannot
//! change after construction; the per-type configuration is reachable only
//! through setters that normalize their input.

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::config::RequestContext;
use crate::error::{Error, Result};
use crate::field::{
    DefinitionHooks, FieldType, IdRewriter, Input, LazyLoadable, ManyToOneRelation, Multiselect,
    Normalizable, Numeric, SetAlgebra,
};

use super::options::OptionsProviderRegistry;

/// Settings every field definition carries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCommon {
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    mandatory: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    tooltip: String,
}

impl FieldCommon {
    /// Create common settings for a field name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether a value is required.
    pub fn mandatory(&self) -> bool {
        self.mandatory
    }

    /// Tooltip text.
    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    /// Set the display title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Set whether a value is required.
    pub fn set_mandatory(&mut self, mandatory: bool) {
        self.mandatory = mandatory;
    }

    /// Set the tooltip text.
    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) {
        self.tooltip = tooltip.into();
    }
}

/// A layout dimension: pixels, or any other CSS length.
///
/// Numeric strings are coerced to pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dimension {
    /// Width/height in pixels; 0 means automatic.
    Pixels(u32),
    /// Any other CSS length such as `50%`.
    Css(String),
}

impl Dimension {
    /// Parse a raw dimension.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Dimension::Pixels(0);
        }
        if let Ok(px) = trimmed.parse::<u32>() {
            return Dimension::Pixels(px);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f >= 0.0 && f <= u32::MAX as f64 => Dimension::Pixels(f as u32),
            _ => Dimension::Css(trimmed.to_string()),
        }
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Dimension::Pixels(0)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{}", px),
            Dimension::Css(css) => f.write_str(css),
        }
    }
}

impl From<u32> for Dimension {
    fn from(px: u32) -> Self {
        Dimension::Pixels(px)
    }
}

impl From<&str> for Dimension {
    fn from(raw: &str) -> Self {
        Dimension::parse(raw)
    }
}

impl From<String> for Dimension {
    fn from(raw: String) -> Self {
        Dimension::parse(&raw)
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Dimension::Pixels(px) => serializer.serialize_u32(*px),
            Dimension::Css(css) => serializer.serialize_str(css),
        }
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Option::<RawNumber>::deserialize(deserializer)? {
            None => Ok(Dimension::default()),
            Some(RawNumber::Int(i)) => u32::try_from(i)
                .map(Dimension::Pixels)
                .map_err(|_| de::Error::custom(format!("dimension out of range: {}", i))),
            Some(RawNumber::Float(f)) => Ok(Dimension::parse(&f.to_string())),
            Some(RawNumber::Text(s)) => Ok(Dimension::parse(&s)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(u64),
    Float(f64),
    Text(String),
}

/// Integer cast used by count-like settings: empty or absent means unset.
pub fn parse_integer_cast(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<u32>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u32))
}

/// Lenient `Option<u32>` deserializer: numbers, numeric strings, `""` and null.
pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawNumber::Int(i)) => u32::try_from(i)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("integer out of range: {}", i))),
        Some(RawNumber::Float(f)) if f >= 0.0 => Ok(Some(f as u32)),
        Some(RawNumber::Float(f)) => Err(de::Error::custom(format!("negative integer: {}", f))),
        Some(RawNumber::Text(s)) => {
            if s.trim().is_empty() {
                return Ok(None);
            }
            parse_integer_cast(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("expected an integer, got {:?}", s)))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AllowedTypeEntry {
    Name(String),
    Keyed(std::collections::BTreeMap<String, String>),
}

/// Normalize an allowed-subtype list: trimmed, non-empty, first occurrence kept.
pub fn normalize_allowed_types<I, S>(types: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    types
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Allowed-subtype list deserializer accepting plain names or keyed objects
/// such as `{"assetTypes": "image"}`.
pub(crate) fn allowed_types<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<AllowedTypeEntry>>::deserialize(deserializer)?.unwrap_or_default();
    let names = entries.into_iter().filter_map(|entry| match entry {
        AllowedTypeEntry::Name(name) => Some(name),
        AllowedTypeEntry::Keyed(map) => map.into_values().next(),
    });
    Ok(normalize_allowed_types(names))
}

/// A field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fieldtype")]
pub enum FieldDefinition {
    /// Single-line text.
    #[serde(rename = "input")]
    Input(Input),
    /// Number.
    #[serde(rename = "numeric")]
    Numeric(Numeric),
    /// Multiple selection from an option catalog.
    #[serde(rename = "multiselect")]
    Multiselect(Multiselect),
    /// Single reference to an object, asset or document.
    #[serde(rename = "manyToOneRelation")]
    ManyToOneRelation(ManyToOneRelation),
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            FieldDefinition::Input($f) => $body,
            FieldDefinition::Numeric($f) => $body,
            FieldDefinition::Multiselect($f) => $body,
            FieldDefinition::ManyToOneRelation($f) => $body,
        }
    };
}

impl FieldDefinition {
    /// The field type contract.
    pub fn field_type(&self) -> &dyn FieldType {
        dispatch!(self, f => f as &dyn FieldType)
    }

    /// Normal form conversion.
    pub fn as_normalizable(&self) -> &dyn Normalizable {
        dispatch!(self, f => f as &dyn Normalizable)
    }

    /// Lazy loading, for fields stored outside the object row.
    pub fn as_lazy_loadable(&self) -> Option<&dyn LazyLoadable> {
        match self {
            FieldDefinition::ManyToOneRelation(f) => Some(f),
            _ => None,
        }
    }

    /// Id rewriting, for reference fields.
    pub fn as_id_rewriter(&self) -> Option<&dyn IdRewriter> {
        match self {
            FieldDefinition::ManyToOneRelation(f) => Some(f),
            _ => None,
        }
    }

    /// Set algebra, for multi-value fields.
    pub fn as_set_algebra(&self) -> Option<&dyn SetAlgebra> {
        match self {
            FieldDefinition::Multiselect(f) => Some(f),
            _ => None,
        }
    }

    /// Multiselect definition.
    pub fn as_multiselect(&self) -> Option<&Multiselect> {
        match self {
            FieldDefinition::Multiselect(f) => Some(f),
            _ => None,
        }
    }

    /// Relation definition.
    pub fn as_relation(&self) -> Option<&ManyToOneRelation> {
        match self {
            FieldDefinition::ManyToOneRelation(f) => Some(f),
            _ => None,
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        self.field_type().name()
    }

    /// Fieldtype tag.
    pub fn fieldtype(&self) -> &'static str {
        self.field_type().fieldtype()
    }

    /// Common settings.
    pub fn common(&self) -> &FieldCommon {
        dispatch!(self, f => f.common())
    }

    /// Common settings, mutable.
    pub fn common_mut(&mut self) -> &mut FieldCommon {
        dispatch!(self, f => f.common_mut())
    }

    /// Definition-save checks.
    pub fn pre_save(&self, providers: &OptionsProviderRegistry) -> Result<()> {
        dispatch!(self, f => f.pre_save(providers))
    }

    /// Copy shared settings from a master definition of the same fieldtype.
    pub fn synchronize_with_master(&mut self, master: &FieldDefinition) -> Result<()> {
        match (self, master) {
            (FieldDefinition::Input(f), FieldDefinition::Input(m)) => f.synchronize_with_master(m),
            (FieldDefinition::Numeric(f), FieldDefinition::Numeric(m)) => {
                f.synchronize_with_master(m)
            }
            (FieldDefinition::Multiselect(f), FieldDefinition::Multiselect(m)) => {
                f.synchronize_with_master(m)
            }
            (FieldDefinition::ManyToOneRelation(f), FieldDefinition::ManyToOneRelation(m)) => {
                f.synchronize_with_master(m)
            }
            (this, master) => {
                return Err(Error::Definition {
                    field: this.name().to_string(),
                    message: format!(
                        "cannot synchronize {} with master of type {}",
                        this.fieldtype(),
                        master.fieldtype()
                    ),
                })
            }
        }
        Ok(())
    }

    /// Copy of this definition as it should be serialized for the request.
    pub fn for_serialization(&self, request: &RequestContext) -> FieldDefinition {
        match self {
            FieldDefinition::Multiselect(f) => {
                FieldDefinition::Multiselect(f.for_serialization(request))
            }
            other => other.clone(),
        }
    }
}

impl From<Input> for FieldDefinition {
    fn from(f: Input) -> Self {
        FieldDefinition::Input(f)
    }
}

impl From<Numeric> for FieldDefinition {
    fn from(f: Numeric) -> Self {
        FieldDefinition::Numeric(f)
    }
}

impl From<Multiselect> for FieldDefinition {
    fn from(f: Multiselect) -> Self {
        FieldDefinition::Multiselect(f)
    }
}

impl From<ManyToOneRelation> for FieldDefinition {
    fn from(f: ManyToOneRelation) -> Self {
        FieldDefinition::ManyToOneRelation(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_coercion() {
        assert_eq!(Dimension::parse("300"), Dimension::Pixels(300));
        assert_eq!(Dimension::parse(" 250 "), Dimension::Pixels(250));
        assert_eq!(Dimension::parse("50%"), Dimension::Css("50%".into()));
        assert_eq!(Dimension::parse(""), Dimension::Pixels(0));

        let d: Dimension = serde_json::from_str("\"400\"").unwrap();
        assert_eq!(d, Dimension::Pixels(400));
        let d: Dimension = serde_json::from_str("120").unwrap();
        assert_eq!(d, Dimension::Pixels(120));
        assert_eq!(serde_json::to_string(&Dimension::Pixels(5)).unwrap(), "5");
    }

    #[test]
    fn test_integer_cast() {
        assert_eq!(parse_integer_cast("3"), Some(3));
        assert_eq!(parse_integer_cast("3.7"), Some(3));
        assert_eq!(parse_integer_cast(""), None);
        assert_eq!(parse_integer_cast("many"), None);
    }

    #[test]
    fn test_normalize_allowed_types() {
        let types = normalize_allowed_types([" image", "video", "", "image"]);
        assert_eq!(types, vec!["image", "video"]);
    }

    #[test]
    fn test_definition_tagging() {
        let json = r#"{
            "fieldtype": "manyToOneRelation",
            "name": "owner",
            "mandatory": true,
            "assetsAllowed": true,
            "assetTypes": [{"assetTypes": "image"}, "video", "image"],
            "width": "300"
        }"#;
        let def: FieldDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.fieldtype(), "manyToOneRelation");
        assert_eq!(def.name(), "owner");
        assert!(def.common().mandatory());

        let relation = def.as_relation().unwrap();
        assert_eq!(relation.asset_types(), ["image", "video"]);
        assert_eq!(relation.width(), &Dimension::Pixels(300));
        assert!(def.as_lazy_loadable().is_some());
        assert!(def.as_set_algebra().is_none());
    }

    #[test]
    fn test_synchronize_mismatch() {
        let mut def = FieldDefinition::from(Multiselect::new("colors"));
        let master = FieldDefinition::from(Input::new("colors"));
        assert!(matches!(
            def.synchronize_with_master(&master),
            Err(Error::Definition { .. })
        ));
    }
}
