//! Resource contract
//!
//! Each API resource describes itself with a static field-metadata table:
//! public field name, read/write serialization groups, value kind and the
//! collection filter it supports. The generic view and filter code in this
//! module's children only ever looks at that table.

pub mod filter;
pub mod treasure;
pub mod user;
pub mod view;

pub use filter::{CollectionQuery, FilterCondition, RangeBound};
pub use treasure::{Treasure, TreasureProperty};
pub use user::{User, UserProperty};
pub use view::{CollectionView, FieldValue, PropertySelection, ReadView, WriteView};

use crate::errors::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Debug;

/// Serialization group controlling field visibility in a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Group {
    #[serde(rename = "treasure:read")]
    TreasureRead,
    #[serde(rename = "treasure:write")]
    TreasureWrite,
    #[serde(rename = "treasure:item:get")]
    TreasureItemGet,
    #[serde(rename = "user:read")]
    UserRead,
    #[serde(rename = "user:write")]
    UserWrite,
}

impl Group {
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::TreasureRead => "treasure:read",
            Group::TreasureWrite => "treasure:write",
            Group::TreasureItemGet => "treasure:item:get",
            Group::UserRead => "user:read",
            Group::UserWrite => "user:write",
        }
    }
}

/// Collection filter attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    /// `?name=gold` matches any value containing the term
    SearchPartial,
    /// `?value[gt]=10`, `?value[between]=10..20`
    Range,
    /// `?isPublished=true`
    Boolean,
}

/// Wire type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Text,
    Bool,
    DateTime,
    /// Reference to another resource, written and read as `{path}/{id}`
    Iri(&'static str),
    /// Embedded list of another resource
    Collection,
}

impl ValueKind {
    /// Name used in type-mismatch messages and documentation
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Text => "string",
            ValueKind::Bool => "bool",
            ValueKind::DateTime => "datetime",
            ValueKind::Iri(_) => "iri",
            ValueKind::Collection => "array",
        }
    }
}

/// One row of a resource's field-metadata table
#[derive(Debug, Clone, Copy)]
pub struct FieldMeta<P: 'static> {
    /// Public (serialized) name
    pub name: &'static str,
    pub property: P,
    pub kind: ValueKind,
    /// The identifier is part of every read view
    pub identifier: bool,
    pub read_groups: &'static [Group],
    pub write_groups: &'static [Group],
    pub filter: Option<FilterKind>,
    pub description: Option<&'static str>,
}

impl<P> FieldMeta<P> {
    pub fn readable_in(&self, groups: &[Group]) -> bool {
        self.identifier || self.read_groups.iter().any(|g| groups.contains(g))
    }

    pub fn writable_in(&self, groups: &[Group]) -> bool {
        !self.identifier && self.write_groups.iter().any(|g| groups.contains(g))
    }
}

/// HTTP operation exposed for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Get,
    GetCollection,
    Post,
    Put,
    Patch,
}

impl OperationKind {
    pub fn method(&self) -> &'static str {
        match self {
            OperationKind::Get | OperationKind::GetCollection => "GET",
            OperationKind::Post => "POST",
            OperationKind::Put => "PUT",
            OperationKind::Patch => "PATCH",
        }
    }

    /// Operations addressed at a single item (`{path}/{id}`)
    pub fn is_item(&self) -> bool {
        !matches!(self, OperationKind::GetCollection | OperationKind::Post)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub kind: OperationKind,
    /// Overrides the resource's normalization groups for this operation
    pub normalization_groups: Option<&'static [Group]>,
}

impl Operation {
    pub const fn new(kind: OperationKind) -> Self {
        Self { kind, normalization_groups: None }
    }

    pub const fn with_groups(kind: OperationKind, groups: &'static [Group]) -> Self {
        Self { kind, normalization_groups: Some(groups) }
    }
}

/// Response format a resource declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub name: &'static str,
    pub mime_type: &'static str,
}

/// Resource-level metadata
#[derive(Debug, Clone, Copy)]
pub struct ResourceMetadata {
    pub short_name: &'static str,
    pub description: &'static str,
    /// Collection path, also the IRI prefix of items
    pub path: &'static str,
    pub operations: &'static [Operation],
    pub formats: &'static [Format],
    pub items_per_page: u64,
    pub normalization_groups: &'static [Group],
    pub denormalization_groups: &'static [Group],
    /// Whether `properties[]=...` may reduce the returned field set
    pub property_filter: bool,
}

impl ResourceMetadata {
    pub fn operation(&self, kind: OperationKind) -> Option<&Operation> {
        self.operations.iter().find(|op| op.kind == kind)
    }

    /// Groups used to serialize the response of `kind`
    pub fn read_groups(&self, kind: OperationKind) -> &'static [Group] {
        self.operation(kind)
            .and_then(|op| op.normalization_groups)
            .unwrap_or(self.normalization_groups)
    }

    pub fn item_iri(&self, id: i32) -> String {
        format!("{}/{}", self.path, id)
    }

    /// Parse `{path}/{id}` back into the id
    pub fn parse_iri(&self, iri: &str) -> Option<i32> {
        iri.strip_prefix(self.path)?
            .strip_prefix('/')?
            .parse()
            .ok()
    }
}

/// A type exposed through the API, described by its field table
pub trait ApiResource: Sized {
    type Property: Copy + Eq + Debug + 'static;

    fn metadata() -> &'static ResourceMetadata;

    fn fields() -> &'static [FieldMeta<Self::Property>];

    fn id(&self) -> Option<i32>;

    /// Current value of `property`, `Value::Null` when unset
    fn read_property(&self, property: Self::Property) -> Value;

    /// Store an already type-checked value through the property's setter
    fn write_property(&mut self, property: Self::Property, value: FieldValue) -> Result<()>;

    fn iri(&self) -> Option<String> {
        self.id().map(|id| Self::metadata().item_iri(id))
    }
}

/// Describe a resource (fields, groups, filters, operations) as JSON
pub fn documentation<R: ApiResource>() -> Value {
    let meta = R::metadata();

    let operations: Vec<Value> = meta
        .operations
        .iter()
        .map(|op| {
            let path = if op.kind.is_item() {
                format!("{}/{{id}}", meta.path)
            } else {
                meta.path.to_string()
            };
            json!({
                "method": op.kind.method(),
                "path": path,
                "normalizationGroups": meta.read_groups(op.kind),
            })
        })
        .collect();

    let fields: Vec<Value> = R::fields()
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "type": f.kind.type_name(),
                "identifier": f.identifier,
                "readGroups": f.read_groups,
                "writeGroups": f.write_groups,
                "filter": f.filter,
                "description": f.description,
            })
        })
        .collect();

    let formats: serde_json::Map<String, Value> = meta
        .formats
        .iter()
        .map(|f| (f.name.to_string(), Value::String(f.mime_type.to_string())))
        .collect();

    json!({
        "shortName": meta.short_name,
        "description": meta.description,
        "path": meta.path,
        "itemsPerPage": meta.items_per_page,
        "propertyFilter": meta.property_filter,
        "formats": formats,
        "normalizationGroups": meta.normalization_groups,
        "denormalizationGroups": meta.denormalization_groups,
        "operations": operations,
        "fields": fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_names() {
        assert_eq!(Group::TreasureItemGet.as_str(), "treasure:item:get");
        assert_eq!(serde_json::to_value(Group::UserRead).unwrap(), "user:read");
    }

    #[test]
    fn test_iri_round_trip() {
        let meta = Treasure::metadata();
        assert_eq!(meta.item_iri(42), "/api/treasures/42");
        assert_eq!(meta.parse_iri("/api/treasures/42"), Some(42));
        assert_eq!(meta.parse_iri("/api/users/42"), None);
        assert_eq!(meta.parse_iri("/api/treasures/abc"), None);
        assert_eq!(meta.parse_iri("/api/treasures42"), None);
    }

    #[test]
    fn test_item_get_uses_extended_groups() {
        let meta = Treasure::metadata();
        assert_eq!(
            meta.read_groups(OperationKind::Get),
            &[Group::TreasureRead, Group::TreasureItemGet]
        );
        assert_eq!(meta.read_groups(OperationKind::GetCollection), &[Group::TreasureRead]);
        assert_eq!(meta.read_groups(OperationKind::Patch), &[Group::TreasureRead]);
    }

    #[test]
    fn test_documentation_lists_filters_and_formats() {
        let doc = documentation::<Treasure>();
        assert_eq!(doc["shortName"], "Treasure");
        assert_eq!(doc["itemsPerPage"], 10);
        assert_eq!(doc["formats"]["csv"], "text/csv");
        assert_eq!(doc["formats"]["jsonhal"], "application/hal+json");

        let fields = doc["fields"].as_array().unwrap();
        let value = fields.iter().find(|f| f["name"] == "value").unwrap();
        assert_eq!(value["filter"], "range");
        assert_eq!(value["readGroups"], json!(["treasure:read", "user:read"]));

        let get = doc["operations"]
            .as_array()
            .unwrap()
            .iter()
            .find(|op| op["method"] == "GET" && op["path"] == "/api/treasures/{id}")
            .unwrap();
        assert_eq!(get["normalizationGroups"], json!(["treasure:read", "treasure:item:get"]));
    }
}
