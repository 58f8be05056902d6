//! Read and write projections driven by the field-metadata table

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{ApiResource, Group, ValueKind};
use crate::errors::{AppError, Result};

/// A type-checked value accepted from a write payload
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Text(String),
    Bool(bool),
    DateTime(DateTime<Utc>),
    /// Id parsed from an IRI; `None` for an explicit `null`
    Reference(Option<i32>),
}

/// Fields requested through `properties[]=...`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertySelection(Vec<String>);

impl PropertySelection {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Collect `properties[]=a&properties[]=b` (or `properties=a,b`) from
    /// decoded query pairs. `None` when the caller did not ask for a selection.
    pub fn from_query(pairs: &[(String, String)]) -> Option<Self> {
        let names: Vec<String> = pairs
            .iter()
            .filter(|(key, _)| key == "properties[]" || key == "properties")
            .flat_map(|(_, value)| value.split(','))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            None
        } else {
            Some(Self(names))
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }
}

/// Serialized representation of a resource for a set of groups
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ReadView(Map<String, Value>);

impl ReadView {
    /// Emit every field readable in `groups`, narrowed by `selection`.
    ///
    /// The identifier is emitted whenever it is set, regardless of groups or
    /// selection.
    pub fn project<R: ApiResource>(
        resource: &R,
        groups: &[Group],
        selection: Option<&PropertySelection>,
    ) -> Self {
        let mut out = Map::new();

        for field in R::fields() {
            if !field.readable_in(groups) {
                continue;
            }
            if field.identifier {
                if let Some(id) = resource.id() {
                    out.insert(field.name.to_string(), Value::from(id));
                }
                continue;
            }
            if selection.is_some_and(|s| !s.allows(field.name)) {
                continue;
            }
            out.insert(field.name.to_string(), resource.read_property(field.property));
        }

        Self(out)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// The writable subset of a request payload, already type-checked
#[derive(Debug, Clone)]
pub struct WriteView<R: ApiResource> {
    values: Vec<(R::Property, FieldValue)>,
}

impl<R: ApiResource> WriteView<R> {
    /// Keep the payload keys writable in `groups`; anything else is ignored.
    pub fn parse(payload: &Value, groups: &[Group]) -> Result<Self> {
        let object = payload.as_object().ok_or_else(|| AppError::InvalidFormat {
            message: format!(
                "The input data must be a JSON object, \"{}\" given.",
                json_type(payload)
            ),
        })?;

        let mut values = Vec::new();
        for field in R::fields() {
            if !field.writable_in(groups) {
                continue;
            }
            if let Some(raw) = object.get(field.name) {
                values.push((field.property, coerce(field.name, field.kind, raw)?));
            }
        }

        Ok(Self { values })
    }

    /// Write every accepted value through the resource's setters
    pub fn apply(self, resource: &mut R) -> Result<()> {
        for (property, value) in self.values {
            resource.write_property(property, value)?;
        }
        Ok(())
    }

    pub fn get(&self, property: R::Property) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(name: &str, kind: ValueKind, raw: &Value) -> AppError {
    AppError::InvalidFormat {
        message: format!(
            "The type of the \"{}\" attribute must be \"{}\", \"{}\" given.",
            name,
            kind.type_name(),
            json_type(raw)
        ),
    }
}

fn coerce(name: &str, kind: ValueKind, raw: &Value) -> Result<FieldValue> {
    match (kind, raw) {
        (ValueKind::Int, Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(FieldValue::Int)
            .ok_or_else(|| type_error(name, kind, raw)),
        (ValueKind::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
        (ValueKind::Bool, Value::Bool(b)) => Ok(FieldValue::Bool(*b)),
        (ValueKind::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| FieldValue::DateTime(dt.with_timezone(&Utc)))
            .map_err(|_| AppError::InvalidFormat {
                message: format!("The \"{}\" attribute must be an RFC 3339 date, \"{}\" given.", name, s),
            }),
        (ValueKind::Iri(_), Value::Null) => Ok(FieldValue::Reference(None)),
        (ValueKind::Iri(prefix), Value::String(iri)) => iri
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|id| id.parse::<i32>().ok())
            .map(|id| FieldValue::Reference(Some(id)))
            .ok_or_else(|| AppError::Validation {
                message: format!("Invalid IRI \"{}\".", iri),
                field: Some(name.to_string()),
            }),
        _ => Err(type_error(name, kind, raw)),
    }
}

/// One page of a collection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub member: Vec<ReadView>,
    pub total_items: u64,
    pub page: u64,
    pub items_per_page: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl CollectionView {
    /// `raw_query` is the request's undecoded query string; every parameter
    /// except `page` is carried over into the `next`/`previous` links.
    pub fn new(
        path: &str,
        raw_query: Option<&str>,
        member: Vec<ReadView>,
        total_items: u64,
        page: u64,
        items_per_page: u64,
    ) -> Self {
        let last_page = total_items.div_ceil(items_per_page.max(1)).max(1);
        let link = |target: u64| page_link(path, raw_query, target);

        Self {
            member,
            total_items,
            page,
            items_per_page,
            next: (page < last_page).then(|| link(page + 1)),
            previous: (page > 1).then(|| link(page - 1)),
        }
    }
}

fn page_link(path: &str, raw_query: Option<&str>, page: u64) -> String {
    let mut params: Vec<&str> = raw_query
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty() && *p != "page" && !p.starts_with("page="))
        .collect();
    let page_param = format!("page={}", page);
    params.push(&page_param);
    format!("{}?{}", path, params.join("&"))
}
