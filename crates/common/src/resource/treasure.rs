//! Treasure resource
//!
//! A rare and valuable treasure, owned by a user. Besides the persisted
//! fields it exposes two derived read-only fields: `shortDescription` and
//! `plunderedAtAgo`.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde_json::Value;
use validator::{Validate, ValidationError};

use super::{
    ApiResource, FieldMeta, FieldValue, FilterKind, Format, Group, Operation, OperationKind,
    ResourceMetadata, ValueKind,
};
use crate::db::models::Treasure as TreasureModel;
use crate::errors::{AppError, Result};
use crate::text;

/// Length of `shortDescription`, ellipsis included
pub const SHORT_DESCRIPTION_LENGTH: usize = 40;

pub const NAME_MAX_LENGTH: usize = 50;

const NOT_BLANK: &str = "This value should not be blank.";
const NAME_TOO_LONG: &str = "Describe your loot in 50 chars or less";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreasureProperty {
    Id,
    Name,
    Description,
    /// Write side of `description`: raw text, stored newline-converted
    TextDescription,
    Value,
    CoolFactor,
    PlunderedAt,
    IsPublished,
    Owner,
    ShortDescription,
    PlunderedAtAgo,
}

static METADATA: ResourceMetadata = ResourceMetadata {
    short_name: "Treasure",
    description: "A rare and valuable treasure.",
    path: "/api/treasures",
    operations: &[
        Operation::with_groups(
            OperationKind::Get,
            &[Group::TreasureRead, Group::TreasureItemGet],
        ),
        Operation::new(OperationKind::GetCollection),
        Operation::new(OperationKind::Post),
        Operation::new(OperationKind::Put),
        Operation::new(OperationKind::Patch),
    ],
    formats: &[
        Format { name: "jsonld", mime_type: "application/ld+json" },
        Format { name: "json", mime_type: "application/json" },
        Format { name: "html", mime_type: "text/html" },
        Format { name: "jsonhal", mime_type: "application/hal+json" },
        Format { name: "csv", mime_type: "text/csv" },
    ],
    items_per_page: 10,
    normalization_groups: &[Group::TreasureRead],
    denormalization_groups: &[Group::TreasureWrite],
    property_filter: true,
};

static FIELDS: &[FieldMeta<TreasureProperty>] = &[
    FieldMeta {
        name: "id",
        property: TreasureProperty::Id,
        kind: ValueKind::Int,
        identifier: true,
        read_groups: &[],
        write_groups: &[],
        filter: None,
        description: None,
    },
    FieldMeta {
        name: "name",
        property: TreasureProperty::Name,
        kind: ValueKind::Text,
        identifier: false,
        read_groups: &[Group::TreasureRead, Group::UserRead],
        write_groups: &[Group::TreasureWrite],
        filter: Some(FilterKind::SearchPartial),
        description: None,
    },
    FieldMeta {
        name: "description",
        property: TreasureProperty::Description,
        kind: ValueKind::Text,
        identifier: false,
        read_groups: &[Group::TreasureRead],
        write_groups: &[],
        filter: Some(FilterKind::SearchPartial),
        description: None,
    },
    FieldMeta {
        name: "description",
        property: TreasureProperty::TextDescription,
        kind: ValueKind::Text,
        identifier: false,
        read_groups: &[],
        write_groups: &[Group::TreasureWrite],
        filter: None,
        description: Some("The description of the treasure as raw text"),
    },
    FieldMeta {
        name: "value",
        property: TreasureProperty::Value,
        kind: ValueKind::Int,
        identifier: false,
        read_groups: &[Group::TreasureRead, Group::UserRead],
        write_groups: &[Group::TreasureWrite],
        filter: Some(FilterKind::Range),
        description: Some("The estimated value of this treasure, in gold coins"),
    },
    FieldMeta {
        name: "coolFactor",
        property: TreasureProperty::CoolFactor,
        kind: ValueKind::Int,
        identifier: false,
        read_groups: &[Group::TreasureRead],
        write_groups: &[Group::TreasureWrite],
        filter: None,
        description: None,
    },
    FieldMeta {
        name: "plunderedAt",
        property: TreasureProperty::PlunderedAt,
        kind: ValueKind::DateTime,
        identifier: false,
        read_groups: &[],
        write_groups: &[],
        filter: None,
        description: None,
    },
    FieldMeta {
        name: "isPublished",
        property: TreasureProperty::IsPublished,
        kind: ValueKind::Bool,
        identifier: false,
        read_groups: &[],
        write_groups: &[],
        filter: Some(FilterKind::Boolean),
        description: None,
    },
    FieldMeta {
        name: "owner",
        property: TreasureProperty::Owner,
        kind: ValueKind::Iri("/api/users"),
        identifier: false,
        read_groups: &[Group::TreasureRead],
        write_groups: &[Group::TreasureWrite],
        filter: None,
        description: None,
    },
    FieldMeta {
        name: "shortDescription",
        property: TreasureProperty::ShortDescription,
        kind: ValueKind::Text,
        identifier: false,
        read_groups: &[Group::TreasureRead],
        write_groups: &[],
        filter: None,
        description: None,
    },
    FieldMeta {
        name: "plunderedAtAgo",
        property: TreasureProperty::PlunderedAtAgo,
        kind: ValueKind::Text,
        identifier: false,
        read_groups: &[Group::TreasureRead],
        write_groups: &[],
        filter: None,
        description: Some("A human-readable representation of when this treasure was plundered"),
    },
];

/// Whitespace counts as content; the minimum length is checked separately
fn validate_name(name: &str) -> std::result::Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("not_blank").with_message(Cow::Borrowed(NOT_BLANK)));
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(ValidationError::new("length").with_message(Cow::Borrowed(NAME_TOO_LONG)));
    }

    Ok(())
}

/// A treasure record
///
/// `id` is assigned by the store and has no setter.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct Treasure {
    id: Option<i32>,

    #[validate(
        required(message = "This value should not be blank."),
        custom(function = "validate_name"),
        length(min = 2, message = "This value is too short. It should have 2 characters or more.")
    )]
    name: Option<String>,

    #[validate(required(message = "This value should not be null."))]
    description: Option<String>,

    #[validate(required(message = "This value should not be null."))]
    value: Option<i32>,

    #[validate(required(message = "This value should not be null."))]
    cool_factor: Option<i32>,

    plundered_at: Option<DateTime<Utc>>,

    is_published: Option<bool>,

    /// Id of the owning user
    #[validate(required(message = "This value should not be null."))]
    owner: Option<i32>,
}

impl Default for Treasure {
    fn default() -> Self {
        Self::new()
    }
}

impl Treasure {
    /// A new, unsaved treasure plundered right now
    pub fn new() -> Self {
        Self {
            id: None,
            name: None,
            description: None,
            value: None,
            cool_factor: None,
            plundered_at: Some(Utc::now()),
            is_published: None,
            owner: None,
        }
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Stored description (already newline-converted when written through
    /// `set_text_description`)
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Store `description` verbatim
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Store raw multi-line text with `<br />` before every newline
    pub fn set_text_description(&mut self, description: &str) -> &mut Self {
        self.description = Some(text::nl2br(description));
        self
    }

    /// First 40 characters of the description, ending in `...` when cut
    pub fn short_description(&self) -> String {
        text::truncate(
            self.description().unwrap_or_default(),
            SHORT_DESCRIPTION_LENGTH,
            "...",
        )
    }

    pub fn value(&self) -> Option<i32> {
        self.value
    }

    pub fn set_value(&mut self, value: i32) -> &mut Self {
        self.value = Some(value);
        self
    }

    pub fn cool_factor(&self) -> Option<i32> {
        self.cool_factor
    }

    pub fn set_cool_factor(&mut self, cool_factor: i32) -> &mut Self {
        self.cool_factor = Some(cool_factor);
        self
    }

    pub fn plundered_at(&self) -> Option<DateTime<Utc>> {
        self.plundered_at
    }

    /// Administrative override of the plunder time
    pub fn set_plundered_at(&mut self, plundered_at: Option<DateTime<Utc>>) {
        self.plundered_at = plundered_at;
    }

    /// Relative plunder time ("3 days ago"), computed on every call
    pub fn plundered_at_ago(&self) -> String {
        self.plundered_at
            .as_ref()
            .map(text::time_ago)
            .unwrap_or_default()
    }

    pub fn is_published(&self) -> Option<bool> {
        self.is_published
    }

    /// `None` unpublishes
    pub fn set_is_published(&mut self, is_published: impl Into<Option<bool>>) -> &mut Self {
        self.is_published = Some(is_published.into().unwrap_or(false));
        self
    }

    pub fn owner(&self) -> Option<i32> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<i32>) -> &mut Self {
        self.owner = owner;
        self
    }
}

impl From<TreasureModel> for Treasure {
    fn from(model: TreasureModel) -> Self {
        Self {
            id: Some(model.id),
            name: Some(model.name),
            description: Some(model.description),
            value: Some(model.value),
            cool_factor: Some(model.cool_factor),
            plundered_at: Some(model.plundered_at.with_timezone(&Utc)),
            is_published: Some(model.is_published),
            owner: Some(model.owner_id),
        }
    }
}

impl ApiResource for Treasure {
    type Property = TreasureProperty;

    fn metadata() -> &'static ResourceMetadata {
        &METADATA
    }

    fn fields() -> &'static [FieldMeta<TreasureProperty>] {
        FIELDS
    }

    fn id(&self) -> Option<i32> {
        self.id
    }

    fn read_property(&self, property: TreasureProperty) -> Value {
        match property {
            TreasureProperty::Id => self.id.into(),
            TreasureProperty::Name => self.name.clone().into(),
            TreasureProperty::Description | TreasureProperty::TextDescription => {
                self.description.clone().into()
            }
            TreasureProperty::Value => self.value.into(),
            TreasureProperty::CoolFactor => self.cool_factor.into(),
            TreasureProperty::PlunderedAt => self.plundered_at.map(|dt| dt.to_rfc3339()).into(),
            TreasureProperty::IsPublished => self.is_published.into(),
            TreasureProperty::Owner => self
                .owner
                .map(|id| super::User::metadata().item_iri(id))
                .into(),
            TreasureProperty::ShortDescription => self.short_description().into(),
            TreasureProperty::PlunderedAtAgo => self.plundered_at_ago().into(),
        }
    }

    fn write_property(&mut self, property: TreasureProperty, value: FieldValue) -> Result<()> {
        match (property, value) {
            (TreasureProperty::Name, FieldValue::Text(name)) => {
                self.set_name(name);
            }
            (TreasureProperty::TextDescription, FieldValue::Text(raw)) => {
                self.set_text_description(&raw);
            }
            (TreasureProperty::Description, FieldValue::Text(stored)) => {
                self.set_description(stored);
            }
            (TreasureProperty::Value, FieldValue::Int(value)) => {
                self.set_value(value);
            }
            (TreasureProperty::CoolFactor, FieldValue::Int(cool_factor)) => {
                self.set_cool_factor(cool_factor);
            }
            (TreasureProperty::PlunderedAt, FieldValue::DateTime(at)) => {
                self.set_plundered_at(Some(at));
            }
            (TreasureProperty::IsPublished, FieldValue::Bool(is_published)) => {
                self.set_is_published(is_published);
            }
            (TreasureProperty::Owner, FieldValue::Reference(owner)) => {
                self.set_owner(owner);
            }
            (property, value) => {
                return Err(AppError::Internal {
                    message: format!("cannot write {:?} to treasure property {:?}", value, property),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const NAME_TOO_SHORT: &str = "This value is too short. It should have 2 characters or more.";

    fn valid_treasure() -> Treasure {
        let mut treasure = Treasure::new();
        treasure
            .set_name("Golden Chalice")
            .set_text_description("Shiny.\nVery shiny.")
            .set_value(500)
            .set_cool_factor(8)
            .set_owner(Some(1));
        treasure
    }

    fn violation_messages(treasure: &Treasure) -> Vec<(String, String)> {
        match treasure.validate().map_err(AppError::from) {
            Err(AppError::ConstraintViolation { violations }) => violations
                .into_iter()
                .map(|v| (v.property_path, v.message))
                .collect(),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(()) => Vec::new(),
        }
    }

    #[test]
    fn test_new_stamps_plundered_at() {
        let before = Utc::now();
        let treasure = Treasure::new();
        let after = Utc::now();

        let at = treasure.plundered_at().unwrap();
        assert!(at >= before && at <= after);
        assert!(treasure.id().is_none());
        assert_eq!(treasure.plundered_at_ago(), "a few seconds ago");
    }

    #[test]
    fn test_text_description_converts_newlines() {
        let treasure = valid_treasure();
        assert_eq!(treasure.description(), Some("Shiny.<br />\nVery shiny."));
        assert_eq!(treasure.short_description(), "Shiny.<br />\nVery shiny.");
    }

    #[test]
    fn test_raw_description_setter_is_verbatim() {
        let mut treasure = Treasure::new();
        treasure.set_description("line\nbreak");
        assert_eq!(treasure.description(), Some("line\nbreak"));
    }

    #[test]
    fn test_short_description_truncates() {
        let mut treasure = Treasure::new();
        assert_eq!(treasure.short_description(), "");

        treasure.set_text_description(
            "A cursed amulet that whispers the names of every dragon it has outlived",
        );
        let short = treasure.short_description();
        assert!(short.chars().count() <= 43);
        assert!(short.ends_with("..."));
        assert!(treasure.description().unwrap().starts_with(short.trim_end_matches("...")));
    }

    #[test]
    fn test_plundered_at_ago_is_relative() {
        let mut treasure = Treasure::new();
        treasure.set_plundered_at(Some(Utc::now() - Duration::days(3)));
        assert_eq!(treasure.plundered_at_ago(), "3 days ago");

        treasure.set_plundered_at(None);
        assert_eq!(treasure.plundered_at_ago(), "");
    }

    #[test]
    fn test_set_is_published_defaults_to_false() {
        let mut treasure = Treasure::new();
        assert_eq!(treasure.is_published(), None);

        treasure.set_is_published(true);
        assert_eq!(treasure.is_published(), Some(true));

        treasure.set_is_published(None);
        assert_eq!(treasure.is_published(), Some(false));
    }

    #[test]
    fn test_valid_treasure_passes() {
        assert!(valid_treasure().validate().is_ok());
    }

    #[test]
    fn test_name_length_bounds() {
        for length in [2usize, 3, 25, 49, 50] {
            let mut treasure = valid_treasure();
            treasure.set_name("x".repeat(length));
            assert!(treasure.validate().is_ok(), "length {length} should pass");
        }

        let mut treasure = valid_treasure();
        treasure.set_name("x");
        assert_eq!(
            violation_messages(&treasure),
            vec![("name".to_string(), NAME_TOO_SHORT.to_string())]
        );

        treasure.set_name("x".repeat(51));
        assert_eq!(
            violation_messages(&treasure),
            vec![("name".to_string(), NAME_TOO_LONG.to_string())]
        );
    }

    #[test]
    fn test_empty_name_is_blank_and_too_short() {
        let mut treasure = valid_treasure();
        treasure.set_name("");

        let mut messages: Vec<String> = violation_messages(&treasure)
            .into_iter()
            .map(|(path, message)| {
                assert_eq!(path, "name");
                message
            })
            .collect();
        messages.sort();
        assert_eq!(messages, vec![NAME_TOO_SHORT.to_string(), NOT_BLANK.to_string()]);
    }

    #[test]
    fn test_whitespace_name_is_not_blank() {
        let mut treasure = valid_treasure();
        treasure.set_name("   ");
        assert!(treasure.validate().is_ok());

        treasure.set_name(" ");
        assert_eq!(
            violation_messages(&treasure),
            vec![("name".to_string(), NAME_TOO_SHORT.to_string())]
        );
    }

    #[test]
    fn test_missing_fields_fail() {
        let treasure = Treasure::new();
        let paths: Vec<String> = violation_messages(&treasure)
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec!["coolFactor", "description", "name", "owner", "value"]);
    }

    #[test]
    fn test_read_property_owner_is_iri() {
        let treasure = valid_treasure();
        assert_eq!(treasure.read_property(TreasureProperty::Owner), "/api/users/1");
        assert_eq!(treasure.read_property(TreasureProperty::Id), Value::Null);
    }

    #[test]
    fn test_write_property_rejects_mismatched_value() {
        let mut treasure = Treasure::new();
        let err = treasure
            .write_property(TreasureProperty::Value, FieldValue::Text("lots".into()))
            .unwrap_err();
        assert!(err.is_server_error());
    }
}
