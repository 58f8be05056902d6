//! User resource, the owner side of treasures

use serde_json::Value;
use validator::Validate;

use super::{
    ApiResource, FieldMeta, FieldValue, Group, Operation, OperationKind, ReadView,
    ResourceMetadata, Treasure, ValueKind,
};
use crate::db::models::User as UserModel;
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserProperty {
    Id,
    Username,
    Email,
    DragonTreasures,
}

static METADATA: ResourceMetadata = ResourceMetadata {
    short_name: "User",
    description: "A dragon hoarding treasures.",
    path: "/api/users",
    operations: &[
        Operation::new(OperationKind::Get),
        Operation::new(OperationKind::GetCollection),
        Operation::new(OperationKind::Post),
    ],
    formats: &[
        super::Format { name: "json", mime_type: "application/json" },
    ],
    items_per_page: 10,
    normalization_groups: &[Group::UserRead],
    denormalization_groups: &[Group::UserWrite],
    property_filter: false,
};

static FIELDS: &[FieldMeta<UserProperty>] = &[
    FieldMeta {
        name: "id",
        property: UserProperty::Id,
        kind: ValueKind::Int,
        identifier: true,
        read_groups: &[],
        write_groups: &[],
        filter: None,
        description: None,
    },
    FieldMeta {
        name: "username",
        property: UserProperty::Username,
        kind: ValueKind::Text,
        identifier: false,
        read_groups: &[Group::UserRead],
        write_groups: &[Group::UserWrite],
        filter: None,
        description: None,
    },
    FieldMeta {
        name: "email",
        property: UserProperty::Email,
        kind: ValueKind::Text,
        identifier: false,
        read_groups: &[],
        write_groups: &[Group::UserWrite],
        filter: None,
        description: None,
    },
    FieldMeta {
        name: "dragonTreasures",
        property: UserProperty::DragonTreasures,
        kind: ValueKind::Collection,
        identifier: false,
        read_groups: &[Group::UserRead],
        write_groups: &[],
        filter: None,
        description: Some("Treasures owned by this user"),
    },
];

#[derive(Debug, Clone, PartialEq, Default, Validate)]
pub struct User {
    id: Option<i32>,

    #[validate(
        required(message = "This value should not be blank."),
        length(min = 2, max = 50, message = "Username must be between 2 and 50 characters")
    )]
    username: Option<String>,

    #[validate(
        required(message = "This value should not be blank."),
        email(message = "This value is not a valid email address.")
    )]
    email: Option<String>,

    /// Loaded alongside the user for the `dragonTreasures` field
    treasures: Vec<Treasure>,
}

impl User {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> &mut Self {
        self.username = Some(username.into());
        self
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn set_email(&mut self, email: impl Into<String>) -> &mut Self {
        self.email = Some(email.into());
        self
    }

    pub fn treasures(&self) -> &[Treasure] {
        &self.treasures
    }

    pub fn with_treasures(mut self, treasures: Vec<Treasure>) -> Self {
        self.treasures = treasures;
        self
    }
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: Some(model.id),
            username: Some(model.username),
            email: Some(model.email),
            treasures: Vec::new(),
        }
    }
}

impl ApiResource for User {
    type Property = UserProperty;

    fn metadata() -> &'static ResourceMetadata {
        &METADATA
    }

    fn fields() -> &'static [FieldMeta<UserProperty>] {
        FIELDS
    }

    fn id(&self) -> Option<i32> {
        self.id
    }

    fn read_property(&self, property: UserProperty) -> Value {
        match property {
            UserProperty::Id => self.id.into(),
            UserProperty::Username => self.username.clone().into(),
            UserProperty::Email => self.email.clone().into(),
            // embedded treasures only expose their user:read fields
            UserProperty::DragonTreasures => Value::Array(
                self.treasures
                    .iter()
                    .map(|t| ReadView::project(t, &[Group::UserRead], None).into_value())
                    .collect(),
            ),
        }
    }

    fn write_property(&mut self, property: UserProperty, value: FieldValue) -> Result<()> {
        match (property, value) {
            (UserProperty::Username, FieldValue::Text(username)) => {
                self.set_username(username);
            }
            (UserProperty::Email, FieldValue::Text(email)) => {
                self.set_email(email);
            }
            (property, value) => {
                return Err(AppError::Internal {
                    message: format!("cannot write {:?} to user property {:?}", value, property),
                });
            }
        }
        Ok(())
    }
}
