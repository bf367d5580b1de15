use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{Entity, EntityMeta, FieldDef, FieldKind, Record};
use crate::filters::{FilterSchema, Filterable};

static FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::new("email", FieldKind::Text).unique(),
    FieldDef::new("username", FieldKind::Text).unique(),
    FieldDef::new("hashed_password", FieldKind::Text),
    FieldDef::new("firstname", FieldKind::Text).nullable(),
    FieldDef::new("lastname", FieldKind::Text).nullable(),
    FieldDef::new("is_active", FieldKind::Bool),
    FieldDef::new("created_at", FieldKind::DateTime).defaulted(),
    FieldDef::new("updated_at", FieldKind::DateTime).defaulted(),
];

static META: EntityMeta = EntityMeta::new("User", "users", FIELDS).with_timestamps();

static FILTERS: FilterSchema =
    FilterSchema::new(&["username__icontains", "email__ieq"], &["username", "id"]);

/// Account holder
///
/// `hashed_password` is stored as supplied and never serialized out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub hashed_password: String,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for User {
    fn meta() -> &'static EntityMeta {
        &META
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn defaults() -> Record {
        let mut defaults = Record::new();
        defaults.insert("is_active".to_string(), Value::Bool(true));
        defaults
    }
}

impl Filterable for User {
    fn filter_schema() -> &'static FilterSchema {
        &FILTERS
    }
}
