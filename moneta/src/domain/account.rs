use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityMeta, FieldDef, FieldKind};
use crate::filters::{FilterSchema, Filterable};

static FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::new("user_id", FieldKind::Integer).references("users"),
    FieldDef::new("name", FieldKind::Text),
    FieldDef::new("description", FieldKind::Text).nullable(),
    FieldDef::new("initial_balance", FieldKind::Float),
    FieldDef::new("current_balance", FieldKind::Float),
    FieldDef::new("created_at", FieldKind::DateTime).defaulted(),
    FieldDef::new("updated_at", FieldKind::DateTime).defaulted(),
];

static META: EntityMeta = EntityMeta::new("Account", "accounts", FIELDS).with_timestamps();

static FILTERS: FilterSchema = FilterSchema::new(
    &[
        "name__icontains",
        "user_id__eq",
        "current_balance__gt",
        "current_balance__gte",
        "current_balance__lt",
        "current_balance__lte",
    ],
    &["name", "current_balance", "id"],
);

/// A bank account, wallet or any other pot of money owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub initial_balance: f64,
    pub current_balance: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for Account {
    fn meta() -> &'static EntityMeta {
        &META
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Filterable for Account {
    fn filter_schema() -> &'static FilterSchema {
        &FILTERS
    }
}
