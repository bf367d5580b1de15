use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityMeta, FieldDef, FieldKind};
use crate::filters::{FilterSchema, Filterable};

use super::{EntryKind, ENTRY_KINDS};

static FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::new("name", FieldKind::Text).unique(),
    FieldDef::new("description", FieldKind::Text).nullable(),
    FieldDef::new("type", FieldKind::Choice(ENTRY_KINDS)),
    FieldDef::new("user_id", FieldKind::Integer)
        .nullable()
        .references("users"),
    FieldDef::new("created_at", FieldKind::DateTime).defaulted(),
    FieldDef::new("updated_at", FieldKind::DateTime).defaulted(),
];

static META: EntityMeta = EntityMeta::new("Category", "categories", FIELDS).with_timestamps();

static FILTERS: FilterSchema = FilterSchema::new(
    &["name__icontains", "type__ieq", "user_id__eq"],
    &["name", "id"],
);

/// Grouping for transactions; global when `user_id` is empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for Category {
    fn meta() -> &'static EntityMeta {
        &META
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Filterable for Category {
    fn filter_schema() -> &'static FilterSchema {
        &FILTERS
    }
}
