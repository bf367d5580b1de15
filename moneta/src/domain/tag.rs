use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityMeta, FieldDef, FieldKind};
use crate::filters::{FilterSchema, Filterable};

static FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::new("name", FieldKind::Text).unique(),
    FieldDef::new("description", FieldKind::Text).nullable(),
    FieldDef::new("created_at", FieldKind::DateTime).defaulted(),
    FieldDef::new("updated_at", FieldKind::DateTime).defaulted(),
];

static META: EntityMeta = EntityMeta::new("Tag", "tags", FIELDS).with_timestamps();

static FILTERS: FilterSchema =
    FilterSchema::new(&["name__ieq", "name__icontains"], &["name", "id"]);

/// Free-form label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for Tag {
    fn meta() -> &'static EntityMeta {
        &META
    }

    fn id(&self) -> i64 {
        self.id
    }
}

impl Filterable for Tag {
    fn filter_schema() -> &'static FilterSchema {
        &FILTERS
    }
}
