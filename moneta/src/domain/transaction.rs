use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::entity::{self, Entity, EntityMeta, FieldDef, FieldKind, FieldValue, Record};
use crate::filters::{FilterSchema, Filterable};

use super::{EntryKind, ENTRY_KINDS};

static FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::new("account_id", FieldKind::Integer).references("accounts"),
    FieldDef::new("user_id", FieldKind::Integer).references("users"),
    FieldDef::new("category_id", FieldKind::Integer).references("categories"),
    FieldDef::new("amount", FieldKind::Float),
    FieldDef::new("transaction_type", FieldKind::Choice(ENTRY_KINDS)),
    FieldDef::new("description", FieldKind::Text).nullable(),
    FieldDef::new("date", FieldKind::Date),
    FieldDef::new("created_at", FieldKind::DateTime).defaulted(),
    FieldDef::new("updated_at", FieldKind::DateTime).defaulted(),
];

static META: EntityMeta =
    EntityMeta::new("Transaction", "transactions", FIELDS).with_timestamps();

static FILTERS: FilterSchema = FilterSchema::new(
    &[
        "transaction_type__ieq",
        "date__gt",
        "date__gte",
        "date__lt",
        "date__lte",
        "date__eq",
        "description__contains",
        "description__icontains",
        "amount__gt",
        "amount__gte",
        "amount__lt",
        "amount__lte",
    ],
    &["date", "amount", "id", "created_at"],
);

/// Money moving in or out of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub amount: f64,
    pub transaction_type: EntryKind,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for Transaction {
    fn meta() -> &'static EntityMeta {
        &META
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn defaults() -> Record {
        let mut defaults = Record::new();
        defaults.insert(
            "date".to_string(),
            FieldValue::Date(entity::now().date()).to_json(),
        );
        defaults
    }
}

impl Filterable for Transaction {
    fn filter_schema() -> &'static FilterSchema {
        &FILTERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterManager;
    use crate::pagination::{LimitOffset, PaginationStrategy};
    use crate::repository::{Crud, Repository};
    use crate::domain::seed_owner;
    use crate::store::{MemoryStore, Session, Store};
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    async fn ledger() -> MemoryStore {
        let store = MemoryStore::new();
        seed_owner(&store).await;
        let mut session = store.session();
        let mut transactions = Repository::<Transaction, _>::new(&mut session);
        for (amount, kind, date, description) in [
            (12.5, "Expense", "2024-11-30", "Coffee beans"),
            (2500.0, "Income", "2024-12-01", "Salary December"),
            (80.0, "Expense", "2024-12-03", "Groceries"),
            (300.0, "Transfer", "2024-12-05", "To savings"),
        ] {
            transactions
                .create(record(json!({
                    "account_id": 1,
                    "user_id": 1,
                    "category_id": 1,
                    "amount": amount,
                    "transaction_type": kind,
                    "date": date,
                    "description": description,
                })))
                .await
                .unwrap();
        }
        session.commit().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_date_defaults_to_today() {
        let store = MemoryStore::new();
        seed_owner(&store).await;
        let mut session = store.session();
        let mut transactions = Repository::<Transaction, _>::new(&mut session);

        let created = transactions
            .create(record(json!({
                "account_id": 1,
                "user_id": 1,
                "category_id": 2,
                "amount": 9.99,
                "transaction_type": "Expense",
            })))
            .await
            .unwrap();
        assert_eq!(created.date, entity::now().date());
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected() {
        let store = MemoryStore::new();
        seed_owner(&store).await;
        let mut session = store.session();
        let mut transactions = Repository::<Transaction, _>::new(&mut session);

        let err = transactions
            .create(record(json!({
                "account_id": 1,
                "user_id": 1,
                "category_id": 7,
                "amount": 5.0,
                "transaction_type": "Expense",
            })))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Repository(ref e)
                if e.kind == crate::repository::RepositoryErrorKind::StoreFailure
        ));
        session.commit().await.unwrap();
        assert!(store.rows(Transaction::meta()).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_with_query_string_filters() {
        let store = ledger().await;
        let mut session = store.session();
        let mut transactions = Repository::<Transaction, _>::new(&mut session);

        let params = record(json!({
            "transaction_type__ieq": "expense",
            "date__gte": "2024-12-01",
        }));
        let spec = Transaction::filter_schema().validate(&params).unwrap();
        let ordering = Transaction::filter_schema()
            .ordering(&["-amount"][..])
            .unwrap();
        let manager = FilterManager::<Transaction>::new(&spec, ordering.as_ref()).unwrap();

        let found = transactions
            .list(Some(&manager), None, &Record::new())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description.as_deref(), Some("Groceries"));
    }

    #[tokio::test]
    async fn test_list_orders_by_amount_and_pages() {
        let store = ledger().await;
        let mut session = store.session();
        let mut transactions = Repository::<Transaction, _>::new(&mut session);

        let ordering = Transaction::filter_schema()
            .ordering(&["-amount"][..])
            .unwrap();
        let spec = Transaction::filter_schema()
            .validate(&record(json!({"description__icontains": "S"})))
            .unwrap();
        let manager = FilterManager::<Transaction>::new(&spec, ordering.as_ref()).unwrap();
        let mut pages = LimitOffset::new(Some(2), Some(0));

        let found = transactions
            .list(Some(&manager), Some(&mut pages), &Record::new())
            .await
            .unwrap();
        let amounts: Vec<f64> = found.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![2500.0, 300.0]);
        assert_eq!(pages.describe().count, Some(4));
    }
}
