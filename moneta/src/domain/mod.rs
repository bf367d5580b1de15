//! Bookkeeping entities
//!
//! Each entity carries a `'static` [`EntityMeta`](crate::entity::EntityMeta)
//! describing its table and a [`FilterSchema`](crate::filters::FilterSchema)
//! declaring what list endpoints may filter and order by.

mod account;
mod category;
mod tag;
mod transaction;
mod user;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use account::Account;
pub use category::Category;
pub use tag::Tag;
pub use transaction::Transaction;
pub use user::User;

/// Allowed values of [`EntryKind`] as stored
pub const ENTRY_KINDS: &[&str] = &["Income", "Expense", "Transfer"];

/// Direction of money for categories and transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
    /// Money moving between accounts
    Transfer,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
            Self::Transfer => write!(f, "Transfer"),
        }
    }
}

/// One user with an account and two categories, ids 1, 1 and 1..=2
#[cfg(test)]
pub(crate) async fn seed_owner(store: &crate::store::MemoryStore) {
    use crate::entity::Entity;
    use serde_json::{json, Value};

    fn rows(values: Vec<Value>) -> Vec<crate::entity::Record> {
        values
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect()
    }
    let stamp = "2024-01-01T00:00:00";

    store
        .seed(
            User::meta(),
            rows(vec![json!({
                "id": 1, "email": "ada@example.com", "username": "ada",
                "hashed_password": "x", "firstname": null, "lastname": null,
                "is_active": true, "created_at": stamp, "updated_at": stamp,
            })]),
        )
        .await;
    store
        .seed(
            Account::meta(),
            rows(vec![json!({
                "id": 1, "user_id": 1, "name": "Checking", "description": null,
                "initial_balance": 0.0, "current_balance": 0.0,
                "created_at": stamp, "updated_at": stamp,
            })]),
        )
        .await;
    store
        .seed(
            Category::meta(),
            rows(vec![
                json!({
                    "id": 1, "name": "Groceries", "description": null, "type": "Expense",
                    "user_id": 1, "created_at": stamp, "updated_at": stamp,
                }),
                json!({
                    "id": 2, "name": "Salary", "description": null, "type": "Income",
                    "user_id": null, "created_at": stamp, "updated_at": stamp,
                }),
            ]),
        )
        .await;
}
