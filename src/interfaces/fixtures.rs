use crate::domain::catalog::{CatalogItem, EntryFee};
use crate::domain::identity::Role;
use crate::domain::ids::UserId;
use crate::error::Result;
use crate::infrastructure::in_memory::{InMemoryCatalog, InMemoryIdentity};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Clone, Deserialize)]
pub struct UserFixture {
    pub token: String,
    pub id: UserId,
    pub role: Role,
}

/// Users, catalog items and entry fees a script runs against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub users: Vec<UserFixture>,
    #[serde(default)]
    pub catalog: Vec<CatalogItem>,
    #[serde(default)]
    pub entry_fees: Vec<EntryFee>,
}

impl Fixtures {
    pub fn from_reader(source: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    /// Loads every user into `identity` and every item and fee into `catalog`.
    pub async fn seed(&self, identity: &InMemoryIdentity, catalog: &InMemoryCatalog) {
        for user in &self.users {
            identity.insert(user.token.clone(), user.id, user.role).await;
        }
        for item in &self.catalog {
            catalog.put_item(item.clone()).await;
        }
        for fee in &self.entry_fees {
            catalog.put_entry_fee(fee.clone()).await;
        }
    }
}
