use super::ids::{CatalogItemId, EntryFeeId};
use super::money::{Amount, Currency};
use serde::{Deserialize, Serialize};

/// A purchasable SKU, owned by the catalog service and read here only.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub sku: String,
    #[serde(default)]
    pub title: String,
    pub price: Amount,
    pub currency: Currency,
    pub active: bool,
}

/// The amount a tournament charges for a seat.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct EntryFee {
    pub id: EntryFeeId,
    pub name: String,
    pub amount: Amount,
    pub currency: Currency,
}
