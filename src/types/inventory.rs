use serde::{Deserialize, Serialize};

use super::document::require_text;
use super::{Collection, Document, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Hardware,
    Software,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Active,
    InRepair,
    Retired,
}

/// An IT inventory item. `stock` is the number of units on hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
}

impl Document for InventoryItem {
    const COLLECTION: Collection = Collection::ItInventory;
    const MODULE: Module = Module::It;
    const FILTERABLE: &'static [&'static str] = &["category", "kind", "status", "assigned_to"];

    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        if self.stock < 0 {
            return Err("stock cannot be negative".to_string());
        }
        if let Some(price) = self.unit_price {
            super::document::require_non_negative("unit_price", price)?;
        }
        Ok(())
    }
}
