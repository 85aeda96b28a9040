use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::store::{DocumentQuery, RecordStore, Store};
use crate::types::{InventoryItem, ItemStatus, Module, Notification, NotificationKind, Record};

const ALERT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Ok,
    Low,
    Critical,
}

impl StockLevel {
    #[must_use]
    pub fn classify(stock: i64, threshold: i64) -> Self {
        if stock <= 0 {
            StockLevel::Critical
        } else if stock <= threshold {
            StockLevel::Low
        } else {
            StockLevel::Ok
        }
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StockLevel::Ok => "ok",
            StockLevel::Low => "low",
            StockLevel::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockAlert {
    pub item_id: String,
    pub company_id: String,
    pub name: String,
    pub stock: i64,
    pub level: StockLevel,
    pub threshold: i64,
    pub at: DateTime<Utc>,
}

impl StockAlert {
    fn notification(&self) -> Notification {
        let title = match self.level {
            StockLevel::Critical => format!("Out of stock: {}", self.name),
            _ => format!("Low stock: {}", self.name),
        };
        let message = format!(
            "{} has {} unit(s) left (threshold {}).",
            self.name, self.stock, self.threshold
        );
        let mut notification =
            Notification::for_department(Module::It, NotificationKind::Stock, title, message);
        notification.link = Some(format!("/it/inventory/{}", self.item_id));
        notification
    }
}

/// Watches inventory stock and raises one alert per item per level.
///
/// An item alerts when it first becomes low, again if it becomes critical,
/// and is re-armed once its stock is back above the threshold.
pub struct LowStockMonitor {
    threshold: i64,
    alerted: Mutex<HashMap<String, StockLevel>>,
    sender: broadcast::Sender<StockAlert>,
}

impl LowStockMonitor {
    #[must_use]
    pub fn new(threshold: i64) -> Self {
        let (sender, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self {
            threshold,
            alerted: Mutex::new(HashMap::new()),
            sender,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StockAlert> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn level(&self, item: &InventoryItem) -> StockLevel {
        StockLevel::classify(item.stock, self.threshold)
    }

    /// Updates the dedup state for one item and returns a new alert, if any.
    pub fn observe(&self, record: &Record<InventoryItem>) -> Option<StockAlert> {
        if record.deleted || record.data.status == ItemStatus::Retired {
            self.forget(&record.id);
            return None;
        }

        let level = self.level(&record.data);
        let mut alerted = self.alerted.lock().unwrap_or_else(|e| e.into_inner());

        if level == StockLevel::Ok {
            alerted.remove(&record.id);
            return None;
        }
        if alerted.get(&record.id).is_some_and(|prev| *prev >= level) {
            return None;
        }
        alerted.insert(record.id.clone(), level);
        drop(alerted);

        let alert = StockAlert {
            item_id: record.id.clone(),
            company_id: record.company_id.clone(),
            name: record.data.name.clone(),
            stock: record.data.stock,
            level,
            threshold: self.threshold,
            at: Utc::now(),
        };
        tracing::warn!(
            item = %alert.item_id,
            company = %alert.company_id,
            stock = alert.stock,
            level = %alert.level,
            "Inventory stock {}", alert.level
        );
        // No subscribers is fine.
        let _ = self.sender.send(alert.clone());
        Some(alert)
    }

    pub fn forget(&self, item_id: &str) {
        self.alerted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(item_id);
    }

    /// Observes a write and stores a department notification for a new alert.
    pub fn record(&self, store: &dyn Store, record: &Record<InventoryItem>) -> Option<StockAlert> {
        let alert = self.observe(record)?;
        if let Err(e) = store.create_record(&alert.company_id, alert.notification()) {
            tracing::warn!(item = %alert.item_id, "Failed to store low-stock notification: {e}");
        }
        Some(alert)
    }

    /// Checks every item of every company.
    pub fn sweep(&self, store: &dyn Store) -> Result<Vec<StockAlert>> {
        let items: Vec<Record<InventoryItem>> = store.list_records(&DocumentQuery::default())?;

        {
            let mut alerted = self.alerted.lock().unwrap_or_else(|e| e.into_inner());
            alerted.retain(|id, _| items.iter().any(|item| &item.id == id));
        }

        Ok(items
            .iter()
            .filter_map(|item| self.record(store, item))
            .collect())
    }
}

/// Runs [`LowStockMonitor::sweep`] on a fixed interval until the task is dropped.
pub async fn run_sweeper(monitor: Arc<LowStockMonitor>, store: Arc<dyn Store>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match monitor.sweep(store.as_ref()) {
            Ok(alerts) if !alerts.is_empty() => {
                tracing::info!("Low-stock sweep raised {} alert(s)", alerts.len());
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Low-stock sweep failed: {e}"),
        }
    }
}
