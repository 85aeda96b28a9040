mod monitor;

pub use monitor::{LowStockMonitor, StockAlert, StockLevel, run_sweeper};
