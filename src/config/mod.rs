mod app;
mod server;

pub use app::{
    AccuWeatherConfig, AlgoliaConfig, AppConfig, GoogleMapsConfig, IntegrationsConfig,
    InventoryConfig, ProxyConfig, ResendConfig,
};
pub use server::ServerConfig;
