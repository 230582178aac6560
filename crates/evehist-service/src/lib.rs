//! Host emulation and HTTP REST API for Eve history accessories.
//!
//! This crate provides a service that:
//! - Runs one history engine per configured accessory
//! - Drives sampling, history ticks and periodic snapshot saves
//! - Exposes the history fields and live sensor values over HTTP
//! - Saves every accessory's history on shutdown
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/accessories` - List accessories with history summaries
//! - `GET /api/accessories/{id}/history/status` - Status field
//! - `PUT /api/accessories/{id}/history/request` - Start a transfer
//! - `GET /api/accessories/{id}/history/entries` - Next transfer chunk
//! - `PUT /api/accessories/{id}/history/time` - Host clock update
//! - `POST /api/accessories/{id}/reset-total` - Zero energy totals
//! - `GET|PUT /api/accessories/{id}/values` - Live sensor values
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/evehist/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/evehist"
//!
//! [history]
//! sample_interval = 10
//! tick_interval = 600
//! save_interval = 600
//!
//! [[accessories]]
//! id = "front-door"
//! kind = "contact"
//!
//! [[accessories]]
//! id = "washer"
//! kind = "consumption"
//! derive_power = true
//! ```

pub mod api;
pub mod config;
pub mod state;

pub use config::{
    AccessoryConfig, Config, ConfigError, HistoryConfig, ServerConfig, StorageConfig,
    ValidationError,
};
pub use state::{AccessoryHandle, AppState, Characteristics, SensorValues};
