//! # shchub-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement or call:
//!   - `EntityRepository` / `DeviceRepository`: entity and device registries
//!   - `EventPublisher`: fire events on the bus
//!   - `Integration` / `IntegrationContext`: device integration lifecycle
//!   - `ServiceHandler`: execute service calls against owned entities
//! - Provide **in-process infrastructure** that doesn't need IO
//!   (event bus, in-memory registries)
//! - Orchestrate domain objects (`EntityService`, `DeviceService`,
//!   `ServiceDispatcher`) without knowing which integration is behind them
//!
//! ## Dependency rule
//! Depends on `shchub-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod memory;
pub mod ports;
pub mod services;
