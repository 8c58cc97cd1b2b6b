//! # shchub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** over the entity and device registries
//!   (`/api/entities`, `/api/devices`)
//! - List the registered services and run service calls
//!   (`/api/services`, `/api/services/call`)
//! - Stream domain events as **Server-Sent Events** (`/api/events/stream`)
//!
//! ## Dependency rule
//! Depends on `shchub-app` (for port traits and services) and `shchub-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
