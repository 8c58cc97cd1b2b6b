//! # shchub-domain
//!
//! Pure domain model for the shchub home automation bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps and clocks
//! - Define **Entities** (binary sensors and sensors exposed to users)
//! - Define **Devices** (physical things behind the hub that expose one or more entities)
//! - Define **Services** (commands routed to an entity, with their field schema)
//! - Define **Events** (state changes, service calls, integration events)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod entity;
pub mod event;
pub mod service;
