//! # Trails Sample
//!
//! A small application built on `trails-runtime`, demonstrating the full
//! recipe:
//!
//! 1. **Packs** ([`packs`]) — a datastore pack that extends the
//!    configuration during its `configure` phase, and a router pack that
//!    depends on it and reads the sealed configuration.
//! 2. **Api resources** ([`api`]) — a model registry with bound,
//!    cross-referencing operations.
//! 3. **Entry point** (`main.rs`) — build → start → use → stop.

pub mod api;
pub mod packs;
