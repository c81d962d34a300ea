//! Purpose: Library crate behind the `quarry` CLI: pluggable response decoding for search clients.
//! Exports: `api` (client, config, strategies), `core` (strategies and errors).
//! Role: Decouples "how response bytes become values" from request/response handling.
//! Invariants: Strategy selection is explicit configuration; there is no process-global default.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
mod json;
