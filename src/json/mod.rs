//! Purpose: Internal JSON parsing boundary shared by the decoder variants.
//! Exports: `parse` (engine entrypoints, failure categories), `scan` (compatibility pre-scan).
//! Role: Single seam for engine usage so decoders avoid ad hoc parsing logic.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
pub(crate) mod scan;
