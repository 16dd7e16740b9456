//! Orden - Profile-guided method layout ordering
//!
//! This library parses aggregated method profiling data (per-method,
//! per-interaction appearance and execution-order statistics) and derives a
//! total order over method references, so that methods executed together
//! can be laid out physically close in a packed binary.

pub mod cells;
pub mod cli;
pub mod comparator;
pub mod error;
pub mod profiles;
pub mod report;
pub mod symbols;
