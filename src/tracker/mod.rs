//! Turns per-second ticks into a day log and derives what the views display from it.
//!
//!  - [accumulator] folds ticks into contiguous sessions and per-category totals.
//!  - [quantize] drops short sessions and floors the rest to whole units before saving.
//!  - [aggregate] picks dominant categories for days and for slots of a day.
//!
//! Nothing here performs I/O, callers own the state and pass it in.

pub mod accumulator;
pub mod aggregate;
pub mod entities;
pub mod quantize;
pub mod totals;
