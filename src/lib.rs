//! Terminal focus timer. A round ticks once per second, every tick is attributed to the selected
//! category and folded into a day log that is quantized before it is stored. The stored logs back
//! a day view with totals and slot rings, and a month calendar painted by dominant category.
//!

pub mod cli;
pub mod config;
pub mod storage;
pub mod timer;
pub mod tracker;
pub mod utils;
