//! Persistence of everything the timer produces.
//!  - Day logs live in `<app>/records`, one json file per local calendar day, handled by
//!    [log_storage::LogStorageImpl].
//!  - Categories live in `<app>/categories.json`, handled by [category_storage::CategoryStore].
//!  - A round stopped early lives in `<app>/paused.json`, handled by [pause_storage::PauseStore].

pub mod category_storage;
pub mod log_storage;
pub mod pause_storage;

pub const RECORDS_DIR: &str = "records";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const PAUSED_FILE: &str = "paused.json";
