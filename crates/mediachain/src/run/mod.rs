pub mod model;
pub mod store;
pub mod tracker;

pub use model::{
    Deliverable, DeliverableMode, DeliverableStatus, PreviewMetadata, Run, RunStatus,
};
pub use store::{open_store, JsonFileRunStore, MemoryRunStore, RunStore, SqliteRunStore};
pub use tracker::{clamp_limit, RunTracker, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
