//! The view engine: reactive views over streaming subprocess output.
//!
//! A view binds an external command to a growing line buffer behind a
//! viewport. Content adapters interpret the stream per view kind, the
//! loader keeps the UI responsive while children stream, and the shared
//! [`Context`] couples the views through three ref slots.

pub mod adapter;
pub mod context;
pub mod loader;
pub mod search;
pub mod view;

pub use adapter::{Adapter, EnterOutcome, OpenFlags};
pub use context::{Context, IdSource};
pub use loader::{LoadError, LoadEvent, Loader};
pub use search::{SearchDirection, SearchOutcome, find_next, search};
pub use view::{MoveOp, NavResult, ScrollOp, UpdateOutcome, View, ViewId, ViewSearch};
