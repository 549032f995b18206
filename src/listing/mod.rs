pub mod controller;
pub mod merge;
pub mod mode;
pub mod registry;
pub mod search;
pub mod source;

pub use controller::{ListController, ListError, ListState, Outcome, Snapshot, Viewport};
pub use mode::ViewMode;
pub use registry::{ListKind, View, ViewRegistry};
pub use search::SearchSource;
pub use source::{EndpointSource, PageSource, WatchlistSource};
