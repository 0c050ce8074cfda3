pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod library;
pub mod model;
pub mod navigation;
pub mod reader;
pub mod reference;
pub mod search;
pub mod tree;
pub mod verses;

// Re-export main types for convenience
pub use api::LibraryApi;
pub use config::Config;
pub use error::{ApiError, ErrorKind, FetchError};
pub use fetch::{FetchClient, RetryPolicy, Transport};
pub use library::{Language, LibraryNode};
pub use model::{IndexMetadata, SearchResults, TextPayload, VerseText};
pub use navigation::{ChapterOutcome, ChapterRequest, NavigationState, Screen, Selection};
pub use reader::{DisplaySettings, ReaderState, TextTicket};
pub use search::{SearchSession, SearchTicket};
pub use tree::{build_tree, CategoryTreeNode, Expansion, NodeKey};
pub use verses::{RenderMode, RenderedText};
