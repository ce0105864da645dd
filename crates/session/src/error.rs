use chatmap_graph::GraphError;
use chatmap_store::StoreError;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Annotation document a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    Favorites,
    Tags,
    Vocabulary,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Favorites => "favorites",
            Self::Tags => "tags",
            Self::Vocabulary => "tag vocabulary",
        })
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    /// Bulk load or refresh failed; the previous store is still in place.
    #[error("Failed to load chats: {0}")]
    Load(#[source] StoreError),

    /// The in-memory change was applied and redrawn, but not saved.
    #[error("Failed to save {collection}: {source}")]
    Persist {
        collection: AnnotationKind,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl SessionError {
    /// Persistence failures leave the session usable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Load(_))
    }
}
