//! Core domain logic for memory palaces.
//!
//! Spatial model, placement rules, anchor ordering and historized
//! persistence live here; callers supply an authenticated owner id.

pub mod clock;
pub mod config;
pub mod db;
pub mod editor;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod spatial;

pub use clock::{Clock, SteppingClock, SystemClock};
pub use config::{ConfigError, PalaceConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use editor::{EditorError, InteractionState, PalaceEditor, PlacementOutcome, RejectReason};
pub use graph::linearize::linearize;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::connection::{AnchorInfo, Connection};
pub use model::element::{Element, ElementId, ElementKind, VariantId};
pub use model::palace::{Palace, PalaceId, PalaceSnapshot};
pub use repo::history_repo::{ClassReport, Versioned};
pub use repo::palace_repo::{PalaceRepository, SaveReport, SqlitePalaceRepository};
pub use repo::{RepoError, RepoResult};
pub use service::palace_service::{LoadedPalace, PalaceService, PalaceServiceError, SaveOutcome};
pub use service::quiz_service::{QuizCard, QuizService, QuizSession, Rating};
pub use service::PruneReport;
pub use spatial::containment::{ContainmentError, ElementIndex};
pub use spatial::geometry::{Point, Rect, Size};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
