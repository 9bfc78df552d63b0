pub mod matcher;
pub mod normalize;
pub mod reconciler;
pub mod scorer;
pub mod writer;

pub use matcher::{MatchOptions, MultiPassMatcher, Pass, RunState};
pub use reconciler::{AutoReconcileRequest, ReconcileService};
pub use scorer::ConfidenceScorer;
