//! Topic naming shared by both transport variants.

use std::fmt;

use fleet_model::WorkerId;

/// A logical channel between groundstation and fleet.
///
/// The groundstation publishes to one task topic per worker identity;
/// every worker publishes to the shared results topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Task dispatches addressed to one worker.
    Tasks(WorkerId),
    /// Execution results from the whole fleet.
    Results,
}

impl Topic {
    /// The broker subject for this topic.
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Topic::Tasks(worker) => format!("fleet.tasks.{worker}"),
            Topic::Results => "fleet.results".to_string(),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subject())
    }
}
