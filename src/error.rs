//! Error types for the recommendation engine

use thiserror::Error;

/// Failures raised by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Failures raised by a single analyzer.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("data unavailable: {0}")]
    DataUnavailable(#[from] StoreError),

    #[error("student {0} has no points record")]
    UnknownStudent(i64),
}

/// Failures surfaced to callers of the engine.
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("invalid student id: {0}")]
    InvalidInput(String),

    #[error("recommendation generation failed for student {student_id}: {source}")]
    GenerationFailed {
        student_id: i64,
        #[source]
        source: AnalysisError,
    },
}

impl RecommendationError {
    pub fn is_unknown_student(&self) -> bool {
        matches!(
            self,
            RecommendationError::GenerationFailed {
                source: AnalysisError::UnknownStudent(_),
                ..
            }
        )
    }
}
