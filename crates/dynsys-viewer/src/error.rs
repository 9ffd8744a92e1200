use thiserror::Error;

/// What is wrong with a rejected trajectory point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointDefect {
    /// Fewer components than a plottable point needs.
    MissingComponents { found: usize, required: usize },
    /// A component is NaN or infinite.
    NonFinite { component: usize, value: f64 },
}

impl std::fmt::Display for PointDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointDefect::MissingComponents { found, required } => {
                write!(f, "has {found} components, at least {required} required")
            }
            PointDefect::NonFinite { component, value } => {
                write!(f, "component {component} is not finite ({value})")
            }
        }
    }
}

/// Errors surfaced by the viewer engine.
///
/// Degenerate ranges are not errors: they are recovered where they occur
/// (unit scale, substitute tick step) and logged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViewerError {
    #[error("trajectory is empty")]
    EmptyTrajectory,
    #[error("trajectory point {index} {defect}")]
    InvalidPoint { index: usize, defect: PointDefect },
    #[error("component mapping {mapping:?} is not a permutation of three distinct slots")]
    InvalidMapping { mapping: [usize; 3] },
}

pub type Result<T> = std::result::Result<T, ViewerError>;
