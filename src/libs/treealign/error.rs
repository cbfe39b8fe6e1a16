use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlignError {
    /// A cursor was asked to move where no vertex exists
    Navigation(&'static str),
    /// Two subsets over different sibling lists were combined
    IncompatibleSets,
    /// A vertex has more children than a subset mask can hold
    DegreeOverflow {
        /// Degree of the offending vertex
        degree: usize,
        /// Largest degree the solver accepts
        limit: usize,
    },
    /// No option of a DP cell reproduces its stored score
    Backtrace(String),
    /// The backtrace stream does not describe a consistent alignment tree
    Reconstruction(String),
    /// Input tree lacks something the scoring needs
    MalformedTree(String),
    /// The chosen solver cannot handle the requested settings
    Unsupported(String),
}

impl fmt::Display for AlignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignError::Navigation(msg) => write!(f, "Cursor navigation error: {}", msg),
            AlignError::IncompatibleSets => {
                write!(f, "Sets are built over different sibling lists")
            }
            AlignError::DegreeOverflow { degree, limit } => write!(
                f,
                "Vertex degree {} exceeds the supported maximum of {}",
                degree, limit
            ),
            AlignError::Backtrace(msg) => write!(f, "Backtrace error: {}", msg),
            AlignError::Reconstruction(msg) => {
                write!(f, "Alignment tree reconstruction error: {}", msg)
            }
            AlignError::MalformedTree(msg) => write!(f, "Malformed tree: {}", msg),
            AlignError::Unsupported(msg) => write!(f, "Unsupported alignment setting: {}", msg),
        }
    }
}

impl std::error::Error for AlignError {}
