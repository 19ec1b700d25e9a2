use std::error::Error;
use std::fmt::{self, Display};

/// A specialization of the standard [`Result`] type for failures detected while
/// constructing games or translating external documents.
///
/// Either a value of type `T` on success or a [`GameError`] describing the
/// violated invariant on failure.
pub type GameResult<T> = Result<T, GameError>;

/// An invariant violation detected at construction time.
///
/// All structural violations surface through this type when an object is
/// built; once a schema or game exists, its invariants hold and numeric
/// operations never fail. Missing payoff data is *not* an error: it flows
/// through numeric results as NaN.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameError {
    /// A role schema was malformed: duplicate or empty role/strategy names,
    /// a role with no strategies, or a player count of zero.
    Schema(String),

    /// A profile was malformed: wrong vector length, negative counts, a role
    /// slice that does not sum to the role's player count, or an unknown
    /// strategy name.
    Profile(String),

    /// A payoff row was malformed: a nonzero or NaN entry at an index the
    /// profile does not support, a repeated profile, or a length mismatch.
    Payoff(String),

    /// A sample block was malformed: wrong tensor shape, a block with no
    /// observations, or observation rows violating the payoff invariants.
    Samples(String),

    /// An external JSON document was malformed or referenced unknown roles
    /// or strategies.
    Json(String),
}

impl Display for GameError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Schema(msg) => write!(fmt, "invalid schema: {}", msg),
            GameError::Profile(msg) => write!(fmt, "invalid profile: {}", msg),
            GameError::Payoff(msg) => write!(fmt, "invalid payoffs: {}", msg),
            GameError::Samples(msg) => write!(fmt, "invalid sample payoffs: {}", msg),
            GameError::Json(msg) => write!(fmt, "invalid game document: {}", msg),
        }
    }
}

impl Error for GameError {}
