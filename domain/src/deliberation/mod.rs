//! Deliberation domain
//!
//! Sessions, rounds and contributions, plus the pure analyzers that read
//! them: opinion parsing, divergence detection and convergence scoring.

pub mod convergence;
pub mod divergence;
pub mod opinion;
pub mod round;
pub mod session;

pub use convergence::{ConvergenceScore, calculate_convergence};
pub use divergence::{Divergence, DivergentPosition, detect_divergences};
pub use opinion::{Opinion, Stance, parse_critique_opinion, parse_opinion};
pub use round::{Contribution, ContributionId, Round, RoundId, RoundStatus, RoundType};
pub use session::{Session, SessionId};
