#![warn(missing_docs)]

//! Representation and analysis of finite [role-symmetric][role-symmetric]
//! normal-form games.
//!
//! A role-symmetric game partitions its players into named *roles*; players
//! within a role are interchangeable and share a fixed strategy set. That
//! symmetry makes a compact, vectorized data model possible: a pure profile
//! is just a count of players per strategy, a mixed profile is a probability
//! per strategy, and a payoff table is a pair of parallel arrays indexed by
//! global strategy offset.
//!
//! # The layers
//!
//! - [`Schema`]: the immutable role/strategy structure and all index
//!   arithmetic derived from it.
//! - [`EmptyGame`]: a schema with no data; enumerates profiles and simplex
//!   grids and samples random profiles, mixtures, and restrictions.
//! - [`Game`]: a sparse payoff table supporting the analysis kernels:
//!   [deviation payoffs](Game::deviation_payoffs) and their
//!   [jacobian](Game::deviation_payoffs_jacobian) in closed form over a
//!   mixture, [expected payoffs](Game::expected_payoffs),
//!   [best responses](Game::best_response), and payoff summaries.
//! - [`SampleGame`]: a payoff game whose profiles carry variable-depth bags
//!   of observations, with bootstrap [resampling](SampleGame::resample_using)
//!   and [mean collapse](SampleGame::to_game).
//! - [`Restriction`]: a validated strategy mask inducing a sub-game.
//! - [Regret](pure_regret) and [dominance](iterated_elimination): gain-based
//!   analysis of unilateral deviations, honoring missing-data semantics.
//! - A [JSON boundary](crate::json) for the role/strategy-keyed document
//!   formats games are exchanged in.
//!
//! Missing payoff data is a first-class value throughout: structural
//! violations error at construction, while unobserved payoffs flow through
//! numeric results as NaN and only the documented `conditional` and
//! `ignore_incomplete` switches change how they are interpreted.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use rsgame::{iterated_elimination, EliminationCriterion, Game};
//!
//! // A 2-player game of rock-paper-scissors, stored symmetrically: six
//! // profiles instead of nine ordered outcomes.
//! let rps = Game::numbered(
//!     &[2],
//!     &[3],
//!     vec![
//!         vec![2, 0, 0], vec![1, 1, 0], vec![1, 0, 1],
//!         vec![0, 2, 0], vec![0, 1, 1], vec![0, 0, 2],
//!     ],
//!     vec![
//!         vec![0.0, 0.0, 0.0], vec![-1.0, 1.0, 0.0], vec![1.0, 0.0, -1.0],
//!         vec![0.0, 0.0, 0.0], vec![0.0, -1.0, 1.0], vec![0.0, 0.0, 0.0],
//!     ],
//! ).unwrap();
//!
//! // The uniform mixture is an equilibrium: no deviation gains anything.
//! let uniform = array![1.0, 1.0, 1.0] / 3.0;
//! let devs = rps.deviation_payoffs(uniform.view());
//! assert!(devs.iter().all(|d| d.abs() < 1e-12));
//!
//! // And consequently nothing is dominated.
//! let kept = iterated_elimination(&rps, EliminationCriterion::StrictDominance, true);
//! assert_eq!(kept.mask(), &[true, true, true]);
//! ```
//!
//! [role-symmetric]: https://en.wikipedia.org/wiki/Symmetric_game

mod dominance;
mod error;
mod game;
pub mod json;
mod paygame;
mod regret;
mod restrict;
mod samplegame;
mod schema;

pub use dominance::*;
pub use error::*;
pub use game::*;
pub use paygame::*;
pub use regret::*;
pub use restrict::*;
pub use samplegame::*;
pub use schema::*;
