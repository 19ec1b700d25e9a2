use ndarray::{Array1, ArrayView1};

use crate::{Game, GameResult, Schema};

/// The number of single-player deviations a schema admits: for each role,
/// every ordered pair of distinct strategies.
pub fn num_deviations(schema: &Schema) -> usize {
    schema
        .num_role_strats()
        .iter()
        .map(|&strats| strats * (strats - 1))
        .sum()
}

/// The payoff gained by each single-player deviation from a profile.
///
/// The result has one entry per ordered same-role strategy pair `s -> t`,
/// grouped by the deviated-from strategy `s` in global order, targets in
/// role order. The gain is the deviator's payoff in the neighboring profile
/// (one `s` player moved to `t`) minus their payoff in `profile`; entries
/// are NaN where either payoff is missing and zero where `s` is not played.
///
/// # Errors
///
/// Returns an error if the count vector is not a legal profile.
pub fn deviation_gains(game: &Game, profile: &[u32]) -> GameResult<Array1<f64>> {
    let schema = game.schema();
    let payoffs = game.get_payoffs(profile)?;
    let mut gains = Array1::zeros(num_deviations(schema));
    let mut dev = 0;
    let mut neighbor = profile.to_vec();
    for strat in 0..schema.num_strats() {
        let role = schema.strat_role(strat);
        for target in schema.role_span(role) {
            if target == strat {
                continue;
            }
            if profile[strat] > 0 {
                neighbor[strat] -= 1;
                neighbor[target] += 1;
                let neighbor_pays = game
                    .get_payoffs(&neighbor)
                    .expect("a unilateral deviation from a legal profile is legal");
                gains[dev] = neighbor_pays[target] - payoffs[strat];
                neighbor[strat] += 1;
                neighbor[target] -= 1;
            }
            dev += 1;
        }
    }
    Ok(gains)
}

/// The regret of a pure profile: the largest nonnegative payoff improvement
/// any single player could gain by deviating.
///
/// With `ignore_missing`, deviations whose payoffs are unobserved are
/// skipped (NaN only if every deviation is unobserved); otherwise any
/// missing deviation makes the regret NaN.
///
/// # Errors
///
/// Returns an error if the count vector is not a legal profile.
///
/// # Examples
/// ```
/// use rsgame::{pure_regret, Game};
///
/// let game = Game::numbered(
///     &[2],
///     &[2],
///     vec![vec![2, 0], vec![1, 1], vec![0, 2]],
///     vec![vec![1.0, 0.0], vec![3.0, 3.0], vec![0.0, 1.0]],
/// ).unwrap();
///
/// // Deviating from the all-first profile to the second strategy gains 2.
/// assert_eq!(pure_regret(&game, &[2, 0], false).unwrap(), 2.0);
/// // The mixed profile is an equilibrium here: deviating loses utility.
/// assert_eq!(pure_regret(&game, &[1, 1], false).unwrap(), 0.0);
/// ```
pub fn pure_regret(game: &Game, profile: &[u32], ignore_missing: bool) -> GameResult<f64> {
    let gains = deviation_gains(game, profile)?;
    let supported: Vec<f64> = supported_gains(game.schema(), profile, gains.view()).collect();
    if supported.is_empty() {
        // No role admits a deviation, so no player can improve.
        return Ok(0.0);
    }
    let max_gain = if ignore_missing {
        // f64::max discards a NaN operand.
        supported.into_iter().fold(f64::NAN, f64::max)
    } else {
        supported.into_iter().fold(f64::NEG_INFINITY, |acc, gain| {
            if gain.is_nan() || acc.is_nan() {
                f64::NAN
            } else {
                acc.max(gain)
            }
        })
    };
    if max_gain.is_nan() {
        Ok(f64::NAN)
    } else {
        Ok(max_gain.max(0.0))
    }
}

/// The regret of a mixture: the largest payoff improvement any single
/// player could gain by deviating to a pure strategy, relative to their
/// role's expected payoff. NaN when the relevant deviation payoffs are
/// unresolved.
pub fn mixture_regret(game: &Game, mixture: ArrayView1<f64>) -> f64 {
    let schema = game.schema();
    let devs = game.deviation_payoffs(mixture);
    let expected = schema.role_repeat(
        game.expected_payoffs(mixture).view(),
    );
    (&devs - &expected).fold(f64::NEG_INFINITY, |acc, &gain| {
        if gain.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            acc.max(gain)
        }
    })
}

/// Iterate the gains of deviations whose source strategy is played.
fn supported_gains<'a>(
    schema: &'a Schema,
    profile: &'a [u32],
    gains: ArrayView1<'a, f64>,
) -> impl Iterator<Item = f64> + 'a {
    let mut spans = Vec::with_capacity(gains.len());
    let mut dev = 0;
    for strat in 0..schema.num_strats() {
        let width = schema.num_role_strats()[schema.strat_role(strat)] - 1;
        if profile[strat] > 0 {
            spans.extend(dev..dev + width);
        }
        dev += width;
    }
    spans.into_iter().map(move |index| gains[index])
}
