use ndarray::Array2;

use crate::regret::{deviation_gains, num_deviations};
use crate::{Game, Restriction};

/// The elimination criterion used by [`iterated_elimination`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EliminationCriterion {
    /// Eliminate [weakly dominated](weakly_dominated) strategies.
    WeakDominance,
    /// Eliminate [strictly dominated](strictly_dominated) strategies.
    StrictDominance,
    /// Eliminate strategies that are [never a best
    /// response](never_best_response).
    NeverBestResponse,
}

/// The gains tensor: one row per profile, one column per ordered same-role
/// deviation, laid out as in [`deviation_gains`]. Dominance works entirely
/// off this array and the profile support mask, so it is built per pass and
/// dropped afterwards.
pub fn gains_tensor(game: &Game) -> Array2<f64> {
    let mut gains = Array2::zeros((game.num_profiles(), num_deviations(game.schema())));
    for (row, profile) in game.profiles().outer_iter().enumerate() {
        let row_gains = deviation_gains(game, profile.as_slice().unwrap())
            .expect("profiles stored in a game are legal");
        gains.row_mut(row).assign(&row_gains);
    }
    gains
}

/// Strategies that are weakly dominated by a role-mate: some other strategy
/// gains at least zero from the switch in every profile playing the
/// dominated strategy, and strictly gains in at least one.
///
/// With `conditional`, gains that are unobserved (NaN) do not disprove a
/// candidate domination; without it they do.
pub fn weakly_dominated(game: &Game, conditional: bool) -> Vec<bool> {
    dominated(game, conditional, false)
}

/// Strategies that are strictly dominated by a role-mate: some other
/// strategy strictly gains from the switch in every profile playing the
/// dominated strategy.
///
/// The `conditional` flag treats unobserved gains as in
/// [`weakly_dominated`].
pub fn strictly_dominated(game: &Game, conditional: bool) -> Vec<bool> {
    dominated(game, conditional, true)
}

fn dominated(game: &Game, conditional: bool, strict: bool) -> Vec<bool> {
    let schema = game.schema();
    let gains = gains_tensor(game);
    let mut mask = vec![false; schema.num_strats()];
    let mut dev = 0;
    for strat in 0..schema.num_strats() {
        let role = schema.strat_role(strat);
        for target in schema.role_span(role) {
            if target == strat {
                continue;
            }
            let mut any_gain = false;
            let mut undefeated = true;
            for (row, profile) in game.profiles().outer_iter().enumerate() {
                if profile[strat] == 0 {
                    continue;
                }
                let gain = gains[[row, dev]];
                if gain.is_nan() {
                    if !conditional {
                        undefeated = false;
                        break;
                    }
                } else if gain > 0.0 {
                    any_gain = true;
                } else if gain < 0.0 || strict {
                    undefeated = false;
                    break;
                }
            }
            if any_gain && undefeated {
                mask[strat] = true;
            }
            dev += 1;
        }
    }
    mask
}

/// Strategies that are never a best response: in no profile is the
/// strategy, or a zero-gain stay, the maximum of its role's deviation
/// gains.
///
/// With `conditional`, an unobserved gain counts as a potential best
/// response for its target, mirroring the dominance criteria's treatment of
/// missing data.
pub fn never_best_response(game: &Game, conditional: bool) -> Vec<bool> {
    let schema = game.schema();
    let gains = gains_tensor(game);
    let mut is_response = vec![false; schema.num_strats()];
    for (row, profile) in game.profiles().outer_iter().enumerate() {
        let mut dev = 0;
        for strat in 0..schema.num_strats() {
            let role = schema.strat_role(strat);
            let width = schema.num_role_strats()[role] - 1;
            if profile[strat] == 0 {
                dev += width;
                continue;
            }
            // Staying put is a zero-gain deviation, so the best gain is
            // always defined even when every switch is unobserved.
            let mut best = 0.0f64;
            for offset in 0..width {
                let gain = gains[[row, dev + offset]];
                if !gain.is_nan() {
                    best = best.max(gain);
                }
            }
            if best == 0.0 {
                is_response[strat] = true;
            }
            let mut offset = 0;
            for target in schema.role_span(role) {
                if target == strat {
                    continue;
                }
                let gain = gains[[row, dev + offset]];
                if gain == best || (conditional && gain.is_nan()) {
                    is_response[target] = true;
                }
                offset += 1;
            }
            dev += width;
        }
    }
    is_response.iter().map(|&marked| !marked).collect()
}

/// Iterated elimination of strategies under a criterion.
///
/// Starting from the full strategy set, repeatedly flag strategies under
/// the criterion, stop if nothing is flagged or some role would be left
/// empty, and otherwise restrict the game to the survivors and recompute.
/// The strategy set strictly shrinks every round, so the iteration
/// terminates; the returned restriction is over the original strategy set
/// and rerunning on the restricted game eliminates nothing further.
///
/// # Examples
/// ```
/// use rsgame::{iterated_elimination, EliminationCriterion, Game};
///
/// // Strategy s2 is strictly dominated by s0; once it is gone, s1 is too.
/// let game = Game::numbered(
///     &[2],
///     &[3],
///     vec![
///         vec![2, 0, 0], vec![1, 1, 0], vec![1, 0, 1],
///         vec![0, 2, 0], vec![0, 1, 1], vec![0, 0, 2],
///     ],
///     vec![
///         vec![3.0, 0.0, 0.0], vec![3.0, 2.0, 0.0], vec![4.0, 0.0, 1.0],
///         vec![0.0, 2.0, 0.0], vec![0.0, 5.0, 1.0], vec![0.0, 0.0, 1.0],
///     ],
/// ).unwrap();
///
/// let kept = iterated_elimination(&game, EliminationCriterion::StrictDominance, true);
/// assert_eq!(kept.mask(), &[true, false, false]);
/// ```
pub fn iterated_elimination(
    game: &Game,
    criterion: EliminationCriterion,
    conditional: bool,
) -> Restriction {
    let mut kept = Restriction::full(game.schema());
    let mut current = game.clone();
    loop {
        let flagged = match criterion {
            EliminationCriterion::WeakDominance => weakly_dominated(&current, conditional),
            EliminationCriterion::StrictDominance => strictly_dominated(&current, conditional),
            EliminationCriterion::NeverBestResponse => never_best_response(&current, conditional),
        };
        if !flagged.iter().any(|&f| f) {
            break;
        }
        let schema = current.schema();
        let survivors: Vec<bool> = flagged.iter().map(|&f| !f).collect();
        let emptied = (0..schema.num_roles())
            .any(|role| !survivors[schema.role_span(role)].iter().any(|&s| s));
        if emptied {
            break;
        }
        log::debug!(
            "eliminating {} of {} strategies",
            flagged.iter().filter(|&&f| f).count(),
            schema.num_strats()
        );
        let inner = Restriction::new(schema, survivors)
            .expect("survivors keep every role nonempty");
        kept = kept.compose(&inner);
        current = current.restrict(&inner);
    }
    kept
}
