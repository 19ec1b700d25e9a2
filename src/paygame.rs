use itertools::Itertools;
use ndarray::{s, Array1, Array2, ArrayView1};
use std::fmt;
use std::sync::OnceLock;

use crate::schema::multiset_count;
use crate::{EmptyGame, GameError, GameResult, Restriction, Schema};

/// A role-symmetric game with payoff data for some subset of its profiles.
///
/// The payoff table is a pair of parallel row-major arrays: one row per
/// profile (a count vector over the global strategy indices) and one payoff
/// row aligned with it. Rows are unique and sorted into a canonical order at
/// construction, so equality ignores the order data was supplied in and
/// profile membership is a binary search.
///
/// Payoff rows obey two invariants: entries at strategies the profile does
/// not play are exactly zero, and NaN at a *played* strategy marks missing
/// data. Missing data is a first-class value that flows through every
/// numeric query; only structural violations are errors, and only at
/// construction.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use rsgame::Game;
///
/// // A 2-player coordination game.
/// let game = Game::numbered(
///     &[2],
///     &[2],
///     vec![vec![2, 0], vec![1, 1], vec![0, 2]],
///     vec![vec![0.0, 0.0], vec![0.4, 0.6], vec![0.0, 0.0]],
/// ).unwrap();
///
/// assert!(game.is_complete());
/// assert_eq!(game.best_response(array![1.0, 0.0].view()), array![0.0, 1.0]);
/// assert_eq!(game.best_response(array![0.0, 1.0].view()), array![1.0, 0.0]);
/// assert_eq!(game.best_response(array![0.4, 0.6].view()), array![0.5, 0.5]);
/// ```
#[derive(Clone)]
pub struct Game {
    base: EmptyGame,
    profiles: Array2<u32>,
    payoffs: Array2<f64>,
    dev_reps: OnceLock<Array2<f64>>,
    min_strat: OnceLock<Array1<f64>>,
    max_strat: OnceLock<Array1<f64>>,
    num_complete: OnceLock<usize>,
}

impl Game {
    /// Construct a game from a schema and parallel profile/payoff arrays.
    ///
    /// # Errors
    ///
    /// Returns an error if the arrays disagree in shape, a profile row is
    /// illegal or repeated, or a payoff row is nonzero or NaN at an
    /// unplayed strategy.
    pub fn new(schema: Schema, profiles: Array2<u32>, payoffs: Array2<f64>) -> GameResult<Self> {
        Game::from_base(EmptyGame::new(schema), profiles, payoffs)
    }

    /// Construct a game sharing the schema of an existing [`EmptyGame`].
    pub fn from_base(
        base: EmptyGame,
        profiles: Array2<u32>,
        payoffs: Array2<f64>,
    ) -> GameResult<Self> {
        let num_strats = base.num_strats();
        if profiles.dim() != payoffs.dim() {
            return Err(GameError::Payoff(format!(
                "profile array is {:?} but payoff array is {:?}",
                profiles.dim(),
                payoffs.dim()
            )));
        }
        if profiles.nrows() == 0 {
            return Ok(Game::empty(base));
        }
        if profiles.ncols() != num_strats {
            return Err(GameError::Profile(format!(
                "profile rows have length {}, schema has {} strategies",
                profiles.ncols(),
                num_strats
            )));
        }
        for (profile, payoff) in profiles.outer_iter().zip(payoffs.outer_iter()) {
            base.schema().verify_profile(profile.as_slice().unwrap())?;
            for (strat, (&count, &pay)) in profile.iter().zip(payoff).enumerate() {
                if count == 0 && !(pay == 0.0) {
                    return Err(GameError::Payoff(format!(
                        "payoff {} at unplayed strategy {}",
                        pay,
                        base.schema().strat_name(strat)
                    )));
                }
            }
        }

        // Canonical order: rows sorted lexicographically by count vector.
        let order: Vec<usize> = (0..profiles.nrows())
            .sorted_by(|&a, &b| compare_rows(&profiles, a, b))
            .collect();
        let profiles = profiles.select(ndarray::Axis(0), &order);
        let payoffs = payoffs.select(ndarray::Axis(0), &order);
        for adjacent in 0..profiles.nrows().saturating_sub(1) {
            if profiles.row(adjacent) == profiles.row(adjacent + 1) {
                return Err(GameError::Payoff(format!(
                    "profile {:?} appears more than once",
                    profiles.row(adjacent).to_vec()
                )));
            }
        }

        Ok(Game {
            base,
            profiles,
            payoffs,
            dev_reps: OnceLock::new(),
            min_strat: OnceLock::new(),
            max_strat: OnceLock::new(),
            num_complete: OnceLock::new(),
        })
    }

    /// Construct a game over a [generated-name schema](Schema::numbered)
    /// from nested vectors, a convenience for tests and small examples.
    pub fn numbered(
        role_players: &[u32],
        role_strats: &[usize],
        profiles: Vec<Vec<u32>>,
        payoffs: Vec<Vec<f64>>,
    ) -> GameResult<Self> {
        let schema = Schema::numbered(role_players, role_strats)?;
        let num_strats = schema.num_strats();
        Game::new(
            schema,
            rows_to_array(profiles, num_strats).map_err(GameError::Profile)?,
            rows_to_array(payoffs, num_strats).map_err(GameError::Payoff)?,
        )
    }

    /// A game with no payoff data over the given base.
    pub fn empty(base: EmptyGame) -> Self {
        let num_strats = base.num_strats();
        Game {
            base,
            profiles: Array2::zeros((0, num_strats)),
            payoffs: Array2::zeros((0, num_strats)),
            dev_reps: OnceLock::new(),
            min_strat: OnceLock::new(),
            max_strat: OnceLock::new(),
            num_complete: OnceLock::new(),
        }
    }

    /// The underlying empty game.
    pub fn base(&self) -> &EmptyGame {
        &self.base
    }

    /// The game's role schema.
    pub fn schema(&self) -> &Schema {
        self.base.schema()
    }

    /// The profile rows in canonical order.
    pub fn profiles(&self) -> &Array2<u32> {
        &self.profiles
    }

    /// The payoff rows, aligned with [`profiles`](Self::profiles).
    pub fn payoffs(&self) -> &Array2<f64> {
        &self.payoffs
    }

    /// The number of profiles with payoff data.
    pub fn num_profiles(&self) -> usize {
        self.profiles.nrows()
    }

    /// The number of profiles whose payoff rows contain no missing data.
    pub fn num_complete_profiles(&self) -> usize {
        *self.num_complete.get_or_init(|| {
            self.profiles
                .outer_iter()
                .zip(self.payoffs.outer_iter())
                .filter(|(profile, payoff)| {
                    profile
                        .iter()
                        .zip(payoff.iter())
                        .all(|(&count, &pay)| count == 0 || !pay.is_nan())
                })
                .count()
        })
    }

    /// Does this game have payoff data for no profiles?
    pub fn is_empty(&self) -> bool {
        self.profiles.nrows() == 0
    }

    /// Does this game have payoff data for every legal profile?
    pub fn is_complete(&self) -> bool {
        self.profiles.nrows() as u64 == self.schema().num_all_profiles()
    }

    /// Is the players-weighted total payoff the same in every profile?
    ///
    /// Vacuously true for empty games; rows with missing data make the game
    /// not constant-sum.
    pub fn is_constant_sum(&self) -> bool {
        let mut totals = self
            .profiles
            .outer_iter()
            .zip(self.payoffs.outer_iter())
            .map(|(profile, payoff)| {
                profile
                    .iter()
                    .zip(payoff)
                    .map(|(&count, &pay)| count as f64 * pay)
                    .sum::<f64>()
            });
        match totals.next() {
            None => true,
            Some(first) => totals.all(|total| (total - first).abs() <= 1e-9 * first.abs().max(1.0)),
        }
    }

    /// The row index of a profile in canonical order, if present.
    pub(crate) fn row_index(&self, profile: &[u32]) -> Option<usize> {
        let mut low = 0;
        let mut high = self.profiles.nrows();
        while low < high {
            let mid = (low + high) / 2;
            match self.profiles.row(mid).iter().cmp(profile.iter()) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Some(mid),
            }
        }
        None
    }

    /// Does this game have payoff data for the given profile?
    pub fn contains(&self, profile: &[u32]) -> bool {
        self.row_index(profile).is_some()
    }

    /// The payoff row for a profile.
    ///
    /// If the profile has no data, the row is NaN at every played strategy
    /// and zero elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the count vector is not a legal profile.
    pub fn get_payoffs(&self, profile: &[u32]) -> GameResult<Array1<f64>> {
        self.schema().verify_profile(profile)?;
        Ok(match self.row_index(profile) {
            Some(row) => self.payoffs.row(row).to_owned(),
            None => Array1::from_iter(
                profile
                    .iter()
                    .map(|&count| if count > 0 { f64::NAN } else { 0.0 }),
            ),
        })
    }

    /// The log count of orderings in which one player could be singled out
    /// to deviate, per profile and deviated-from strategy: the log
    /// repetitions of the opponent profile, `-inf` where the strategy is
    /// not played. This table drives every deviation-payoff kernel and is
    /// built once per game.
    pub(crate) fn dev_reps(&self) -> &Array2<f64> {
        self.dev_reps.get_or_init(|| {
            let schema = self.schema();
            let max_players = schema
                .num_role_players()
                .iter()
                .copied()
                .max()
                .unwrap_or(0);
            let ln_fact = ln_factorials(max_players as usize);
            let total: f64 = schema
                .num_role_players()
                .iter()
                .map(|&n| ln_fact[n as usize])
                .sum();

            let mut reps = Array2::zeros(self.profiles.dim());
            for (mut out, profile) in reps.outer_iter_mut().zip(self.profiles.outer_iter()) {
                let row_fact: f64 = profile.iter().map(|&c| ln_fact[c as usize]).sum();
                for (strat, &count) in profile.iter().enumerate() {
                    let players = schema.num_role_players()[schema.strat_role(strat)];
                    out[strat] = if count == 0 {
                        f64::NEG_INFINITY
                    } else {
                        total - (players as f64).ln() - row_fact + (count as f64).ln()
                    };
                }
            }
            reps
        })
    }

    /// The expected payoff to a single player deviating to each strategy
    /// while all other players draw independently from `mixture`.
    ///
    /// An entry is NaN when the profiles needed to evaluate that deviation
    /// against the mixture's support are not all present (or carry missing
    /// data with positive probability).
    ///
    /// # Examples
    /// ```
    /// use ndarray::array;
    /// use rsgame::Game;
    ///
    /// // 2-player rock-paper-scissors.
    /// let rps = Game::numbered(
    ///     &[2],
    ///     &[3],
    ///     vec![
    ///         vec![2, 0, 0], vec![1, 1, 0], vec![1, 0, 1],
    ///         vec![0, 2, 0], vec![0, 1, 1], vec![0, 0, 2],
    ///     ],
    ///     vec![
    ///         vec![0.0, 0.0, 0.0], vec![-1.0, 1.0, 0.0], vec![1.0, 0.0, -1.0],
    ///         vec![0.0, 0.0, 0.0], vec![0.0, -1.0, 1.0], vec![0.0, 0.0, 0.0],
    ///     ],
    /// ).unwrap();
    ///
    /// let uniform = array![1.0, 1.0, 1.0] / 3.0;
    /// let devs = rps.deviation_payoffs(uniform.view());
    /// assert!(devs.iter().all(|&d| d.abs() < 1e-12));
    /// ```
    pub fn deviation_payoffs(&self, mixture: ArrayView1<f64>) -> Array1<f64> {
        self.deviation_payoffs_impl(mixture, false, false).0
    }

    /// [`deviation_payoffs`](Self::deviation_payoffs) together with its
    /// jacobian with respect to the mixture.
    ///
    /// Jacobian entries `(s, t)` are NaN when the deviation payoff of `s`
    /// is NaN, or when `t` is outside the mixture's support and the game is
    /// incomplete (the boundary derivative would require profiles that
    /// cannot be certified present).
    pub fn deviation_payoffs_jacobian(
        &self,
        mixture: ArrayView1<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let (devs, jac) = self.deviation_payoffs_impl(mixture, true, false);
        (devs, jac.expect("jacobian was requested"))
    }

    /// [`deviation_payoffs`](Self::deviation_payoffs) with each strategy's
    /// column renormalized by its observed probability mass, yielding an
    /// estimate conditional on the observed rows instead of NaN when
    /// coverage is partial.
    pub fn deviation_payoffs_ignore_incomplete(&self, mixture: ArrayView1<f64>) -> Array1<f64> {
        self.deviation_payoffs_impl(mixture, false, true).0
    }

    /// The `ignore_incomplete` variant of
    /// [`deviation_payoffs_jacobian`](Self::deviation_payoffs_jacobian).
    pub fn deviation_payoffs_jacobian_ignore_incomplete(
        &self,
        mixture: ArrayView1<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let (devs, jac) = self.deviation_payoffs_impl(mixture, true, true);
        (devs, jac.expect("jacobian was requested"))
    }

    fn deviation_payoffs_impl(
        &self,
        mixture: ArrayView1<f64>,
        jacobian: bool,
        ignore_incomplete: bool,
    ) -> (Array1<f64>, Option<Array2<f64>>) {
        let schema = self.schema();
        let num_strats = schema.num_strats();
        debug_assert_eq!(mixture.len(), num_strats);

        let supp: Vec<bool> = mixture.iter().map(|&p| p > 0.0).collect();
        let zmix: Array1<f64> = Array1::from_iter(
            mixture
                .iter()
                .enumerate()
                .map(|(strat, &p)| p + schema.zero_prob()[schema.strat_role(strat)]),
        );
        let log_mix = zmix.mapv(f64::ln);
        let dev_reps = self.dev_reps();

        let mut weighted = Array1::<f64>::zeros(num_strats);
        let mut mass = Array1::<f64>::zeros(num_strats);
        let mut present = vec![0u64; num_strats];
        let mut jac_pay = jacobian.then(|| Array2::<f64>::zeros((num_strats, num_strats)));
        let mut jac_mass = (jacobian && ignore_incomplete)
            .then(|| Array2::<f64>::zeros((num_strats, num_strats)));

        for (row, profile) in self.profiles.outer_iter().enumerate() {
            let prof_logprob: f64 = profile
                .iter()
                .zip(&log_mix)
                .map(|(&count, &lp)| count as f64 * lp)
                .sum();

            // Strategies the profile plays outside the mixture's support.
            // The opponent profile of a deviation from `s` drops one `s`
            // player, so it stays inside the support only if `s` is the lone
            // violation and is played exactly once.
            let mut bad_count = 0;
            let mut bad_strat = usize::MAX;
            for (strat, &count) in profile.iter().enumerate() {
                if count > 0 && !supp[strat] {
                    bad_count += 1;
                    bad_strat = strat;
                }
            }

            for (strat, &count) in profile.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let log_dev_prob = prof_logprob + dev_reps[[row, strat]] - log_mix[strat];
                let feasible = bad_count == 0
                    || (bad_count == 1 && bad_strat == strat && count == 1);
                let pay = self.payoffs[[row, strat]];

                if feasible {
                    let weight = log_dev_prob.exp();
                    weighted[strat] += weight * pay;
                    mass[strat] += weight;
                    present[strat] += 1;
                } else if pay.is_nan() {
                    // A missing observation with vanishing probability must
                    // not poison the sums or the jacobian.
                    continue;
                }

                if let Some(jac) = jac_pay.as_mut() {
                    for target in 0..num_strats {
                        let factor =
                            profile[target] as f64 - if target == strat { 1.0 } else { 0.0 };
                        if factor == 0.0 {
                            continue;
                        }
                        let weight = (log_dev_prob - log_mix[target]).exp();
                        if weight == 0.0 {
                            continue;
                        }
                        jac[[strat, target]] += weight * factor * pay;
                        if let Some(jm) = jac_mass.as_mut() {
                            jm[[strat, target]] += weight * factor;
                        }
                    }
                }
            }
        }

        let mut devs;
        if ignore_incomplete {
            devs = &weighted / &mass;
            if let (Some(jac), Some(jm)) = (jac_pay.as_mut(), jac_mass.as_ref()) {
                for strat in 0..num_strats {
                    for target in 0..num_strats {
                        jac[[strat, target]] = jac[[strat, target]] / mass[strat]
                            - devs[strat] * jm[[strat, target]] / mass[strat];
                    }
                }
            }
        } else {
            devs = weighted;
            self.mask_unresolved_deviations(&supp, &present, &mut devs);
            if let Some(jac) = jac_pay.as_mut() {
                let complete = self.is_complete();
                for strat in 0..num_strats {
                    if devs[strat].is_nan() {
                        jac.row_mut(strat).fill(f64::NAN);
                    }
                }
                if !complete {
                    for target in 0..num_strats {
                        if !supp[target] {
                            jac.column_mut(target).fill(f64::NAN);
                        }
                    }
                }
            }
        }

        (devs, jac_pay)
    }

    /// NaN out deviation payoffs whose supporting data is incomplete: a
    /// strategy's estimate is meaningful only when every profile pairing it
    /// with an opponent profile over the mixture's support is present.
    fn mask_unresolved_deviations(
        &self,
        supp: &[bool],
        present: &[u64],
        devs: &mut Array1<f64>,
    ) {
        if self.is_complete() {
            return;
        }
        let schema = self.schema();
        let supp_counts: Vec<u64> = (0..schema.num_roles())
            .map(|role| {
                schema.role_span(role).filter(|&strat| supp[strat]).count() as u64
            })
            .collect();
        for strat in 0..schema.num_strats() {
            let role = schema.strat_role(strat);
            let needed: u128 = (0..schema.num_roles())
                .map(|other| {
                    let players =
                        schema.num_role_players()[other] as u64 - u64::from(other == role);
                    multiset_count(players, supp_counts[other])
                })
                .product();
            if (present[strat] as u128) < needed {
                devs[strat] = f64::NAN;
            }
        }
    }

    /// The expected payoff to each role under a mixture: the mixture-weighted
    /// sum of its strategies' deviation payoffs.
    pub fn expected_payoffs(&self, mixture: ArrayView1<f64>) -> Array1<f64> {
        let devs = self.deviation_payoffs(mixture);
        self.expected_from_deviations(mixture, devs.view())
    }

    /// [`expected_payoffs`](Self::expected_payoffs) together with its
    /// jacobian, one row per role.
    pub fn expected_payoffs_jacobian(
        &self,
        mixture: ArrayView1<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let schema = self.schema();
        let (devs, dev_jac) = self.deviation_payoffs_jacobian(mixture);
        let expected = self.expected_from_deviations(mixture, devs.view());
        let mut jac = Array2::zeros((schema.num_roles(), schema.num_strats()));
        for target in 0..schema.num_strats() {
            jac[[schema.strat_role(target), target]] = devs[target];
        }
        for (strat, &prob) in mixture.iter().enumerate() {
            if prob > 0.0 {
                let role = schema.strat_role(strat);
                for target in 0..schema.num_strats() {
                    jac[[role, target]] += prob * dev_jac[[strat, target]];
                }
            }
        }
        (expected, jac)
    }

    fn expected_from_deviations(
        &self,
        mixture: ArrayView1<f64>,
        devs: ArrayView1<f64>,
    ) -> Array1<f64> {
        let schema = self.schema();
        let mut expected = Array1::zeros(schema.num_roles());
        for (strat, (&prob, &dev)) in mixture.iter().zip(devs).enumerate() {
            if prob > 0.0 {
                expected[schema.strat_role(strat)] += prob * dev;
            }
        }
        expected
    }

    /// The best response to a mixture: for each role, a uniform distribution
    /// over the strategies with maximal deviation payoff. Payoffs within a
    /// relative tolerance of the maximum share the mass; NaN deviation
    /// payoffs are excluded, and a role with only NaN deviations gets a NaN
    /// slice.
    pub fn best_response(&self, mixture: ArrayView1<f64>) -> Array1<f64> {
        let schema = self.schema();
        let devs = self.deviation_payoffs(mixture);
        let best = schema.role_fmax(devs.view());
        let mut response = Array1::zeros(schema.num_strats());
        for role in 0..schema.num_roles() {
            let span = schema.role_span(role);
            let tol = 1e-10 * best[role].abs().max(1.0);
            let is_tie = |strat: usize| best[role] - devs[strat] <= tol;
            let ties = span.clone().filter(|&strat| is_tie(strat)).count();
            if ties == 0 {
                response.slice_mut(s![span]).fill(f64::NAN);
            } else {
                let share = 1.0 / ties as f64;
                for strat in span {
                    if is_tie(strat) {
                        response[strat] = share;
                    }
                }
            }
        }
        response
    }

    /// The minimum observed payoff to each strategy, ignoring missing data;
    /// NaN for strategies with no observations.
    pub fn min_strat_payoffs(&self) -> &Array1<f64> {
        self.min_strat
            .get_or_init(|| self.strat_payoff_bound(f64::min))
    }

    /// The maximum observed payoff to each strategy, ignoring missing data;
    /// NaN for strategies with no observations.
    pub fn max_strat_payoffs(&self) -> &Array1<f64> {
        self.max_strat
            .get_or_init(|| self.strat_payoff_bound(f64::max))
    }

    /// The minimum observed payoff in each role.
    pub fn min_role_payoffs(&self) -> Array1<f64> {
        self.schema()
            .role_reduce(self.min_strat_payoffs().view(), f64::NAN, f64::min)
    }

    /// The maximum observed payoff in each role.
    pub fn max_role_payoffs(&self) -> Array1<f64> {
        self.schema()
            .role_reduce(self.max_strat_payoffs().view(), f64::NAN, f64::max)
    }

    fn strat_payoff_bound(&self, fold: fn(f64, f64) -> f64) -> Array1<f64> {
        let mut bound = Array1::from_elem(self.schema().num_strats(), f64::NAN);
        for (profile, payoff) in self.profiles.outer_iter().zip(self.payoffs.outer_iter()) {
            for (strat, (&count, &pay)) in profile.iter().zip(payoff).enumerate() {
                if count > 0 {
                    // f64::min and f64::max both discard a NaN operand.
                    bound[strat] = fold(bound[strat], pay);
                }
            }
        }
        bound
    }

    /// A copy of this game with each role's payoffs affinely rescaled to
    /// span `[0, 1]`. Roles with no payoff spread (or no data) are shifted
    /// but not scaled.
    pub fn normalize(&self) -> Game {
        let schema = self.schema();
        let min = self.min_role_payoffs();
        let max = self.max_role_payoffs();
        let offset: Array1<f64> = min.mapv(|m| if m.is_nan() { 0.0 } else { m });
        let scale: Array1<f64> = max
            .iter()
            .zip(&min)
            .map(|(&hi, &lo)| {
                let spread = hi - lo;
                if spread.is_nan() || spread == 0.0 {
                    1.0
                } else {
                    spread
                }
            })
            .collect();
        let offset_wide = schema.role_repeat(offset.view());
        let scale_wide = schema.role_repeat(scale.view());

        let mut payoffs = self.payoffs.clone();
        for (mut payoff, profile) in payoffs.outer_iter_mut().zip(self.profiles.outer_iter()) {
            for (strat, &count) in profile.iter().enumerate() {
                if count > 0 {
                    payoff[strat] = (payoff[strat] - offset_wide[strat]) / scale_wide[strat];
                }
            }
        }
        Game::from_base(self.base.clone(), self.profiles.clone(), payoffs)
            .expect("rescaling preserves payoff invariants")
    }

    /// The sub-game induced by a restriction: the profiles whose support
    /// lies inside the mask, with payoff rows sliced to the kept columns.
    pub fn restrict(&self, restriction: &Restriction) -> Game {
        let keep: Vec<usize> = restriction.kept_indices();
        let rows: Vec<usize> = self
            .profiles
            .outer_iter()
            .enumerate()
            .filter(|(_, profile)| {
                profile
                    .iter()
                    .enumerate()
                    .all(|(strat, &count)| count == 0 || restriction[strat])
            })
            .map(|(row, _)| row)
            .collect();
        let profiles = self
            .profiles
            .select(ndarray::Axis(0), &rows)
            .select(ndarray::Axis(1), &keep);
        let payoffs = self
            .payoffs
            .select(ndarray::Axis(0), &rows)
            .select(ndarray::Axis(1), &keep);
        Game::new(restriction.sub_schema(self.schema()), profiles, payoffs)
            .expect("a restriction of a valid game is valid")
    }
}

impl PartialEq for Game {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.profiles == other.profiles
            && self.payoffs.dim() == other.payoffs.dim()
            && self
                .payoffs
                .iter()
                .zip(other.payoffs.iter())
                .all(|(&a, &b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

impl fmt::Debug for Game {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "Game({:?}, {:?}, {} / {})",
            self.schema().num_role_players(),
            self.schema().num_role_strats(),
            self.num_profiles(),
            self.schema().num_all_profiles()
        )
    }
}

fn compare_rows(rows: &Array2<u32>, a: usize, b: usize) -> std::cmp::Ordering {
    rows.row(a).iter().cmp(rows.row(b).iter())
}

pub(crate) fn rows_to_array<T: Clone>(
    rows: Vec<Vec<T>>,
    width: usize,
) -> Result<Array2<T>, String> {
    let height = rows.len();
    let mut flat = Vec::with_capacity(height * width);
    for row in &rows {
        if row.len() != width {
            return Err(format!(
                "row has length {}, expected {}",
                row.len(),
                width
            ));
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((height, width), flat).map_err(|err| err.to_string())
}

/// `ln(k!)` for `k` in `0..=max`.
fn ln_factorials(max: usize) -> Vec<f64> {
    let mut table = Vec::with_capacity(max + 1);
    table.push(0.0);
    for k in 1..=max {
        table.push(table[k - 1] + (k as f64).ln());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use test_log::test;

    fn assert_close(actual: ArrayView1<f64>, expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "length mismatch");
        for (index, (&a, &e)) in actual.iter().zip(expected).enumerate() {
            let same = (a.is_nan() && e.is_nan()) || (a - e).abs() <= 1e-8;
            assert!(same, "index {}: got {}, expected {}", index, a, e);
        }
    }

    fn rps() -> Game {
        Game::numbered(
            &[2],
            &[3],
            vec![
                vec![2, 0, 0],
                vec![1, 1, 0],
                vec![1, 0, 1],
                vec![0, 2, 0],
                vec![0, 1, 1],
                vec![0, 0, 2],
            ],
            vec![
                vec![0.0, 0.0, 0.0],
                vec![-1.0, 1.0, 0.0],
                vec![1.0, 0.0, -1.0],
                vec![0.0, 0.0, 0.0],
                vec![0.0, -1.0, 1.0],
                vec![0.0, 0.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn construction_rejects_shape_violations() {
        // Payoff row count mismatch.
        assert!(Game::numbered(&[1], &[1], vec![vec![1]], vec![]).is_err());
        // Role sum violations.
        assert!(Game::numbered(&[1], &[1], vec![vec![2]], vec![vec![0.0]]).is_err());
        assert!(Game::numbered(&[1], &[2], vec![vec![1]], vec![vec![0.0]]).is_err());
        // Nonzero payoff at an unplayed strategy.
        assert!(
            Game::numbered(&[1], &[2], vec![vec![1, 0]], vec![vec![0.0, 1.0]]).is_err()
        );
        // NaN payoff at an unplayed strategy.
        assert!(Game::numbered(
            &[2],
            &[2],
            vec![vec![2, 0]],
            vec![vec![f64::NAN, f64::NAN]],
        )
        .is_err());
        // Repeated profile.
        assert!(Game::numbered(
            &[1],
            &[2],
            vec![vec![1, 0], vec![1, 0]],
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        )
        .is_err());
    }

    #[test]
    fn counts_and_predicates() {
        let game = Game::numbered(
            &[1, 3],
            &[2, 2],
            vec![vec![1, 0, 3, 0], vec![1, 0, 2, 1]],
            vec![vec![0.0, 0.0, 0.0, 0.0], vec![f64::NAN, 0.0, 0.0, 0.0]],
        )
        .unwrap();
        assert_eq!(game.num_profiles(), 2);
        assert_eq!(game.num_complete_profiles(), 1);
        assert!(!game.is_empty());
        assert!(!game.is_complete());

        let empty = Game::empty(EmptyGame::numbered(&[2], &[2]).unwrap());
        assert!(empty.is_empty());
        assert!(empty.is_constant_sum());
        assert_eq!(empty.num_complete_profiles(), 0);
    }

    #[test]
    fn equality_ignores_row_order() {
        let a = Game::numbered(
            &[4],
            &[2],
            vec![vec![3, 1], vec![2, 2]],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        )
        .unwrap();
        let b = Game::numbered(
            &[4],
            &[2],
            vec![vec![2, 2], vec![3, 1]],
            vec![vec![3.0, 4.0], vec![1.0, 2.0]],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn get_payoffs_present_and_missing() {
        let game = Game::numbered(
            &[2, 3],
            &[3, 2],
            vec![vec![2, 0, 0, 2, 1], vec![1, 1, 0, 0, 3]],
            vec![
                vec![1.0, 0.0, 0.0, 2.0, 3.0],
                vec![4.0, 5.0, 0.0, 0.0, f64::NAN],
            ],
        )
        .unwrap();
        assert_close(
            game.get_payoffs(&[2, 0, 0, 2, 1]).unwrap().view(),
            &[1.0, 0.0, 0.0, 2.0, 3.0],
        );
        assert_close(
            game.get_payoffs(&[1, 1, 0, 0, 3]).unwrap().view(),
            &[4.0, 5.0, 0.0, 0.0, f64::NAN],
        );
        assert_close(
            game.get_payoffs(&[2, 0, 0, 3, 0]).unwrap().view(),
            &[f64::NAN, 0.0, 0.0, f64::NAN, 0.0],
        );
        assert!(game.get_payoffs(&[1, 0, 0, 2, 1]).is_err());
        assert!(game.contains(&[2, 0, 0, 2, 1]));
        assert!(!game.contains(&[2, 0, 0, 3, 0]));
    }

    #[test]
    fn dev_reps_match_known_values() {
        let game = Game::numbered(
            &[1000],
            &[2],
            vec![vec![1000, 0], vec![500, 500]],
            vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        )
        .unwrap();
        let reps = game.dev_reps();
        // Rows are in canonical order: [500, 500] sorts first.
        assert!((reps[[0, 0]] - 688.77411439).abs() < 1e-6);
        assert!((reps[[0, 1]] - 688.77411439).abs() < 1e-6);
        assert_eq!(reps[[1, 0]], 0.0);
        assert_eq!(reps[[1, 1]], f64::NEG_INFINITY);

        let game = Game::numbered(
            &[12],
            &[12],
            vec![
                {
                    let mut p = vec![0; 12];
                    p[0] = 12;
                    p
                },
                vec![1; 12],
            ],
            vec![vec![0.0; 12], vec![0.0; 12]],
        )
        .unwrap();
        let reps = game.dev_reps();
        let ones_row = game.row_index(&[1; 12]).unwrap();
        for strat in 0..12 {
            assert!((reps[[ones_row, strat]] - 17.50230785).abs() < 1e-6);
        }
    }

    #[test]
    fn rps_deviation_payoffs_and_jacobian() {
        let game = rps();
        assert!(game.is_constant_sum());
        let uniform = Array1::from_elem(3, 1.0 / 3.0);
        let (devs, jac) = game.deviation_payoffs_jacobian(uniform.view());
        assert_close(devs.view(), &[0.0, 0.0, 0.0]);
        let expected = array![[0.0, -1.0, 1.0], [1.0, 0.0, -1.0], [-1.0, 1.0, 0.0]];
        for strat in 0..3 {
            for target in 0..3 {
                assert!(
                    (jac[[strat, target]] - expected[[strat, target]]).abs() < 1e-8,
                    "jac[{}, {}] = {}",
                    strat,
                    target,
                    jac[[strat, target]]
                );
            }
        }

        let plain = game.deviation_payoffs(uniform.view());
        assert_eq!(plain, devs);
    }

    #[test]
    fn missing_data_masks_deviations() {
        let game = Game::numbered(
            &[3],
            &[4],
            vec![vec![3, 0, 0, 0], vec![2, 1, 0, 0], vec![2, 0, 1, 0]],
            vec![
                vec![1.0, 0.0, 0.0, 0.0],
                vec![f64::NAN, 2.0, 0.0, 0.0],
                vec![5.0, 0.0, f64::NAN, 0.0],
            ],
        )
        .unwrap();
        let devs = game.deviation_payoffs(array![1.0, 0.0, 0.0, 0.0].view());
        assert_close(devs.view(), &[1.0, 2.0, f64::NAN, f64::NAN]);
    }

    #[test]
    fn nan_payoffs_off_support_do_not_leak() {
        let game = Game::numbered(
            &[3, 3],
            &[2, 2],
            vec![
                vec![3, 0, 3, 0],
                vec![2, 1, 3, 0],
                vec![3, 0, 2, 1],
            ],
            vec![
                vec![1.0, 0.0, 2.0, 0.0],
                vec![f64::NAN, 3.0, f64::NAN, 0.0],
                vec![f64::NAN, 0.0, f64::NAN, 4.0],
            ],
        )
        .unwrap();
        let devs = game.deviation_payoffs(array![1.0, 0.0, 1.0, 0.0].view());
        assert_close(devs.view(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn deviation_payoffs_respect_mixture_support() {
        let base = EmptyGame::numbered(&[2, 2], &[3, 3]).unwrap();
        let profiles = vec![
            vec![2, 0, 0, 2, 0, 0],
            vec![1, 1, 0, 2, 0, 0],
            vec![0, 2, 0, 2, 0, 0],
        ];
        let payoffs = vec![
            vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0],
            vec![3.0, 4.0, 0.0, 5.0, 0.0, 0.0],
            vec![0.0, 6.0, 0.0, 7.0, 0.0, 0.0],
        ];
        let game = Game::from_base(
            base,
            rows_to_array(profiles, 6).unwrap(),
            rows_to_array(payoffs, 6).unwrap(),
        )
        .unwrap();

        let devs = game.deviation_payoffs(array![0.5, 0.5, 0.0, 0.3, 0.7, 0.0].view());
        assert!(devs.iter().all(|d| d.is_nan()));

        let devs = game.deviation_payoffs(array![0.5, 0.5, 0.0, 1.0, 0.0, 0.0].view());
        assert_close(
            devs.view(),
            &[2.0, 5.0, f64::NAN, 4.75, f64::NAN, f64::NAN],
        );
    }

    #[test]
    fn ignore_incomplete_matches_on_covered_support() {
        let game = Game::numbered(
            &[3, 2],
            &[2, 3],
            vec![
                vec![3, 0, 2, 0, 0],
                vec![2, 1, 2, 0, 0],
                vec![3, 0, 1, 1, 0],
                vec![3, 0, 1, 0, 1],
            ],
            vec![
                vec![0.5, 0.0, 0.25, 0.0, 0.0],
                vec![0.75, 0.125, 0.5, 0.0, 0.0],
                vec![0.25, 0.0, 0.625, 0.875, 0.0],
                vec![0.375, 0.0, 0.125, 0.0, 0.0625],
            ],
        )
        .unwrap();
        let mixture = array![1.0, 0.0, 1.0, 0.0, 0.0];
        let devs = game.deviation_payoffs(mixture.view());
        let ignored = game.deviation_payoffs_ignore_incomplete(mixture.view());
        for (a, b) in devs.iter().zip(&ignored) {
            assert!((a - b).abs() < 1e-8);
        }
    }

    #[test]
    fn jacobian_matches_finite_differences_on_complete_games() {
        let base = EmptyGame::numbered(&[2, 1], &[2, 2]).unwrap();
        let profiles = base.all_profiles();
        let mut payoffs = Array2::zeros(profiles.dim());
        for (row, profile) in profiles.outer_iter().enumerate() {
            for (strat, &count) in profile.iter().enumerate() {
                if count > 0 {
                    // An arbitrary but deterministic payoff surface.
                    payoffs[[row, strat]] =
                        ((row + 1) as f64 * 0.37 + strat as f64 * 0.61).sin();
                }
            }
        }
        let game = Game::from_base(base, profiles, payoffs).unwrap();
        assert!(game.is_complete());

        let mixture = array![0.3, 0.7, 0.6, 0.4];
        let (devs, jac) = game.deviation_payoffs_jacobian(mixture.view());
        let step = 1e-7;
        for target in 0..4 {
            let mut up = mixture.clone();
            up[target] += step;
            let mut down = mixture.clone();
            down[target] -= step;
            let bumped =
                (&game.deviation_payoffs(up.view()) - &game.deviation_payoffs(down.view()))
                    / (2.0 * step);
            for strat in 0..4 {
                assert!(
                    (jac[[strat, target]] - bumped[strat]).abs() < 1e-5,
                    "jac[{}, {}] = {} vs {}",
                    strat,
                    target,
                    jac[[strat, target]],
                    bumped[strat]
                );
            }
        }
        // The two entry points agree bitwise on the payoffs.
        assert_eq!(game.deviation_payoffs(mixture.view()), devs);
    }

    #[test]
    fn empty_game_numeric_results_are_nan() {
        let game = Game::empty(EmptyGame::numbered(&[2, 1], &[2, 2]).unwrap());
        let mixture = game.base().schema().uniform_mixture();
        assert!(game.deviation_payoffs(mixture.view()).iter().all(|d| d.is_nan()));
        let (devs, jac) = game.deviation_payoffs_jacobian(mixture.view());
        assert!(devs.iter().all(|d| d.is_nan()));
        assert!(jac.iter().all(|d| d.is_nan()));
        assert!(game.expected_payoffs(mixture.view()).iter().all(|d| d.is_nan()));
        assert!(game.best_response(mixture.view()).iter().all(|d| d.is_nan()));
        assert!(game.min_strat_payoffs().iter().all(|d| d.is_nan()));
        assert!(game.max_role_payoffs().iter().all(|d| d.is_nan()));
    }

    #[test]
    fn expected_payoffs_and_jacobian() {
        let game = Game::numbered(
            &[2],
            &[2],
            vec![vec![2, 0], vec![1, 1], vec![0, 2]],
            vec![vec![1.0, 0.0], vec![2.0, 3.0], vec![0.0, 4.0]],
        )
        .unwrap();
        let pays = game.expected_payoffs(array![0.2, 0.8].view());
        assert_close(pays.view(), &[3.4]);

        let game = Game::numbered(
            &[2],
            &[2],
            vec![vec![2, 0], vec![1, 1], vec![0, 2]],
            vec![vec![1.0, 0.0], vec![3.0, 3.0], vec![0.0, 1.0]],
        )
        .unwrap();
        let (pays, mut jac) = game.expected_payoffs_jacobian(array![0.5, 0.5].view());
        assert_close(pays.view(), &[2.0]);
        // Project onto the simplex tangent: a payoff maximum is flat there.
        let mean = (jac[[0, 0]] + jac[[0, 1]]) / 2.0;
        jac[[0, 0]] -= mean;
        jac[[0, 1]] -= mean;
        assert!(jac[[0, 0]].abs() < 1e-8 && jac[[0, 1]].abs() < 1e-8);
    }

    #[test]
    fn expected_payoffs_skip_unplayed_nans() {
        let game = Game::numbered(
            &[2, 2],
            &[2, 2],
            vec![vec![2, 0, 2, 0], vec![2, 0, 1, 1], vec![2, 0, 0, 2]],
            vec![
                vec![1.0, 0.0, 2.0, 0.0],
                vec![3.0, 0.0, 4.0, 5.0],
                vec![6.0, 0.0, 0.0, 7.0],
            ],
        )
        .unwrap();
        let pays = game.expected_payoffs(array![0.2, 0.8, 0.4, 0.6].view());
        assert!(pays.iter().all(|p| p.is_nan()));
        let pays = game.expected_payoffs(array![1.0, 0.0, 0.4, 0.6].view());
        assert_close(pays.view(), &[3.76, 5.0]);
    }

    #[test]
    fn best_response_mixes_over_ties() {
        let game = Game::numbered(
            &[1, 2],
            &[2, 2],
            vec![
                vec![1, 0, 2, 0],
                vec![1, 0, 1, 1],
                vec![1, 0, 0, 2],
                vec![0, 1, 2, 0],
                vec![0, 1, 1, 1],
                vec![0, 1, 0, 2],
            ],
            vec![
                vec![1.0, 0.0, 2.0, 0.0],
                vec![3.0, 0.0, 4.0, 5.0],
                vec![6.0, 0.0, 0.0, 7.0],
                vec![0.0, 8.0, 9.0, 0.0],
                vec![0.0, 10.0, 11.0, 12.0],
                vec![0.0, 13.0, 0.0, 14.0],
            ],
        )
        .unwrap();
        assert_close(
            game.best_response(array![1.0, 0.0, 1.0, 0.0].view()).view(),
            &[0.0, 1.0, 0.0, 1.0],
        );
        assert_close(
            game.best_response(array![0.0, 1.0, 0.0, 1.0].view()).view(),
            &[0.0, 1.0, 0.0, 1.0],
        );

        // Equal deviation payoffs split the mass.
        let game = Game::numbered(
            &[2],
            &[2],
            vec![vec![2, 0], vec![1, 1], vec![0, 2]],
            vec![vec![0.0, 0.0], vec![0.4, 0.6], vec![0.0, 0.0]],
        )
        .unwrap();
        assert_close(
            game.best_response(array![0.4, 0.6].view()).view(),
            &[0.5, 0.5],
        );
    }

    #[test]
    fn min_max_payoffs() {
        let game = Game::numbered(
            &[2, 2, 2, 2],
            &[2, 2, 2, 2],
            vec![
                vec![1, 1, 1, 1, 2, 0, 2, 0],
                vec![2, 0, 2, 0, 2, 0, 2, 0],
            ],
            vec![
                vec![f64::NAN, 1.0, 2.0, f64::NAN, 3.0, 0.0, f64::NAN, 0.0],
                vec![4.0, 0.0, 5.0, 0.0, 6.0, 0.0, f64::NAN, 0.0],
            ],
        )
        .unwrap();
        assert_close(
            game.min_strat_payoffs().view(),
            &[4.0, 1.0, 2.0, f64::NAN, 3.0, f64::NAN, f64::NAN, f64::NAN],
        );
        assert_close(game.min_role_payoffs().view(), &[1.0, 2.0, 3.0, f64::NAN]);
        assert_close(
            game.max_strat_payoffs().view(),
            &[4.0, 1.0, 5.0, f64::NAN, 6.0, f64::NAN, f64::NAN, f64::NAN],
        );
        assert_close(game.max_role_payoffs().view(), &[4.0, 5.0, 6.0, f64::NAN]);
    }

    #[test]
    fn constant_sum_detection() {
        let game = Game::numbered(
            &[1, 1],
            &[2, 2],
            vec![
                vec![1, 0, 1, 0],
                vec![1, 0, 0, 1],
                vec![0, 1, 1, 0],
                vec![0, 1, 0, 1],
            ],
            vec![
                vec![2.0, 0.0, -2.0, 0.0],
                vec![3.0, 0.0, 0.0, -3.0],
                vec![0.0, 5.0, -5.0, 0.0],
                vec![0.0, 1.0, 0.0, -1.0],
            ],
        )
        .unwrap();
        assert!(game.is_constant_sum());

        let game = Game::numbered(
            &[1, 1],
            &[2, 2],
            vec![
                vec![1, 0, 1, 0],
                vec![1, 0, 0, 1],
                vec![0, 1, 1, 0],
                vec![0, 1, 0, 1],
            ],
            vec![
                vec![1.0, 0.0, 2.0, 0.0],
                vec![3.0, 0.0, 0.0, 4.0],
                vec![0.0, 5.0, 6.0, 0.0],
                vec![0.0, 7.0, 0.0, 8.0],
            ],
        )
        .unwrap();
        assert!(!game.is_constant_sum());
    }

    #[test]
    fn normalize_spans_unit_interval() {
        let game = Game::numbered(
            &[2],
            &[2],
            vec![vec![2, 0], vec![1, 1], vec![0, 2]],
            vec![vec![1.0, 0.0], vec![2.0, 3.0], vec![0.0, 5.0]],
        )
        .unwrap();
        let normed = game.normalize();
        assert_close(normed.min_role_payoffs().view(), &[0.0]);
        assert_close(normed.max_role_payoffs().view(), &[1.0]);
        // Unplayed entries stay exactly zero.
        for (profile, payoff) in normed.profiles().outer_iter().zip(normed.payoffs().outer_iter())
        {
            for (&count, &pay) in profile.iter().zip(payoff) {
                if count == 0 {
                    assert_eq!(pay, 0.0);
                }
            }
        }
    }

    #[test]
    fn restriction_slices_profiles_and_payoffs() {
        let game = Game::numbered(
            &[2, 2],
            &[2, 2],
            vec![
                vec![2, 0, 2, 0],
                vec![1, 1, 2, 0],
                vec![0, 2, 2, 0],
            ],
            vec![
                vec![1.0, 0.0, 2.0, 0.0],
                vec![3.0, 4.0, 5.0, 0.0],
                vec![0.0, 6.0, 7.0, 0.0],
            ],
        )
        .unwrap();
        let restriction = Restriction::new(
            game.schema(),
            vec![true, false, true, false],
        )
        .unwrap();
        let sub = game.restrict(&restriction);
        assert_eq!(sub.num_profiles(), 1);
        assert_eq!(sub.profiles().row(0).to_vec(), vec![2, 2]);
        assert_close(sub.payoffs().row(0), &[1.0, 2.0]);

        // A restriction of the payoffs round-trips through translation.
        for profile in sub.base().all_profiles().outer_iter() {
            let full = restriction.translate_profile(profile.as_slice().unwrap());
            let full_pays = game.get_payoffs(&full).unwrap();
            let sub_pays = sub.get_payoffs(profile.as_slice().unwrap()).unwrap();
            for (sub_strat, &full_strat) in restriction.kept_indices().iter().enumerate() {
                let a = sub_pays[sub_strat];
                let b = full_pays[full_strat];
                assert!(a == b || (a.is_nan() && b.is_nan()));
            }
        }
    }
}
