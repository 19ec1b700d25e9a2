use ndarray::{Array1, ArrayView1};
use std::ops::Range;

use crate::{GameError, GameResult};

/// The immutable description of a role-symmetric game's structure.
///
/// A schema lists the game's roles in lexicographic order and, for each role,
/// a player count and a lexicographically ordered set of strategy names.
/// Players within a role are interchangeable, so everything downstream
/// (profiles, mixtures, payoff rows) is indexed by *global strategy offset*:
/// the position of a strategy in the concatenation of every role's strategy
/// list. All derived index data (role offsets, per-strategy role lookup, the
/// total number of legal profiles) is computed once at construction.
///
/// # Examples
/// ```
/// use rsgame::Schema;
///
/// let schema = Schema::new(vec![
///     ("buyers".to_string(), 2, vec!["accept".to_string(), "reject".to_string()]),
///     ("sellers".to_string(), 1, vec!["ask".to_string()]),
/// ]).unwrap();
///
/// assert_eq!(schema.num_roles(), 2);
/// assert_eq!(schema.num_strats(), 3);
/// assert_eq!(schema.role_starts(), &[0, 2]);
/// assert_eq!(schema.num_all_profiles(), 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    role_names: Vec<String>,
    num_role_players: Vec<u32>,
    strat_names: Vec<Vec<String>>,
    num_role_strats: Vec<usize>,
    role_starts: Vec<usize>,
    strat_roles: Vec<usize>,
    num_strats: usize,
    num_all_profiles: u64,
    zero_prob: Vec<f64>,
}

impl Schema {
    /// Construct a schema from `(role name, player count, strategy names)`
    /// triples.
    ///
    /// Roles are sorted by name and each role's strategies are sorted by
    /// name; every index exposed by this schema is derived from that order,
    /// regardless of the order given here.
    ///
    /// # Errors
    ///
    /// Returns a [schema error](GameError::Schema) if a role name is empty
    /// or repeated, a player count is zero, a role has no strategies, or a
    /// strategy name is empty or repeated within its role.
    pub fn new(roles: Vec<(String, u32, Vec<String>)>) -> GameResult<Self> {
        if roles.is_empty() {
            return Err(GameError::Schema("at least one role is required".into()));
        }
        let mut roles = roles;
        roles.sort_by(|a, b| a.0.cmp(&b.0));

        let mut role_names = Vec::with_capacity(roles.len());
        let mut num_role_players = Vec::with_capacity(roles.len());
        let mut strat_names = Vec::with_capacity(roles.len());
        for (name, players, mut strats) in roles {
            if name.is_empty() {
                return Err(GameError::Schema("empty role name".into()));
            }
            if role_names.last() == Some(&name) {
                return Err(GameError::Schema(format!("duplicate role name: {}", name)));
            }
            if players == 0 {
                return Err(GameError::Schema(format!(
                    "role {} must have at least one player",
                    name
                )));
            }
            if strats.is_empty() {
                return Err(GameError::Schema(format!(
                    "role {} must have at least one strategy",
                    name
                )));
            }
            strats.sort();
            for pair in strats.windows(2) {
                if pair[0] == pair[1] {
                    return Err(GameError::Schema(format!(
                        "duplicate strategy {} in role {}",
                        pair[0], name
                    )));
                }
            }
            if strats.iter().any(String::is_empty) {
                return Err(GameError::Schema(format!(
                    "empty strategy name in role {}",
                    name
                )));
            }
            role_names.push(name);
            num_role_players.push(players);
            strat_names.push(strats);
        }

        let num_role_strats: Vec<usize> = strat_names.iter().map(Vec::len).collect();
        let mut role_starts = Vec::with_capacity(role_names.len());
        let mut strat_roles = Vec::new();
        let mut num_strats = 0;
        for (role, &count) in num_role_strats.iter().enumerate() {
            role_starts.push(num_strats);
            num_strats += count;
            strat_roles.extend(std::iter::repeat(role).take(count));
        }

        let num_all_profiles = num_role_players
            .iter()
            .zip(&num_role_strats)
            .map(|(&n, &s)| multiset_count(n as u64, s as u64))
            .product::<u128>()
            .try_into()
            .unwrap_or(u64::MAX);

        let zero_prob = num_role_players
            .iter()
            .map(|&n| f64::MIN_POSITIVE * (n as f64 + 1.0))
            .collect();

        Ok(Schema {
            role_names,
            num_role_players,
            strat_names,
            num_role_strats,
            role_starts,
            strat_roles,
            num_strats,
            num_all_profiles,
            zero_prob,
        })
    }

    /// Construct a schema with generated names: roles `r0, r1, ...` and
    /// strategies `s0, s1, ...` numbered consecutively across roles.
    ///
    /// Convenient for tests and anonymous games where only the counts
    /// matter.
    ///
    /// # Examples
    /// ```
    /// use rsgame::Schema;
    ///
    /// let schema = Schema::numbered(&[2, 3], &[3, 2]).unwrap();
    /// assert_eq!(schema.role_names(), &["r0", "r1"]);
    /// assert_eq!(schema.strat_names(1), &["s3", "s4"]);
    /// ```
    pub fn numbered(role_players: &[u32], role_strats: &[usize]) -> GameResult<Self> {
        if role_players.len() != role_strats.len() {
            return Err(GameError::Schema(format!(
                "{} player counts but {} strategy counts",
                role_players.len(),
                role_strats.len()
            )));
        }
        let mut strat = 0;
        let roles = role_players
            .iter()
            .zip(role_strats)
            .enumerate()
            .map(|(role, (&players, &strats))| {
                let names = (0..strats)
                    .map(|_| {
                        let name = format!("s{}", strat);
                        strat += 1;
                        name
                    })
                    .collect();
                (format!("r{}", role), players, names)
            })
            .collect();
        Schema::new(roles)
    }

    /// The number of roles.
    pub fn num_roles(&self) -> usize {
        self.role_names.len()
    }

    /// The total number of strategies across all roles, which is the length
    /// of every profile, mixture, and payoff vector.
    pub fn num_strats(&self) -> usize {
        self.num_strats
    }

    /// The number of players in each role.
    pub fn num_role_players(&self) -> &[u32] {
        &self.num_role_players
    }

    /// The number of strategies in each role.
    pub fn num_role_strats(&self) -> &[usize] {
        &self.num_role_strats
    }

    /// The offset of each role's first strategy in any strategy-indexed
    /// vector.
    pub fn role_starts(&self) -> &[usize] {
        &self.role_starts
    }

    /// The number of distinct legal profiles, saturating at `u64::MAX` for
    /// astronomically large games.
    pub fn num_all_profiles(&self) -> u64 {
        self.num_all_profiles
    }

    /// The role names, in their canonical (sorted) order.
    pub fn role_names(&self) -> &[String] {
        &self.role_names
    }

    /// The strategy names of one role, in their canonical (sorted) order.
    pub fn strat_names(&self, role: usize) -> &[String] {
        &self.strat_names[role]
    }

    /// The role a global strategy index belongs to.
    pub fn strat_role(&self, strat: usize) -> usize {
        self.strat_roles[strat]
    }

    /// The range of global strategy indices covered by a role.
    pub fn role_span(&self, role: usize) -> Range<usize> {
        let start = self.role_starts[role];
        start..start + self.num_role_strats[role]
    }

    /// Look up a role by name.
    pub fn role_index(&self, name: &str) -> Option<usize> {
        self.role_names.binary_search_by(|r| r.as_str().cmp(name)).ok()
    }

    /// Look up a strategy of a role by name, returning its global index.
    pub fn strat_index(&self, role: usize, name: &str) -> Option<usize> {
        self.strat_names[role]
            .binary_search_by(|s| s.as_str().cmp(name))
            .ok()
            .map(|i| self.role_starts[role] + i)
    }

    /// The name of a strategy given its global index.
    pub fn strat_name(&self, strat: usize) -> &str {
        let role = self.strat_roles[strat];
        &self.strat_names[role][strat - self.role_starts[role]]
    }

    /// The probability below which a mixture entry is numerically
    /// indistinguishable from zero for each role, used as the epsilon in the
    /// log-space deviation kernels.
    pub fn zero_prob(&self) -> &[f64] {
        &self.zero_prob
    }

    /// Fold a strategy-indexed vector down to one value per role.
    ///
    /// This is the primary reduction primitive; [`role_sum`](Self::role_sum),
    /// [`role_max`](Self::role_max), and [`role_fmax`](Self::role_fmax) are
    /// the folds everything else in the crate is built from.
    pub fn role_reduce<F>(&self, values: ArrayView1<f64>, init: f64, op: F) -> Array1<f64>
    where
        F: Fn(f64, f64) -> f64,
    {
        let mut out = Array1::from_elem(self.num_roles(), init);
        for (strat, &value) in values.iter().enumerate() {
            let role = self.strat_roles[strat];
            out[role] = op(out[role], value);
        }
        out
    }

    /// Sum a strategy-indexed vector by role.
    pub fn role_sum(&self, values: ArrayView1<f64>) -> Array1<f64> {
        self.role_reduce(values, 0.0, |acc, v| acc + v)
    }

    /// Maximum of a strategy-indexed vector by role, propagating NaN.
    pub fn role_max(&self, values: ArrayView1<f64>) -> Array1<f64> {
        self.role_reduce(values, f64::NEG_INFINITY, |acc, v| {
            if v.is_nan() || acc.is_nan() {
                f64::NAN
            } else {
                acc.max(v)
            }
        })
    }

    /// Maximum of a strategy-indexed vector by role, ignoring NaN entries.
    /// A role whose entries are all NaN reduces to NaN.
    pub fn role_fmax(&self, values: ArrayView1<f64>) -> Array1<f64> {
        self.role_reduce(values, f64::NAN, |acc, v| {
            // f64::max returns the non-NaN operand when exactly one is NaN
            acc.max(v)
        })
    }

    /// Broadcast a role-indexed vector to strategy width.
    ///
    /// # Examples
    /// ```
    /// use ndarray::array;
    /// use rsgame::Schema;
    ///
    /// let schema = Schema::numbered(&[2, 1], &[2, 1]).unwrap();
    /// let wide = schema.role_repeat(array![3.0, 7.0].view());
    /// assert_eq!(wide, array![3.0, 3.0, 7.0]);
    /// ```
    pub fn role_repeat(&self, values: ArrayView1<f64>) -> Array1<f64> {
        Array1::from_iter(self.strat_roles.iter().map(|&role| values[role]))
    }

    /// The mixture assigning equal probability to every strategy of each
    /// role.
    pub fn uniform_mixture(&self) -> Array1<f64> {
        Array1::from_iter(
            self.strat_roles
                .iter()
                .map(|&role| 1.0 / self.num_role_strats[role] as f64),
        )
    }

    /// Check that a count vector is a legal profile of this schema.
    ///
    /// # Errors
    ///
    /// Returns a [profile error](GameError::Profile) if the length is wrong
    /// or any role's counts do not sum to its player count.
    pub fn verify_profile(&self, profile: &[u32]) -> GameResult<()> {
        if profile.len() != self.num_strats {
            return Err(GameError::Profile(format!(
                "profile has length {}, schema has {} strategies",
                profile.len(),
                self.num_strats
            )));
        }
        for role in 0..self.num_roles() {
            let total: u32 = profile[self.role_span(role)].iter().sum();
            if total != self.num_role_players[role] {
                return Err(GameError::Profile(format!(
                    "role {} counts sum to {}, expected {}",
                    self.role_names[role], total, self.num_role_players[role]
                )));
            }
        }
        Ok(())
    }

    /// Check that a probability vector is a legal mixture of this schema:
    /// entries are nonnegative and each role slice sums to one within a
    /// small tolerance.
    pub fn verify_mixture(&self, mixture: ArrayView1<f64>) -> GameResult<()> {
        if mixture.len() != self.num_strats {
            return Err(GameError::Profile(format!(
                "mixture has length {}, schema has {} strategies",
                mixture.len(),
                self.num_strats
            )));
        }
        if mixture.iter().any(|&p| !(p >= 0.0)) {
            return Err(GameError::Profile(
                "mixture probabilities must be nonnegative".into(),
            ));
        }
        for role in 0..self.num_roles() {
            let total: f64 = mixture.slice(ndarray::s![self.role_span(role)]).sum();
            if (total - 1.0).abs() > 1e-8 {
                return Err(GameError::Profile(format!(
                    "role {} probabilities sum to {}, expected 1",
                    self.role_names[role], total
                )));
            }
        }
        Ok(())
    }
}

/// The number of multisets of size `n` drawn from `k` elements:
/// `C(n + k - 1, n)`.
pub(crate) fn multiset_count(n: u64, k: u64) -> u128 {
    binomial(n + k - 1, n)
}

fn binomial(n: u64, mut k: u64) -> u128 {
    if k > n {
        return 0;
    }
    if k > n - k {
        k = n - k;
    }
    let mut result: u128 = 1;
    for i in 1..=k {
        // Multiply before dividing; the intermediate product of a running
        // binomial coefficient is always divisible by i.
        result = result.saturating_mul((n - k + i) as u128) / i as u128;
    }
    result
}
