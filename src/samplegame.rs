use itertools::Itertools;
use ndarray::{Array1, Array2, Array3, Axis};
use rand::Rng;
use std::fmt;

use crate::paygame::rows_to_array;
use crate::{EmptyGame, Game, GameError, GameResult, Restriction, Schema};

/// How bootstrap draws are shared when [resampling](SampleGame::resample_using).
///
/// Each flag refines the granularity at which a fresh index vector into the
/// sample axis is drawn. With everything `false`, one index vector is shared
/// by every profile in a block; `per_strategy` draws a separate vector for
/// every payoff column and subsumes `per_role`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Independence {
    /// Draw fresh indices for every profile.
    pub per_profile: bool,
    /// Draw fresh indices for every role.
    pub per_role: bool,
    /// Draw fresh indices for every strategy.
    pub per_strategy: bool,
}

/// A role-symmetric game whose profiles carry bags of payoff observations.
///
/// Observations are grouped into *sample blocks*: maximal sets of profiles
/// sharing an observation depth, stored as one `(profiles × samples ×
/// strategies)` tensor each. Blocks are canonicalized at construction (one
/// block per distinct depth, sorted by depth, profiles sorted within each
/// block), so equality is independent of the order data arrived in.
///
/// # Examples
/// ```
/// use rsgame::SampleGame;
///
/// let game = SampleGame::numbered(
///     &[1, 1],
///     &[1, 2],
///     vec![vec![1, 1, 0], vec![1, 0, 1]],
///     vec![
///         vec![vec![vec![5.0, 2.0, 0.0]]],
///         vec![vec![vec![5.0, 0.0, 2.0], vec![6.0, 0.0, 3.0]]],
///     ],
/// ).unwrap();
///
/// assert_eq!(game.num_samples(), vec![1, 2]);
/// let collapsed = game.to_game();
/// assert_eq!(collapsed.get_payoffs(&[1, 0, 1]).unwrap().to_vec(), vec![5.5, 0.0, 2.5]);
/// ```
#[derive(Clone)]
pub struct SampleGame {
    base: EmptyGame,
    profiles: Array2<u32>,
    sample_payoffs: Vec<Array3<f64>>,
}

impl SampleGame {
    /// Construct a sample game from a schema, profile rows, and one
    /// observation tensor per block. The profile rows are the concatenation
    /// of every block's profiles, in block order.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensors do not cover exactly the profile
    /// rows, a block has zero observations or profiles, a profile is
    /// illegal or repeated, or an observation is nonzero or NaN at an
    /// unplayed strategy.
    pub fn new(
        schema: Schema,
        profiles: Array2<u32>,
        sample_payoffs: Vec<Array3<f64>>,
    ) -> GameResult<Self> {
        SampleGame::from_base(EmptyGame::new(schema), profiles, sample_payoffs)
    }

    /// Construct a sample game sharing the schema of an existing
    /// [`EmptyGame`].
    pub fn from_base(
        base: EmptyGame,
        profiles: Array2<u32>,
        sample_payoffs: Vec<Array3<f64>>,
    ) -> GameResult<Self> {
        let num_strats = base.num_strats();
        let block_rows: usize = sample_payoffs.iter().map(|block| block.dim().0).sum();
        if block_rows != profiles.nrows() {
            return Err(GameError::Samples(format!(
                "blocks cover {} profiles but {} were given",
                block_rows,
                profiles.nrows()
            )));
        }
        if profiles.nrows() == 0 {
            return Ok(SampleGame {
                base: base.clone(),
                profiles: Array2::zeros((0, num_strats)),
                sample_payoffs: Vec::new(),
            });
        }
        if profiles.ncols() != num_strats {
            return Err(GameError::Profile(format!(
                "profile rows have length {}, schema has {} strategies",
                profiles.ncols(),
                num_strats
            )));
        }

        // Validate blocks against their profile slices.
        let mut start = 0;
        for block in &sample_payoffs {
            let (block_profs, samples, width) = block.dim();
            if block_profs == 0 {
                return Err(GameError::Samples("a sample block has no profiles".into()));
            }
            if samples == 0 {
                return Err(GameError::Samples(
                    "a sample block has no observations".into(),
                ));
            }
            if width != num_strats {
                return Err(GameError::Samples(format!(
                    "observations have length {}, schema has {} strategies",
                    width, num_strats
                )));
            }
            for offset in 0..block_profs {
                let profile = profiles.row(start + offset);
                base.schema().verify_profile(profile.as_slice().unwrap())?;
                for sample in 0..samples {
                    for (strat, &count) in profile.iter().enumerate() {
                        let pay = block[[offset, sample, strat]];
                        if count == 0 && !(pay == 0.0) {
                            return Err(GameError::Samples(format!(
                                "observation {} at unplayed strategy {}",
                                pay,
                                base.schema().strat_name(strat)
                            )));
                        }
                    }
                }
            }
            start += block_profs;
        }

        // Canonicalize: group rows by depth, sort profiles within each
        // depth, sort blocks by depth.
        let mut by_depth: Vec<(usize, Vec<(Vec<u32>, Array2<f64>)>)> = Vec::new();
        let mut start = 0;
        for block in &sample_payoffs {
            let (block_profs, samples, _) = block.dim();
            let slot = match by_depth.iter().position(|(depth, _)| *depth == samples) {
                Some(slot) => slot,
                None => {
                    by_depth.push((samples, Vec::new()));
                    by_depth.len() - 1
                }
            };
            let entry = &mut by_depth[slot].1;
            for offset in 0..block_profs {
                entry.push((
                    profiles.row(start + offset).to_vec(),
                    block.index_axis(Axis(0), offset).to_owned(),
                ));
            }
            start += block_profs;
        }
        by_depth.sort_by_key(|(depth, _)| *depth);

        let mut canon_profiles = Vec::new();
        let mut canon_blocks = Vec::new();
        for (depth, mut rows) in by_depth {
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            for pair in rows.windows(2) {
                if pair[0].0 == pair[1].0 {
                    return Err(GameError::Samples(format!(
                        "profile {:?} appears more than once",
                        pair[0].0
                    )));
                }
            }
            let mut tensor = Array3::zeros((rows.len(), depth, num_strats));
            for (offset, (profile, observations)) in rows.into_iter().enumerate() {
                tensor
                    .index_axis_mut(Axis(0), offset)
                    .assign(&observations);
                canon_profiles.push(profile);
            }
            canon_blocks.push(tensor);
        }
        let canon_profiles = rows_to_array(canon_profiles, num_strats)
            .expect("canonicalized profiles are rectangular");

        // Duplicates across different depths.
        let mut sorted: Vec<Vec<u32>> = canon_profiles
            .outer_iter()
            .map(|row| row.to_vec())
            .collect();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(GameError::Samples(format!(
                    "profile {:?} appears in more than one sample block",
                    pair[0]
                )));
            }
        }

        Ok(SampleGame {
            base,
            profiles: canon_profiles,
            sample_payoffs: canon_blocks,
        })
    }

    /// Construct a sample game over a [generated-name schema](Schema::numbered)
    /// from nested vectors, one entry per block, each a
    /// `profiles × samples × strategies` nesting. A convenience for tests
    /// and small examples.
    pub fn numbered(
        role_players: &[u32],
        role_strats: &[usize],
        profiles: Vec<Vec<u32>>,
        sample_payoffs: Vec<Vec<Vec<Vec<f64>>>>,
    ) -> GameResult<Self> {
        let schema = Schema::numbered(role_players, role_strats)?;
        let num_strats = schema.num_strats();
        let mut blocks = Vec::with_capacity(sample_payoffs.len());
        for block in sample_payoffs {
            let block_profs = block.len();
            let samples = block.first().map_or(0, Vec::len);
            let mut tensor = Array3::zeros((block_profs, samples, num_strats));
            for (offset, observations) in block.into_iter().enumerate() {
                if observations.len() != samples {
                    return Err(GameError::Samples(
                        "profiles in one block must share an observation depth".into(),
                    ));
                }
                for (sample, row) in observations.into_iter().enumerate() {
                    if row.len() != num_strats {
                        return Err(GameError::Samples(format!(
                            "observation has length {}, expected {}",
                            row.len(),
                            num_strats
                        )));
                    }
                    for (strat, pay) in row.into_iter().enumerate() {
                        tensor[[offset, sample, strat]] = pay;
                    }
                }
            }
            blocks.push(tensor);
        }
        SampleGame::new(
            schema,
            rows_to_array(profiles, num_strats).map_err(GameError::Profile)?,
            blocks,
        )
    }

    /// Construct a sample game from per-profile observation sets of
    /// arbitrary depths, grouping profiles with equal depth into blocks.
    pub fn from_observations(
        base: EmptyGame,
        observations: Vec<(Vec<u32>, Array2<f64>)>,
    ) -> GameResult<Self> {
        let num_strats = base.num_strats();
        let mut by_depth: Vec<(usize, Vec<(Vec<u32>, Array2<f64>)>)> = Vec::new();
        for (profile, samples) in observations {
            if samples.nrows() == 0 {
                return Err(GameError::Samples(format!(
                    "profile {:?} has no observations",
                    profile
                )));
            }
            let depth = samples.nrows();
            match by_depth.iter().position(|(d, _)| *d == depth) {
                Some(slot) => by_depth[slot].1.push((profile, samples)),
                None => by_depth.push((depth, vec![(profile, samples)])),
            }
        }
        by_depth.sort_by_key(|(depth, _)| *depth);

        let mut profiles = Vec::new();
        let mut blocks = Vec::new();
        for (depth, rows) in by_depth {
            let mut tensor = Array3::zeros((rows.len(), depth, num_strats));
            for (offset, (profile, samples)) in rows.into_iter().enumerate() {
                if samples.ncols() != num_strats {
                    return Err(GameError::Samples(format!(
                        "observations have length {}, schema has {} strategies",
                        samples.ncols(),
                        num_strats
                    )));
                }
                tensor.index_axis_mut(Axis(0), offset).assign(&samples);
                profiles.push(profile);
            }
            blocks.push(tensor);
        }
        SampleGame::from_base(
            base,
            rows_to_array(profiles, num_strats).map_err(GameError::Profile)?,
            blocks,
        )
    }

    /// A sample game viewing each payoff row of a game as a single
    /// observation.
    pub fn from_game(game: &Game) -> Self {
        let num_strats = game.schema().num_strats();
        let rows = game.num_profiles();
        let blocks = if rows == 0 {
            Vec::new()
        } else {
            let mut tensor = Array3::zeros((rows, 1, num_strats));
            tensor.index_axis_mut(Axis(1), 0).assign(game.payoffs());
            vec![tensor]
        };
        SampleGame {
            base: game.base().clone(),
            profiles: game.profiles().clone(),
            sample_payoffs: blocks,
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

    /// The profile rows: each block's profiles in order, blocks ordered by
    /// observation depth.
    pub fn profiles(&self) -> &Array2<u32> {
        &self.profiles
    }

    /// The observation tensors, one per block.
    pub fn sample_payoffs(&self) -> &[Array3<f64>] {
        &self.sample_payoffs
    }

    /// The number of profiles with observations.
    pub fn num_profiles(&self) -> usize {
        self.profiles.nrows()
    }

    /// The observation depth of each block.
    pub fn num_samples(&self) -> Vec<usize> {
        self.sample_payoffs
            .iter()
            .map(|block| block.dim().1)
            .collect()
    }

    /// The number of profiles in each block.
    pub fn num_sample_profs(&self) -> Vec<usize> {
        self.sample_payoffs
            .iter()
            .map(|block| block.dim().0)
            .collect()
    }

    /// The offset of each block's first profile in the profile rows.
    pub fn sample_starts(&self) -> Vec<usize> {
        let mut starts = Vec::with_capacity(self.sample_payoffs.len());
        let mut start = 0;
        for block in &self.sample_payoffs {
            starts.push(start);
            start += block.dim().0;
        }
        starts
    }

    /// Collapse every observation bag to its mean, yielding a payoff game.
    pub fn to_game(&self) -> Game {
        let num_strats = self.schema().num_strats();
        let mut payoffs = Array2::zeros((self.num_profiles(), num_strats));
        let mut row = 0;
        for block in &self.sample_payoffs {
            for offset in 0..block.dim().0 {
                let mean = block
                    .index_axis(Axis(0), offset)
                    .mean_axis(Axis(0))
                    .expect("blocks have at least one observation");
                payoffs.row_mut(row).assign(&mean);
                row += 1;
            }
        }
        Game::from_base(self.base.clone(), self.profiles.clone(), payoffs)
            .expect("collapsing preserves payoff invariants")
    }

    /// The profile rows with each profile repeated once per observation.
    pub fn flat_profiles(&self) -> Array2<u32> {
        let num_strats = self.schema().num_strats();
        let total: usize = self
            .sample_payoffs
            .iter()
            .map(|block| block.dim().0 * block.dim().1)
            .sum();
        let mut flat = Array2::zeros((total, num_strats));
        let mut out = 0;
        let mut row = 0;
        for block in &self.sample_payoffs {
            for offset in 0..block.dim().0 {
                for _ in 0..block.dim().1 {
                    flat.row_mut(out).assign(&self.profiles.row(row + offset));
                    out += 1;
                }
            }
            row += block.dim().0;
        }
        flat
    }

    /// Every observation as its own payoff row, aligned with
    /// [`flat_profiles`](Self::flat_profiles).
    pub fn flat_payoffs(&self) -> Array2<f64> {
        let num_strats = self.schema().num_strats();
        let total: usize = self
            .sample_payoffs
            .iter()
            .map(|block| block.dim().0 * block.dim().1)
            .sum();
        let mut flat = Array2::zeros((total, num_strats));
        let mut out = 0;
        for block in &self.sample_payoffs {
            for offset in 0..block.dim().0 {
                for sample in 0..block.dim().1 {
                    flat.row_mut(out)
                        .assign(&block.index_axis(Axis(0), offset).row(sample));
                    out += 1;
                }
            }
        }
        flat
    }

    /// The observation matrix (`samples × strategies`) for a profile, empty
    /// if the profile has no data.
    ///
    /// # Errors
    ///
    /// Returns an error if the count vector is not a legal profile.
    pub fn get_sample_payoffs(&self, profile: &[u32]) -> GameResult<Array2<f64>> {
        self.schema().verify_profile(profile)?;
        let mut start = 0;
        for block in &self.sample_payoffs {
            let block_profs = block.dim().0;
            for offset in 0..block_profs {
                if self.profiles.row(start + offset).iter().eq(profile.iter()) {
                    return Ok(block.index_axis(Axis(0), offset).to_owned());
                }
            }
            start += block_profs;
        }
        Ok(Array2::zeros((0, self.schema().num_strats())))
    }

    /// Bootstrap the observations into a payoff game, using `rng` as the
    /// source of randomness.
    ///
    /// For each block, observation indices are drawn with replacement to the
    /// block's depth, and each profile's payoff row is the mean of the drawn
    /// observations. `independence` controls how widely each index vector is
    /// shared; with a single observation per profile every setting collapses
    /// to [`to_game`](Self::to_game) exactly.
    pub fn resample_using<R: Rng + ?Sized>(
        &self,
        independence: Independence,
        rng: &mut R,
    ) -> Game {
        let schema = self.schema();
        let num_strats = schema.num_strats();
        let mut payoffs = Array2::zeros((self.num_profiles(), num_strats));

        // One group of shared indices per strategy, role, or block.
        let groups: Vec<std::ops::Range<usize>> = if independence.per_strategy {
            (0..num_strats).map(|strat| strat..strat + 1).collect()
        } else if independence.per_role {
            (0..schema.num_roles()).map(|role| schema.role_span(role)).collect()
        } else {
            vec![0..num_strats]
        };

        let mut indices: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
        let mut row = 0;
        for block in &self.sample_payoffs {
            let (block_profs, depth, _) = block.dim();
            for draws in indices.iter_mut() {
                draws.clear();
                draws.resize(depth, 0);
            }
            let redraw = |indices: &mut Vec<Vec<usize>>, rng: &mut R| {
                for draws in indices.iter_mut() {
                    for index in draws.iter_mut() {
                        *index = rng.gen_range(0..depth);
                    }
                }
            };
            if !independence.per_profile {
                redraw(&mut indices, rng);
            }
            for offset in 0..block_profs {
                if independence.per_profile {
                    redraw(&mut indices, rng);
                }
                let observations = block.index_axis(Axis(0), offset);
                let profile = self.profiles.row(row);
                for (group, span) in groups.iter().enumerate() {
                    for strat in span.clone() {
                        if profile[strat] == 0 {
                            continue;
                        }
                        let total: f64 = indices[group]
                            .iter()
                            .map(|&sample| observations[[sample, strat]])
                            .sum();
                        payoffs[[row, strat]] = total / depth as f64;
                    }
                }
                row += 1;
            }
        }
        Game::from_base(self.base.clone(), self.profiles.clone(), payoffs)
            .expect("resampling preserves payoff invariants")
    }

    /// Bootstrap the observations into a payoff game using
    /// `rand::thread_rng()` as the source of randomness.
    pub fn resample(&self, independence: Independence) -> Game {
        self.resample_using(independence, &mut rand::thread_rng())
    }

    /// The sample sub-game induced by a restriction: blocks keep the
    /// profiles supported inside the mask, sliced to the kept columns;
    /// emptied blocks disappear.
    pub fn restrict(&self, restriction: &Restriction) -> SampleGame {
        let keep = restriction.kept_indices();
        let sub_base = EmptyGame::new(restriction.sub_schema(self.schema()));
        let mut observations = Vec::new();
        let mut row = 0;
        for block in &self.sample_payoffs {
            for offset in 0..block.dim().0 {
                let profile = self.profiles.row(row);
                row += 1;
                let supported = profile
                    .iter()
                    .enumerate()
                    .all(|(strat, &count)| count == 0 || restriction[strat]);
                if !supported {
                    continue;
                }
                let sub_profile: Vec<u32> = keep.iter().map(|&strat| profile[strat]).collect();
                let samples = block
                    .index_axis(Axis(0), offset)
                    .select(Axis(1), &keep);
                observations.push((sub_profile, samples));
            }
        }
        SampleGame::from_observations(sub_base, observations)
            .expect("a restriction of a valid sample game is valid")
    }

    /// A copy with each role's observations affinely rescaled so the mean
    /// payoffs span `[0, 1]`, mirroring [`Game::normalize`].
    pub fn normalize(&self) -> SampleGame {
        let schema = self.schema();
        let collapsed = self.to_game();
        let min = collapsed.min_role_payoffs();
        let max = collapsed.max_role_payoffs();
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

        let mut blocks = self.sample_payoffs.clone();
        let mut row = 0;
        for block in blocks.iter_mut() {
            let (block_profs, depth, _) = block.dim();
            for offset_idx in 0..block_profs {
                let profile = self.profiles.row(row);
                row += 1;
                for sample in 0..depth {
                    for (strat, &count) in profile.iter().enumerate() {
                        if count > 0 {
                            let value = block[[offset_idx, sample, strat]];
                            block[[offset_idx, sample, strat]] =
                                (value - offset_wide[strat]) / scale_wide[strat];
                        }
                    }
                }
            }
        }
        SampleGame {
            base: self.base.clone(),
            profiles: self.profiles.clone(),
            sample_payoffs: blocks,
        }
    }
}

impl PartialEq for SampleGame {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.profiles == other.profiles
            && self.sample_payoffs.len() == other.sample_payoffs.len()
            && self
                .sample_payoffs
                .iter()
                .zip(&other.sample_payoffs)
                .all(|(a, b)| {
                    a.dim() == b.dim()
                        && a.iter()
                            .zip(b.iter())
                            .all(|(&x, &y)| x == y || (x.is_nan() && y.is_nan()))
                })
    }
}

impl fmt::Debug for SampleGame {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depths = self.num_samples();
        write!(
            fmt,
            "SampleGame({:?}, {:?}, {} / {}, {})",
            self.schema().num_role_players(),
            self.schema().num_role_strats(),
            self.num_profiles(),
            self.schema().num_all_profiles(),
            depths.iter().map(usize::to_string).join(" - ")
        )
    }
}
