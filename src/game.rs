use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution, WeightedAliasIndex};
use std::sync::Arc;

use crate::{GameError, GameResult, Restriction, Schema};

/// A game with a [`Schema`] but no payoff data.
///
/// An empty game can enumerate every legal profile, generate mixtures on the
/// simplex grid, and sample random profiles, mixtures, and restrictions. It
/// is the base layer that [`Game`](crate::Game) and
/// [`SampleGame`](crate::SampleGame) build on.
///
/// # Examples
/// ```
/// use rsgame::EmptyGame;
///
/// let game = EmptyGame::numbered(&[2], &[3]).unwrap();
/// let profiles = game.all_profiles();
/// assert_eq!(profiles.nrows(), 6);
/// assert_eq!(profiles.row(0).to_vec(), vec![2, 0, 0]);
/// assert_eq!(profiles.row(5).to_vec(), vec![0, 0, 2]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct EmptyGame {
    schema: Arc<Schema>,
}

impl EmptyGame {
    /// Wrap a schema as a game with no payoff data.
    pub fn new(schema: Schema) -> Self {
        EmptyGame {
            schema: Arc::new(schema),
        }
    }

    /// An empty game over a [generated-name schema](Schema::numbered).
    pub fn numbered(role_players: &[u32], role_strats: &[usize]) -> GameResult<Self> {
        Ok(EmptyGame::new(Schema::numbered(role_players, role_strats)?))
    }

    /// The game's role schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The total number of strategies across all roles.
    pub fn num_strats(&self) -> usize {
        self.schema.num_strats()
    }

    /// The number of roles.
    pub fn num_roles(&self) -> usize {
        self.schema.num_roles()
    }

    /// Every legal profile, one per row.
    ///
    /// For each role the multisets of its strategies are enumerated with the
    /// count of earlier strategies decreasing first, and the per-role blocks
    /// are combined as a cartesian product with earlier roles varying
    /// slowest. The order is deterministic and matches the role and strategy
    /// order of the schema.
    pub fn all_profiles(&self) -> Array2<u32> {
        let role_blocks: Vec<Vec<Vec<u32>>> = (0..self.num_roles())
            .map(|role| {
                multisets(
                    self.schema.num_role_players()[role],
                    self.schema.num_role_strats()[role],
                )
            })
            .collect();
        let num_strats = self.num_strats();
        let mut flat = Vec::new();
        let mut rows = 0;
        for combo in role_blocks.iter().multi_cartesian_product() {
            for part in combo {
                flat.extend_from_slice(part);
            }
            rows += 1;
        }
        Array2::from_shape_vec((rows, num_strats), flat)
            .expect("profile enumeration produced a ragged array")
    }

    /// Every mixture whose role slices lie on the resolution-`points`
    /// simplex grid: each probability is a multiple of `1 / (points - 1)`.
    ///
    /// # Errors
    ///
    /// Returns an error if `points < 2`.
    ///
    /// # Examples
    /// ```
    /// use rsgame::EmptyGame;
    ///
    /// let game = EmptyGame::numbered(&[2], &[2]).unwrap();
    /// let grid = game.grid_mixtures(3).unwrap();
    /// assert_eq!(grid.nrows(), 3);
    /// assert_eq!(grid.row(1).to_vec(), vec![0.5, 0.5]);
    /// ```
    pub fn grid_mixtures(&self, points: usize) -> GameResult<Array2<f64>> {
        if points < 2 {
            return Err(GameError::Profile(format!(
                "a simplex grid needs at least 2 points per dimension, got {}",
                points
            )));
        }
        let denom = (points - 1) as f64;
        let role_blocks: Vec<Vec<Vec<u32>>> = (0..self.num_roles())
            .map(|role| multisets((points - 1) as u32, self.schema.num_role_strats()[role]))
            .collect();
        let num_strats = self.num_strats();
        let mut flat = Vec::new();
        let mut rows = 0;
        for combo in role_blocks.iter().multi_cartesian_product() {
            for part in combo {
                flat.extend(part.iter().map(|&c| c as f64 / denom));
            }
            rows += 1;
        }
        Ok(Array2::from_shape_vec((rows, num_strats), flat)
            .expect("grid enumeration produced a ragged array"))
    }

    /// A profile drawn uniformly from the set of all legal profiles, using
    /// `rng` as the source of randomness.
    pub fn random_profile_using<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<u32> {
        let mut profile = Vec::with_capacity(self.num_strats());
        for role in 0..self.num_roles() {
            let players = self.schema.num_role_players()[role] as u64;
            let slots = self.schema.num_role_strats()[role];
            let count = crate::schema::multiset_count(players, slots as u64);
            let rank = rng.gen_range(0..count);
            profile.extend(unrank_multiset(players as u32, slots, rank));
        }
        Array1::from_vec(profile)
    }

    /// A profile drawn uniformly from the set of all legal profiles, using
    /// `rand::thread_rng()` as the source of randomness.
    pub fn random_profile(&self) -> Array1<u32> {
        self.random_profile_using(&mut rand::thread_rng())
    }

    /// A profile drawn by sampling every player's strategy independently
    /// from `mixture`, using `rng` as the source of randomness.
    pub fn random_profile_from_mixture_using<R: Rng + ?Sized>(
        &self,
        mixture: ArrayView1<f64>,
        rng: &mut R,
    ) -> Array1<u32> {
        let mut profile = Array1::zeros(self.num_strats());
        for role in 0..self.num_roles() {
            let span = self.schema.role_span(role);
            let weights: Vec<f64> = mixture.slice(ndarray::s![span.clone()]).to_vec();
            let dist = WeightedAliasIndex::new(weights)
                .expect("a valid mixture yields valid sampling weights");
            for _ in 0..self.schema.num_role_players()[role] {
                profile[span.start + dist.sample(rng)] += 1;
            }
        }
        profile
    }

    /// A batch of [uniform random profiles](Self::random_profile_using),
    /// one per row.
    pub fn random_profiles_using<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Array2<u32> {
        let mut profiles = Array2::zeros((count, self.num_strats()));
        for mut row in profiles.outer_iter_mut() {
            row.assign(&self.random_profile_using(rng));
        }
        profiles
    }

    /// A mixture drawn from a flat Dirichlet distribution over each role's
    /// simplex, using `rng` as the source of randomness.
    pub fn random_mixture_using<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        let mut mixture = Vec::with_capacity(self.num_strats());
        for role in 0..self.num_roles() {
            let strats = self.schema.num_role_strats()[role];
            if strats == 1 {
                mixture.push(1.0);
            } else {
                let dist = Dirichlet::new_with_size(1.0, strats)
                    .expect("flat Dirichlet parameters are valid");
                mixture.extend(dist.sample(rng));
            }
        }
        Array1::from_vec(mixture)
    }

    /// A mixture drawn from a flat Dirichlet distribution over each role's
    /// simplex, using `rand::thread_rng()` as the source of randomness.
    pub fn random_mixture(&self) -> Array1<f64> {
        self.random_mixture_using(&mut rand::thread_rng())
    }

    /// A batch of [random mixtures](Self::random_mixture_using), one per
    /// row.
    pub fn random_mixtures_using<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Array2<f64> {
        let mut mixtures = Array2::zeros((count, self.num_strats()));
        for mut row in mixtures.outer_iter_mut() {
            row.assign(&self.random_mixture_using(rng));
        }
        mixtures
    }

    /// A restriction drawn uniformly from the nonempty strategy subsets of
    /// each role, using `rng` as the source of randomness.
    pub fn random_restriction_using<R: Rng + ?Sized>(&self, rng: &mut R) -> Restriction {
        let mut mask = vec![false; self.num_strats()];
        for role in 0..self.num_roles() {
            let span = self.schema.role_span(role);
            for index in span.clone() {
                mask[index] = rng.gen_bool(0.5);
            }
            if !mask[span.clone()].iter().any(|&kept| kept) {
                mask[span.start + rng.gen_range(0..span.len())] = true;
            }
        }
        Restriction::new(&self.schema, mask).expect("generated mask keeps every role nonempty")
    }

    /// A restriction drawn uniformly from the nonempty strategy subsets of
    /// each role, using `rand::thread_rng()` as the source of randomness.
    pub fn random_restriction(&self) -> Restriction {
        self.random_restriction_using(&mut rand::thread_rng())
    }

    /// The empty game over the restricted schema.
    pub fn restrict(&self, restriction: &Restriction) -> EmptyGame {
        EmptyGame::new(restriction.sub_schema(&self.schema))
    }
}

/// All count vectors of length `slots` summing to `total`, ordered with
/// earlier slots decreasing first.
pub(crate) fn multisets(total: u32, slots: usize) -> Vec<Vec<u32>> {
    let mut out = Vec::new();
    let mut current = vec![0u32; slots];
    fill_multisets(total, 0, &mut current, &mut out);
    out
}

fn fill_multisets(remaining: u32, slot: usize, current: &mut Vec<u32>, out: &mut Vec<Vec<u32>>) {
    if slot + 1 == current.len() {
        current[slot] = remaining;
        out.push(current.clone());
        return;
    }
    for count in (0..=remaining).rev() {
        current[slot] = count;
        fill_multisets(remaining - count, slot + 1, current, out);
    }
    current[slot] = 0;
}

/// Decode the `rank`th count vector in the [`multisets`] order.
fn unrank_multiset(total: u32, slots: usize, mut rank: u128) -> Vec<u32> {
    let mut out = Vec::with_capacity(slots);
    let mut remaining = total;
    for slot in 0..slots {
        if slot + 1 == slots {
            out.push(remaining);
            break;
        }
        for count in (0..=remaining).rev() {
            let block =
                crate::schema::multiset_count((remaining - count) as u64, (slots - slot - 1) as u64);
            if rank < block {
                out.push(count);
                remaining -= count;
                break;
            }
            rank -= block;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn profile_enumeration_order() {
        let game = EmptyGame::numbered(&[2], &[3]).unwrap();
        let profiles = game.all_profiles();
        let expected = vec![
            vec![2, 0, 0],
            vec![1, 1, 0],
            vec![1, 0, 1],
            vec![0, 2, 0],
            vec![0, 1, 1],
            vec![0, 0, 2],
        ];
        let actual: Vec<Vec<u32>> = profiles.outer_iter().map(|row| row.to_vec()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn profile_enumeration_crosses_roles() {
        let game = EmptyGame::numbered(&[1, 2], &[2, 2]).unwrap();
        let profiles = game.all_profiles();
        assert_eq!(profiles.nrows() as u64, game.schema().num_all_profiles());
        assert_eq!(profiles.row(0).to_vec(), vec![1, 0, 2, 0]);
        assert_eq!(profiles.row(1).to_vec(), vec![1, 0, 1, 1]);
        assert_eq!(profiles.row(3).to_vec(), vec![0, 1, 2, 0]);
        for profile in profiles.outer_iter() {
            assert!(game
                .schema()
                .verify_profile(profile.as_slice().unwrap())
                .is_ok());
        }
    }

    #[test]
    fn grid_mixtures_cover_the_simplex() {
        let game = EmptyGame::numbered(&[2, 1], &[2, 2]).unwrap();
        let grid = game.grid_mixtures(3).unwrap();
        assert_eq!(grid.nrows(), 9);
        for mixture in grid.outer_iter() {
            assert!(game.schema().verify_mixture(mixture).is_ok());
        }
        assert!(game.grid_mixtures(1).is_err());
    }

    #[test]
    fn random_profiles_are_legal() {
        let game = EmptyGame::numbered(&[3, 2], &[2, 3]).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let profile = game.random_profile_using(&mut rng);
            assert!(game
                .schema()
                .verify_profile(profile.as_slice().unwrap())
                .is_ok());
        }
        for profile in game.random_profiles_using(10, &mut rng).outer_iter() {
            assert!(game
                .schema()
                .verify_profile(profile.as_slice().unwrap())
                .is_ok());
        }
    }

    #[test]
    fn random_profiles_from_mixture_follow_support() {
        let game = EmptyGame::numbered(&[4], &[3]).unwrap();
        let mut rng = rand::thread_rng();
        let mixture = ndarray::array![0.0, 1.0, 0.0];
        for _ in 0..20 {
            let profile = game.random_profile_from_mixture_using(mixture.view(), &mut rng);
            assert_eq!(profile.to_vec(), vec![0, 4, 0]);
        }
    }

    #[test]
    fn random_mixtures_are_legal() {
        let game = EmptyGame::numbered(&[2, 2], &[3, 1]).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let mixture = game.random_mixture_using(&mut rng);
            assert!(game.schema().verify_mixture(mixture.view()).is_ok());
        }
        for mixture in game.random_mixtures_using(10, &mut rng).outer_iter() {
            assert!(game.schema().verify_mixture(mixture).is_ok());
        }
    }

    #[test]
    fn random_restrictions_keep_roles_nonempty() {
        let game = EmptyGame::numbered(&[2, 2], &[3, 2]).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let restriction = game.random_restriction_using(&mut rng);
            let mask: &[bool] = restriction.as_ref();
            assert!(mask[0..3].iter().any(|&kept| kept));
            assert!(mask[3..5].iter().any(|&kept| kept));
        }
    }

    #[test]
    fn unranking_is_a_bijection() {
        let listed = multisets(4, 3);
        for (rank, counts) in listed.iter().enumerate() {
            assert_eq!(&unrank_multiset(4, 3, rank as u128), counts);
        }
    }
}
