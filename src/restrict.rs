use derive_more::{AsRef, Index};
use ndarray::{Array1, ArrayView1};

use crate::{GameError, GameResult, Schema};

/// A validated strategy mask: which strategies of a schema survive into a
/// sub-game.
///
/// A restriction is a boolean vector over the global strategy indices with
/// at least one `true` in every role. The induced sub-game keeps exactly the
/// masked strategies (relabelled inside each role, preserving order) and the
/// profiles whose support lies entirely inside the mask.
///
/// # Examples
/// ```
/// use rsgame::{Restriction, Schema};
///
/// let schema = Schema::numbered(&[2, 1], &[3, 2]).unwrap();
/// let restriction = Restriction::new(&schema, vec![true, false, true, true, false]).unwrap();
///
/// assert_eq!(restriction.num_kept(), 3);
/// assert!(restriction[0] && !restriction[1]);
/// assert_eq!(restriction.translate_profile(&[1, 1, 1]), vec![1, 0, 1, 1, 0]);
///
/// let sub = restriction.sub_schema(&schema);
/// assert_eq!(sub.num_role_strats(), &[2, 1]);
/// assert_eq!(sub.strat_names(0), &["s0", "s2"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, AsRef, Index)]
pub struct Restriction {
    #[as_ref(forward)]
    #[index]
    mask: Vec<bool>,
}

impl Restriction {
    /// Validate a mask against a schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the mask length does not match the schema or if
    /// any role would be left with no strategies.
    pub fn new(schema: &Schema, mask: Vec<bool>) -> GameResult<Self> {
        if mask.len() != schema.num_strats() {
            return Err(GameError::Profile(format!(
                "restriction mask has length {}, schema has {} strategies",
                mask.len(),
                schema.num_strats()
            )));
        }
        for role in 0..schema.num_roles() {
            if !mask[schema.role_span(role)].iter().any(|&kept| kept) {
                return Err(GameError::Schema(format!(
                    "restriction leaves role {} with no strategies",
                    schema.role_names()[role]
                )));
            }
        }
        Ok(Restriction { mask })
    }

    /// The restriction keeping every strategy.
    pub fn full(schema: &Schema) -> Self {
        Restriction {
            mask: vec![true; schema.num_strats()],
        }
    }

    /// The mask as a slice.
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// The number of surviving strategies.
    pub fn num_kept(&self) -> usize {
        self.mask.iter().filter(|&&kept| kept).count()
    }

    /// The global indices of the surviving strategies, in order.
    pub fn kept_indices(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, &kept)| kept)
            .map(|(index, _)| index)
            .collect()
    }

    /// The schema of the induced sub-game: the same roles and player counts
    /// with only the surviving strategies.
    pub fn sub_schema(&self, schema: &Schema) -> Schema {
        let roles = (0..schema.num_roles())
            .map(|role| {
                let strats = schema
                    .role_span(role)
                    .filter(|&strat| self.mask[strat])
                    .map(|strat| schema.strat_name(strat).to_string())
                    .collect();
                (
                    schema.role_names()[role].clone(),
                    schema.num_role_players()[role],
                    strats,
                )
            })
            .collect();
        Schema::new(roles).expect("a validated restriction induces a valid schema")
    }

    /// Lift a sub-game profile back to the full index space, with zero
    /// counts at the masked-out strategies.
    pub fn translate_profile(&self, sub_profile: &[u32]) -> Vec<u32> {
        let mut sub = sub_profile.iter();
        self.mask
            .iter()
            .map(|&kept| if kept { *sub.next().unwrap() } else { 0 })
            .collect()
    }

    /// Lift a sub-game mixture back to the full index space, with zero
    /// probability at the masked-out strategies.
    pub fn translate_mixture(&self, sub_mixture: ArrayView1<f64>) -> Array1<f64> {
        let mut sub = sub_mixture.iter();
        Array1::from_iter(
            self.mask
                .iter()
                .map(|&kept| if kept { *sub.next().unwrap() } else { 0.0 }),
        )
    }

    /// Compose with a restriction of the induced sub-game, yielding a
    /// restriction of the original schema. `inner` must be indexed by this
    /// restriction's surviving strategies.
    pub fn compose(&self, inner: &Restriction) -> Restriction {
        debug_assert_eq!(inner.mask.len(), self.num_kept());
        let mut inner_iter = inner.mask.iter();
        let mask = self
            .mask
            .iter()
            .map(|&kept| kept && *inner_iter.next().unwrap())
            .collect();
        Restriction { mask }
    }
}
