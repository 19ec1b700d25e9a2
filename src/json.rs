//! The JSON boundary: translation between games and the role/strategy-keyed
//! document formats used to exchange them.
//!
//! Two profile shapes are understood: an object keyed by role then strategy
//! name, and a "player list" enumerating one record per player. Payoff
//! documents may carry a single float or an array of per-sample floats per
//! strategy. Whole games round-trip through a compact canonical document:
//!
//! ```json
//! { "players":    { "r0": 2 },
//!   "strategies": { "r0": ["s0", "s1"] },
//!   "profiles":   [ { "r0": [["s0", 2, 1.5]] } ] }
//! ```
//!
//! with an equivalent `"roles"` list shape accepted on input. Unknown roles
//! or strategies, malformed documents, and mixed observation depths within a
//! profile are all rejected.

use ndarray::{Array1, Array2, ArrayView2};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{EmptyGame, Game, GameError, GameResult, SampleGame, Schema};

#[derive(Deserialize)]
struct RoleSpec {
    name: String,
    count: u32,
    strategies: Vec<String>,
}

fn as_object<'a>(doc: &'a Value, what: &str) -> GameResult<&'a Map<String, Value>> {
    doc.as_object()
        .ok_or_else(|| GameError::Json(format!("{} must be an object", what)))
}

fn as_count(value: &Value, what: &str) -> GameResult<u32> {
    value
        .as_i64()
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| {
            GameError::Json(format!("{} must be a nonnegative integer, got {}", what, value))
        })
}

fn as_float(value: &Value, what: &str) -> GameResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| GameError::Json(format!("{} must be a number, got {}", what, value)))
}

impl Schema {
    /// The canonical schema document: a `"players"` map and a
    /// `"strategies"` map, both keyed by role name.
    pub fn to_json(&self) -> Value {
        let mut players = Map::new();
        let mut strategies = Map::new();
        for role in 0..self.num_roles() {
            let name = self.role_names()[role].clone();
            players.insert(name.clone(), json!(self.num_role_players()[role]));
            strategies.insert(name, json!(self.strat_names(role)));
        }
        json!({ "players": players, "strategies": strategies })
    }

    /// Read a schema from either the canonical `"players"`/`"strategies"`
    /// shape or the `"roles"` list shape.
    pub fn from_json(doc: &Value) -> GameResult<Schema> {
        let root = as_object(doc, "a game document")?;
        if let Some(roles) = root.get("roles") {
            let specs: Vec<RoleSpec> = serde_json::from_value(roles.clone())
                .map_err(|err| GameError::Json(format!("malformed roles list: {}", err)))?;
            return Schema::new(
                specs
                    .into_iter()
                    .map(|spec| (spec.name, spec.count, spec.strategies))
                    .collect(),
            );
        }
        let players = as_object(
            root.get("players")
                .ok_or_else(|| GameError::Json("missing players".into()))?,
            "players",
        )?;
        let strategies = as_object(
            root.get("strategies")
                .ok_or_else(|| GameError::Json("missing strategies".into()))?,
            "strategies",
        )?;
        let mut roles = Vec::with_capacity(players.len());
        for (name, count) in players {
            let strats = strategies
                .get(name)
                .ok_or_else(|| GameError::Json(format!("no strategies for role {}", name)))?;
            let strats: Vec<String> = serde_json::from_value(strats.clone()).map_err(|err| {
                GameError::Json(format!("malformed strategies for role {}: {}", name, err))
            })?;
            roles.push((name.clone(), as_count(count, "a player count")?, strats));
        }
        if strategies.len() != players.len() {
            return Err(GameError::Json(
                "players and strategies list different roles".into(),
            ));
        }
        Schema::new(roles)
    }

    fn resolve(&self, role_name: &str, strat_name: &str) -> GameResult<usize> {
        let role = self
            .role_index(role_name)
            .ok_or_else(|| GameError::Json(format!("unknown role {}", role_name)))?;
        self.strat_index(role, strat_name).ok_or_else(|| {
            GameError::Json(format!("unknown strategy {} in role {}", strat_name, role_name))
        })
    }

    /// A profile as an object keyed by role then strategy name; zero counts
    /// are omitted.
    pub fn profile_to_json(&self, profile: &[u32]) -> Value {
        let mut doc = Map::new();
        for role in 0..self.num_roles() {
            let mut counts = Map::new();
            for strat in self.role_span(role) {
                if profile[strat] > 0 {
                    counts.insert(self.strat_name(strat).to_string(), json!(profile[strat]));
                }
            }
            doc.insert(self.role_names()[role].clone(), Value::Object(counts));
        }
        Value::Object(doc)
    }

    /// Read a profile from the role-keyed count shape or the player-list
    /// shape (`{"players": [{"role": ..., "strategy": ...}, ...]}`).
    pub fn profile_from_json(&self, doc: &Value) -> GameResult<Vec<u32>> {
        let root = as_object(doc, "a profile")?;
        let mut profile = vec![0u32; self.num_strats()];
        if let Some(players) = root.get("players") {
            let records = players
                .as_array()
                .ok_or_else(|| GameError::Json("players must be an array".into()))?;
            for record in records {
                let record = as_object(record, "a player record")?;
                let strat = self.player_record_strat(record)?;
                profile[strat] += 1;
            }
        } else {
            for (role_name, counts) in root {
                for (strat_name, count) in as_object(counts, "a role's counts")? {
                    let strat = self.resolve(role_name, strat_name)?;
                    profile[strat] = as_count(count, "a strategy count")?;
                }
            }
        }
        self.verify_profile(&profile)?;
        Ok(profile)
    }

    fn player_record_strat(&self, record: &Map<String, Value>) -> GameResult<usize> {
        let role_name = record
            .get("role")
            .and_then(Value::as_str)
            .ok_or_else(|| GameError::Json("player record missing role".into()))?;
        let strat_name = record
            .get("strategy")
            .and_then(Value::as_str)
            .ok_or_else(|| GameError::Json("player record missing strategy".into()))?;
        self.resolve(role_name, strat_name)
    }

    /// A payoff row as an object keyed by role then strategy name; zero
    /// entries are omitted.
    pub fn payoff_to_json(&self, payoff: &[f64]) -> Value {
        let mut doc = Map::new();
        for role in 0..self.num_roles() {
            let mut pays = Map::new();
            for strat in self.role_span(role) {
                if payoff[strat] != 0.0 {
                    pays.insert(self.strat_name(strat).to_string(), json!(payoff[strat]));
                }
            }
            doc.insert(self.role_names()[role].clone(), Value::Object(pays));
        }
        Value::Object(doc)
    }

    /// Read a payoff row from the role-keyed shape (floats or per-sample
    /// arrays, which are averaged) or the player-list shape (payoffs of
    /// identical records are averaged). Strategies with an empty sample
    /// array read as missing data.
    pub fn payoff_from_json(&self, doc: &Value) -> GameResult<Array1<f64>> {
        let root = as_object(doc, "a payoff document")?;
        let mut payoff = Array1::zeros(self.num_strats());
        if let Some(players) = root.get("players") {
            let records = players
                .as_array()
                .ok_or_else(|| GameError::Json("players must be an array".into()))?;
            let mut counts = vec![0u32; self.num_strats()];
            for record in records {
                let record = as_object(record, "a player record")?;
                let strat = self.player_record_strat(record)?;
                let pay = as_float(
                    record
                        .get("payoff")
                        .ok_or_else(|| GameError::Json("player record missing payoff".into()))?,
                    "a payoff",
                )?;
                payoff[strat] += pay;
                counts[strat] += 1;
            }
            for (pay, &count) in payoff.iter_mut().zip(&counts) {
                if count > 0 {
                    *pay /= count as f64;
                }
            }
        } else {
            for (role_name, pays) in root {
                for (strat_name, value) in as_object(pays, "a role's payoffs")? {
                    let strat = self.resolve(role_name, strat_name)?;
                    payoff[strat] = match value {
                        Value::Array(samples) => mean_of(samples)?,
                        other => as_float(other, "a payoff")?,
                    };
                }
            }
        }
        Ok(payoff)
    }

    /// A sample-payoff matrix as an object keyed by role then strategy
    /// name, one per-sample array per strategy; all-zero columns are
    /// omitted.
    pub fn samplepay_to_json(&self, samples: ArrayView2<f64>) -> Value {
        let mut doc = Map::new();
        for role in 0..self.num_roles() {
            let mut pays = Map::new();
            for strat in self.role_span(role) {
                let column: Vec<f64> = samples.column(strat).to_vec();
                if column.iter().any(|&pay| pay != 0.0) {
                    pays.insert(self.strat_name(strat).to_string(), json!(column));
                }
            }
            doc.insert(self.role_names()[role].clone(), Value::Object(pays));
        }
        Value::Object(doc)
    }

    /// Read a sample-payoff matrix from the role-keyed shape. Every
    /// strategy present must carry the same number of samples; strategies
    /// absent from the document read as zero columns.
    pub fn samplepay_from_json(&self, doc: &Value) -> GameResult<Array2<f64>> {
        let root = as_object(doc, "a sample payoff document")?;
        let mut columns: Vec<(usize, Vec<f64>)> = Vec::new();
        let mut depth = None;
        for (role_name, pays) in root {
            for (strat_name, value) in as_object(pays, "a role's payoffs")? {
                let strat = self.resolve(role_name, strat_name)?;
                let samples = value
                    .as_array()
                    .ok_or_else(|| GameError::Json("samples must be an array".into()))?;
                let samples = samples
                    .iter()
                    .map(|sample| as_float(sample, "a sample payoff"))
                    .collect::<GameResult<Vec<f64>>>()?;
                match depth {
                    None => depth = Some(samples.len()),
                    Some(depth) if depth != samples.len() => {
                        return Err(GameError::Json(format!(
                            "strategy {} has {} samples, expected {}",
                            strat_name,
                            samples.len(),
                            depth
                        )))
                    }
                    Some(_) => {}
                }
                columns.push((strat, samples));
            }
        }
        let depth = depth.unwrap_or(0);
        let mut out = Array2::zeros((depth, self.num_strats()));
        for (strat, samples) in columns {
            for (sample, pay) in samples.into_iter().enumerate() {
                out[[sample, strat]] = pay;
            }
        }
        Ok(out)
    }

    /// A profile and payoff row as one object keyed by role name, each role
    /// a list of `[strategy, count, payoff]` triples over the profile's
    /// support.
    pub fn profpay_to_json(&self, profile: &[u32], payoff: &[f64]) -> Value {
        self.triples_to_json(profile, |strat| json!(payoff[strat]))
    }

    /// A profile and sample-payoff matrix as `[strategy, count, samples]`
    /// triples.
    pub fn profsamplepay_to_json(&self, profile: &[u32], samples: ArrayView2<f64>) -> Value {
        self.triples_to_json(profile, |strat| json!(samples.column(strat).to_vec()))
    }

    fn triples_to_json<F: Fn(usize) -> Value>(&self, profile: &[u32], payload: F) -> Value {
        let mut doc = Map::new();
        for role in 0..self.num_roles() {
            let triples: Vec<Value> = self
                .role_span(role)
                .filter(|&strat| profile[strat] > 0)
                .map(|strat| {
                    json!([self.strat_name(strat), profile[strat], payload(strat)])
                })
                .collect();
            doc.insert(self.role_names()[role].clone(), Value::Array(triples));
        }
        Value::Object(doc)
    }

    /// Read a profile and payoff row from the triple shape; per-sample
    /// arrays are averaged and empty arrays read as missing data.
    pub fn profpay_from_json(&self, doc: &Value) -> GameResult<(Vec<u32>, Array1<f64>)> {
        let mut profile = vec![0u32; self.num_strats()];
        let mut payoff = Array1::zeros(self.num_strats());
        self.visit_triples(doc, |strat, count, value| {
            profile[strat] = count;
            payoff[strat] = match value {
                Value::Array(samples) => mean_of(samples)?,
                other => as_float(other, "a payoff")?,
            };
            Ok(())
        })?;
        self.verify_profile(&profile)?;
        Ok((profile, payoff))
    }

    /// Read a profile and sample-payoff matrix from the triple shape;
    /// scalar payoffs read as single observations, and every strategy in
    /// the profile must carry the same number of samples.
    pub fn profsamplepay_from_json(&self, doc: &Value) -> GameResult<(Vec<u32>, Array2<f64>)> {
        let mut profile = vec![0u32; self.num_strats()];
        let mut columns: Vec<(usize, Vec<f64>)> = Vec::new();
        let mut depth = None;
        self.visit_triples(doc, |strat, count, value| {
            profile[strat] = count;
            let samples = match value {
                Value::Array(samples) => samples
                    .iter()
                    .map(|sample| as_float(sample, "a sample payoff"))
                    .collect::<GameResult<Vec<f64>>>()?,
                other => vec![as_float(other, "a payoff")?],
            };
            match depth {
                None => depth = Some(samples.len()),
                Some(depth) if depth != samples.len() => {
                    return Err(GameError::Json(format!(
                        "observation arrays of lengths {} and {} in one profile",
                        depth,
                        samples.len()
                    )))
                }
                Some(_) => {}
            }
            columns.push((strat, samples));
            Ok(())
        })?;
        self.verify_profile(&profile)?;
        let depth = depth.unwrap_or(0);
        let mut out = Array2::zeros((depth, self.num_strats()));
        for (strat, samples) in columns {
            for (sample, pay) in samples.into_iter().enumerate() {
                out[[sample, strat]] = pay;
            }
        }
        Ok((profile, out))
    }

    fn visit_triples<F>(&self, doc: &Value, mut visit: F) -> GameResult<()>
    where
        F: FnMut(usize, u32, &Value) -> GameResult<()>,
    {
        for (role_name, triples) in as_object(doc, "a profile entry")? {
            let triples = triples
                .as_array()
                .ok_or_else(|| GameError::Json("a role entry must be an array".into()))?;
            for triple in triples {
                let triple = triple
                    .as_array()
                    .filter(|triple| triple.len() == 3)
                    .ok_or_else(|| {
                        GameError::Json("expected a [strategy, count, payoff] triple".into())
                    })?;
                let strat_name = triple[0]
                    .as_str()
                    .ok_or_else(|| GameError::Json("strategy names must be strings".into()))?;
                let strat = self.resolve(role_name, strat_name)?;
                visit(strat, as_count(&triple[1], "a strategy count")?, &triple[2])?;
            }
        }
        Ok(())
    }
}

fn mean_of(samples: &[Value]) -> GameResult<f64> {
    if samples.is_empty() {
        return Ok(f64::NAN);
    }
    let mut total = 0.0;
    for sample in samples {
        total += as_float(sample, "a sample payoff")?;
    }
    Ok(total / samples.len() as f64)
}

impl Game {
    /// The canonical game document: the schema maps plus a `"profiles"`
    /// list of payoff triples.
    pub fn to_json(&self) -> Value {
        let mut doc = self.schema().to_json();
        let profiles: Vec<Value> = self
            .profiles()
            .outer_iter()
            .zip(self.payoffs().outer_iter())
            .map(|(profile, payoff)| {
                self.schema()
                    .profpay_to_json(profile.as_slice().unwrap(), payoff.as_slice().unwrap())
            })
            .collect();
        doc.as_object_mut()
            .unwrap()
            .insert("profiles".to_string(), Value::Array(profiles));
        doc
    }

    /// Read a game from a document in either schema shape. A missing
    /// `"profiles"` list denotes an empty game, and per-sample payoff
    /// arrays are collapsed to their means.
    pub fn from_json(doc: &Value) -> GameResult<Game> {
        let schema = Schema::from_json(doc)?;
        let num_strats = schema.num_strats();
        let entries = profile_entries(doc)?;
        let mut profiles = Array2::zeros((entries.len(), num_strats));
        let mut payoffs = Array2::zeros((entries.len(), num_strats));
        for (row, entry) in entries.iter().enumerate() {
            let (profile, payoff) = schema.profpay_from_json(entry)?;
            for (strat, count) in profile.into_iter().enumerate() {
                profiles[[row, strat]] = count;
            }
            payoffs.row_mut(row).assign(&payoff);
        }
        Game::new(schema, profiles, payoffs)
    }
}

impl SampleGame {
    /// The canonical sample-game document: the schema maps plus a
    /// `"profiles"` list of observation triples.
    pub fn to_json(&self) -> Value {
        let mut doc = self.schema().to_json();
        let mut profiles = Vec::with_capacity(self.num_profiles());
        let mut row = 0;
        for block in self.sample_payoffs() {
            for offset in 0..block.dim().0 {
                let profile = self.profiles().row(row);
                profiles.push(self.schema().profsamplepay_to_json(
                    profile.as_slice().unwrap(),
                    block.index_axis(ndarray::Axis(0), offset),
                ));
                row += 1;
            }
        }
        doc.as_object_mut()
            .unwrap()
            .insert("profiles".to_string(), Value::Array(profiles));
        doc
    }

    /// Read a sample game from a document in either schema shape. Scalar
    /// payoffs read as single observations; profiles group into sample
    /// blocks by their observation depth.
    pub fn from_json(doc: &Value) -> GameResult<SampleGame> {
        let schema = Schema::from_json(doc)?;
        let base = EmptyGame::new(schema);
        let entries = profile_entries(doc)?;
        let mut observations = Vec::with_capacity(entries.len());
        for entry in &entries {
            let (profile, samples) = base.schema().profsamplepay_from_json(entry)?;
            if samples.nrows() == 0 {
                return Err(GameError::Json(format!(
                    "profile {:?} has no observations",
                    profile
                )));
            }
            observations.push((profile, samples));
        }
        SampleGame::from_observations(base, observations)
    }
}

fn profile_entries(doc: &Value) -> GameResult<Vec<Value>> {
    match as_object(doc, "a game document")?.get("profiles") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => Ok(entries.clone()),
        Some(_) => Err(GameError::Json("profiles must be an array".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn profile_round_trip() {
        let schema = Schema::numbered(&[11, 3], &[2, 1]).unwrap();
        let profile = vec![6, 5, 3];
        let doc = schema.profile_to_json(&profile);
        assert_eq!(doc, json!({"r0": {"s0": 6, "s1": 5}, "r1": {"s2": 3}}));
        assert_eq!(schema.profile_from_json(&doc).unwrap(), profile);

        let players: Vec<Value> = std::iter::empty()
            .chain(std::iter::repeat(json!({"role": "r0", "strategy": "s1", "payoff": 0})).take(5))
            .chain(std::iter::repeat(json!({"role": "r0", "strategy": "s0", "payoff": 0})).take(6))
            .chain(std::iter::repeat(json!({"role": "r1", "strategy": "s2", "payoff": 0})).take(3))
            .collect();
        let doc = json!({ "players": players });
        assert_eq!(schema.profile_from_json(&doc).unwrap(), profile);
    }

    #[test]
    fn bad_profiles_are_rejected() {
        let schema = Schema::numbered(&[2], &[2]).unwrap();
        assert!(schema
            .profile_from_json(&json!({"r0": {"nope": 2}}))
            .is_err());
        assert!(schema
            .profile_from_json(&json!({"r9": {"s0": 2}}))
            .is_err());
        assert!(schema
            .profile_from_json(&json!({"r0": {"s0": -1, "s1": 3}}))
            .is_err());
        assert!(schema.profile_from_json(&json!({"r0": {"s0": 1}})).is_err());
    }

    #[test]
    fn payoff_round_trip() {
        let schema = Schema::numbered(&[11, 3], &[2, 1]).unwrap();
        let payoff = vec![1.0, 2.0, 3.0];
        let doc = schema.payoff_to_json(&payoff);
        assert_eq!(doc, json!({"r0": {"s0": 1.0, "s1": 2.0}, "r1": {"s2": 3.0}}));
        assert_eq!(
            schema.payoff_from_json(&doc).unwrap(),
            Array1::from_vec(payoff)
        );

        // Player lists average identical records.
        let doc = json!({ "players": [
            {"role": "r0", "strategy": "s0", "payoff": 2.0},
            {"role": "r0", "strategy": "s0", "payoff": 0.0},
            {"role": "r1", "strategy": "s2", "payoff": 3.0},
        ]});
        let pays = schema.payoff_from_json(&doc).unwrap();
        assert_eq!(pays[0], 1.0);
        assert_eq!(pays[1], 0.0);
        assert_eq!(pays[2], 3.0);
    }

    #[test]
    fn empty_observation_lists_read_as_missing() {
        let schema = Schema::numbered(&[1, 1], &[2, 1]).unwrap();
        let doc = json!({"r0": {"s0": []}, "r1": {"s2": []}});
        let pays = schema.payoff_from_json(&doc).unwrap();
        assert!(pays[0].is_nan());
        assert_eq!(pays[1], 0.0);
        assert!(pays[2].is_nan());
    }

    #[test]
    fn samplepay_round_trip() {
        let schema = Schema::numbered(&[3, 4], &[2, 1]).unwrap();
        let samples = ndarray::array![[3.0, 0.0, 7.0], [4.0, 0.0, 8.0], [5.0, 0.0, 9.0]];
        let doc = schema.samplepay_to_json(samples.view());
        assert_eq!(doc, json!({"r0": {"s0": [3.0, 4.0, 5.0]}, "r1": {"s2": [7.0, 8.0, 9.0]}}));
        assert_eq!(schema.samplepay_from_json(&doc).unwrap(), samples);

        // Explicit zero columns are accepted.
        let doc = json!({
            "r0": {"s0": [3.0, 4.0, 5.0], "s1": [0.0, 0.0, 0.0]},
            "r1": {"s2": [7.0, 8.0, 9.0]},
        });
        assert_eq!(schema.samplepay_from_json(&doc).unwrap(), samples);

        // Mismatched depths are rejected.
        let doc = json!({"r0": {"s0": [3.0, 4.0]}, "r1": {"s2": [7.0, 8.0, 9.0]}});
        assert!(schema.samplepay_from_json(&doc).is_err());
    }

    #[test]
    fn game_document_identity() {
        let game = Game::numbered(
            &[2],
            &[2],
            vec![vec![2, 0], vec![1, 1], vec![0, 2]],
            vec![vec![0.0, 0.0], vec![10.0, 20.0], vec![0.0, 30.0]],
        )
        .unwrap();
        let doc = game.to_json();
        let text = serde_json::to_string(&doc).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(Game::from_json(&parsed).unwrap(), game);
    }

    #[test]
    fn game_reads_roles_shape_and_missing_profiles() {
        let doc = json!({
            "roles": [{"name": "r0", "count": 2, "strategies": ["s0", "s1"]}],
        });
        let game = Game::from_json(&doc).unwrap();
        assert!(game.is_empty());
        assert_eq!(game.schema().num_strats(), 2);

        let canonical = json!({
            "players": {"r0": 2},
            "strategies": {"r0": ["s0", "s1"]},
        });
        assert_eq!(game, Game::from_json(&canonical).unwrap());
    }

    #[test]
    fn game_collapses_observations_to_means() {
        let doc = json!({
            "players": {"r0": 2},
            "strategies": {"r0": ["s0", "s1"]},
            "profiles": [
                {"r0": [["s0", 2, [-1.0, 0.0, 1.0]]]},
                {"r0": [["s0", 1, [9.0, 10.0, 11.0]], ["s1", 1, [21.0, 20.0, 19.0]]]},
                {"r0": [["s1", 2, [32.0, 28.0, 30.0, 30.0]]]},
            ],
        });
        let expected = Game::numbered(
            &[2],
            &[2],
            vec![vec![2, 0], vec![1, 1], vec![0, 2]],
            vec![vec![0.0, 0.0], vec![10.0, 20.0], vec![0.0, 30.0]],
        )
        .unwrap();
        assert_eq!(Game::from_json(&doc).unwrap(), expected);
    }

    #[test]
    fn samplegame_document_identity() {
        let game = SampleGame::numbered(
            &[2],
            &[2],
            vec![vec![2, 0], vec![1, 1], vec![0, 2]],
            vec![
                vec![
                    vec![vec![-1.0, 0.0], vec![0.0, 0.0], vec![1.0, 0.0]],
                    vec![vec![9.0, 21.0], vec![10.0, 20.0], vec![11.0, 19.0]],
                ],
                vec![vec![vec![0.0, 32.0], vec![0.0, 28.0], vec![0.0, 30.0], vec![0.0, 30.0]]],
            ],
        )
        .unwrap();
        let doc = game.to_json();
        let text = serde_json::to_string(&doc).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(SampleGame::from_json(&parsed).unwrap(), game);
    }

    #[test]
    fn samplegame_reads_scalar_payoffs_as_single_observations() {
        let doc = json!({
            "players": {"r0": 2},
            "strategies": {"r0": ["s0", "s1"]},
            "profiles": [
                {"r0": [["s0", 1, 10.0], ["s1", 1, 20.0]]},
            ],
        });
        let game = SampleGame::from_json(&doc).unwrap();
        assert_eq!(game.num_samples(), vec![1]);
        assert_eq!(
            game.get_sample_payoffs(&[1, 1]).unwrap().row(0).to_vec(),
            vec![10.0, 20.0]
        );
    }

    #[test]
    fn mixed_depths_within_a_profile_are_rejected() {
        let doc = json!({
            "players": {"r0": 2},
            "strategies": {"r0": ["s0", "s1"]},
            "profiles": [
                {"r0": [["s0", 1, [1.0, 2.0]], ["s1", 1, [3.0]]]},
            ],
        });
        assert!(SampleGame::from_json(&doc).is_err());
        assert!(Game::from_json(&doc).is_ok(), "means do not need equal depths");
    }

    #[test]
    fn unknown_names_are_rejected() {
        let doc = json!({
            "players": {"r0": 2},
            "strategies": {"r0": ["s0", "s1"]},
            "profiles": [
                {"r0": [["mystery", 2, 0.0]]},
            ],
        });
        assert!(Game::from_json(&doc).is_err());
    }
}
