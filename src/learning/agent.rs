//! Tabular Q-learning agent.
//!
//! # Update rule
//! ```text
//! Q[s,a] += alpha * (reward + gamma * max'(Q[s',·]) - Q[s,a])
//! ```
//! `max'` is a running maximum seeded with 0, so a row of all-negative values
//! contributes nothing to the lookahead.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::learning::action::{Action, NUM_ACTIONS};
use crate::learning::state::NUM_STATES;

/// Upper bound (exclusive) of the initial noise.
const INITIAL_NOISE: f64 = 0.1;

/// Errors raised when a table is rebuilt from external data.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table shape mismatch: expected {expected_states}x{expected_actions}, got {states}x{actions} ({values} values)")]
    Shape {
        expected_states: usize,
        expected_actions: usize,
        states: usize,
        actions: usize,
        values: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Dense `NUM_STATES x NUM_ACTIONS` value table, state-major.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    values: Vec<f64>,
}

/// Plain numeric form of a table for inspection and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QTableSnapshot {
    pub states: usize,
    pub actions: usize,
    pub values: Vec<f64>,
}

impl QTable {
    /// Table filled with uniform noise in `[0, 0.1)`.
    pub fn with_noise<R: Rng>(rng: &mut R) -> Self {
        let values = (0..NUM_STATES * NUM_ACTIONS)
            .map(|_| rng.gen::<f64>() * INITIAL_NOISE)
            .collect();
        Self { values }
    }

    /// All-zero table.
    pub fn zeroed() -> Self {
        Self {
            values: vec![0.0; NUM_STATES * NUM_ACTIONS],
        }
    }

    /// Rebuild a table from state-major values.
    pub fn from_values(values: Vec<f64>) -> Result<Self, TableError> {
        if values.len() != NUM_STATES * NUM_ACTIONS {
            return Err(TableError::Shape {
                expected_states: NUM_STATES,
                expected_actions: NUM_ACTIONS,
                states: values.len() / NUM_ACTIONS,
                actions: NUM_ACTIONS,
                values: values.len(),
            });
        }
        Ok(Self { values })
    }

    /// State-major copy of every value.
    pub fn to_values(&self) -> Vec<f64> {
        self.values.clone()
    }

    pub fn snapshot(&self) -> QTableSnapshot {
        QTableSnapshot {
            states: NUM_STATES,
            actions: NUM_ACTIONS,
            values: self.to_values(),
        }
    }

    pub fn from_snapshot(snapshot: QTableSnapshot) -> Result<Self, TableError> {
        if snapshot.states != NUM_STATES || snapshot.actions != NUM_ACTIONS {
            return Err(TableError::Shape {
                expected_states: NUM_STATES,
                expected_actions: NUM_ACTIONS,
                states: snapshot.states,
                actions: snapshot.actions,
                values: snapshot.values.len(),
            });
        }
        Self::from_values(snapshot.values)
    }

    pub fn get(&self, state: usize, action: Action) -> f64 {
        self.row(state)[action.index()]
    }

    /// Values of every action in `state`, in ordinal order.
    pub fn row(&self, state: usize) -> &[f64] {
        assert!(state < NUM_STATES, "state index {} out of range 0..{}", state, NUM_STATES);
        &self.values[state * NUM_ACTIONS..(state + 1) * NUM_ACTIONS]
    }

    /// Highest-valued action; ties go to the lowest ordinal.
    pub fn best_action(&self, state: usize) -> Action {
        let mut best = Action::KeepClosed;
        let mut best_value = f64::MIN;
        for (action, &value) in Action::ALL.iter().zip(self.row(state)) {
            if value > best_value {
                best_value = value;
                best = *action;
            }
        }
        best
    }

    /// Lookahead term: max over the row, never below 0.
    fn max_value_floored(&self, state: usize) -> f64 {
        self.row(state).iter().fold(0.0, |max, &v| if v > max { v } else { max })
    }

    fn set(&mut self, state: usize, action: Action, value: f64) {
        assert!(state < NUM_STATES, "state index {} out of range 0..{}", state, NUM_STATES);
        self.values[state * NUM_ACTIONS + action.index()] = value;
    }
}

/// Epsilon-greedy Q-learning agent.
#[derive(Debug)]
pub struct Agent {
    learning_rate: f64,
    discount_factor: f64,
    exploration_rate: f64,
    table: QTable,
    rng: StdRng,
}

impl Agent {
    /// Create an agent seeded from OS entropy.
    pub fn new(learning_rate: f64, discount_factor: f64, exploration_rate: f64) -> Self {
        Self::from_rng(learning_rate, discount_factor, exploration_rate, StdRng::from_entropy())
    }

    /// Create an agent with a reproducible random stream.
    pub fn with_seed(learning_rate: f64, discount_factor: f64, exploration_rate: f64, seed: u64) -> Self {
        Self::from_rng(learning_rate, discount_factor, exploration_rate, StdRng::seed_from_u64(seed))
    }

    fn from_rng(learning_rate: f64, discount_factor: f64, exploration_rate: f64, mut rng: StdRng) -> Self {
        let table = QTable::with_noise(&mut rng);
        Self {
            learning_rate,
            discount_factor,
            exploration_rate: exploration_rate.clamp(0.0, 1.0),
            table,
            rng,
        }
    }

    /// Replace the freshly initialized table, e.g. with a persisted one.
    pub fn with_table(mut self, table: QTable) -> Self {
        self.table = table;
        self
    }

    /// Epsilon-greedy selection.
    pub fn choose_action(&mut self, state: usize) -> Action {
        if self.rng.gen::<f64>() < self.exploration_rate {
            Action::ALL[self.rng.gen_range(0..NUM_ACTIONS)]
        } else {
            self.table.best_action(state)
        }
    }

    /// Apply one Bellman update and return the new value of `Q[prev, action]`.
    pub fn update(&mut self, prev: usize, action: Action, reward: f64, next: usize) -> f64 {
        let max_next = self.table.max_value_floored(next);
        let old = self.table.get(prev, action);
        let new = old + self.learning_rate * (reward + self.discount_factor * max_next - old);
        self.table.set(prev, action, new);
        new
    }

    pub fn set_exploration_rate(&mut self, rate: f64) {
        self.exploration_rate = rate.clamp(0.0, 1.0);
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }
}
