//! Per-partition statistical state.
//!
//! Accumulators only collect observations while predictions stream in. Freezing
//! sorts the observations by row id, so anything computed from a
//! [`FrozenAccumulator`] is independent of the order the rows arrived in.

use std::sync::Arc;

use crate::types::CostMatrix;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassObservation {
    pub row_id: usize,
    pub actual: usize,
    pub distribution: Vec<f64>,
}

impl ClassObservation {
    /// Index of the most confident class; ties go to the lowest index.
    pub fn predicted(&self) -> usize {
        let mut best = 0;
        for (i, p) in self.distribution.iter().enumerate() {
            if *p > self.distribution[best] {
                best = i;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueObservation {
    pub row_id: usize,
    pub actual: f64,
    pub predicted: f64,
}

#[derive(Debug, Clone)]
pub enum Accumulator {
    Classification {
        num_classes: usize,
        cost_matrix: Option<Arc<CostMatrix>>,
        observations: Vec<ClassObservation>,
    },
    Regression {
        observations: Vec<ValueObservation>,
    },
}

impl Accumulator {
    pub fn classification(num_classes: usize, cost_matrix: Option<Arc<CostMatrix>>) -> Self {
        Accumulator::Classification { num_classes, cost_matrix, observations: Vec::new() }
    }

    pub fn regression() -> Self {
        Accumulator::Regression { observations: Vec::new() }
    }

    pub fn len(&self) -> usize {
        match self {
            Accumulator::Classification { observations, .. } => observations.len(),
            Accumulator::Regression { observations } => observations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ignored by regression accumulators.
    pub fn add_class(&mut self, row_id: usize, actual: usize, distribution: &[f64]) {
        if let Accumulator::Classification { observations, .. } = self {
            observations.push(ClassObservation { row_id, actual, distribution: distribution.to_vec() });
        }
    }

    /// Ignored by classification accumulators.
    pub fn add_value(&mut self, row_id: usize, actual: f64, predicted: f64) {
        if let Accumulator::Regression { observations } = self {
            observations.push(ValueObservation { row_id, actual, predicted });
        }
    }

    pub fn freeze(self) -> FrozenAccumulator {
        match self {
            Accumulator::Classification { num_classes, cost_matrix, mut observations } => {
                observations.sort_by_key(|o| o.row_id);
                FrozenAccumulator::Classification { num_classes, cost_matrix, observations }
            }
            Accumulator::Regression { mut observations } => {
                observations.sort_by_key(|o| o.row_id);
                FrozenAccumulator::Regression { observations }
            }
        }
    }
}

/// Read-only accumulator handed to a metrics engine.
#[derive(Debug, Clone)]
pub enum FrozenAccumulator {
    Classification {
        num_classes: usize,
        cost_matrix: Option<Arc<CostMatrix>>,
        observations: Vec<ClassObservation>,
    },
    Regression {
        observations: Vec<ValueObservation>,
    },
}

impl FrozenAccumulator {
    pub fn len(&self) -> usize {
        match self {
            FrozenAccumulator::Classification { observations, .. } => observations.len(),
            FrozenAccumulator::Regression { observations } => observations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn class_observations(&self) -> &[ClassObservation] {
        match self {
            FrozenAccumulator::Classification { observations, .. } => observations,
            FrozenAccumulator::Regression { .. } => &[],
        }
    }

    pub fn value_observations(&self) -> &[ValueObservation] {
        match self {
            FrozenAccumulator::Regression { observations } => observations,
            FrozenAccumulator::Classification { .. } => &[],
        }
    }

    pub fn row_ids(&self) -> Vec<usize> {
        match self {
            FrozenAccumulator::Classification { observations, .. } => {
                observations.iter().map(|o| o.row_id).collect()
            }
            FrozenAccumulator::Regression { observations } => observations.iter().map(|o| o.row_id).collect(),
        }
    }
}
