use serde::{Deserialize, Serialize};

/// Face embedding vector. Only descriptors produced by the same model are
/// comparable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Returns `None` when the lengths differ.
    pub fn euclidean_distance(&self, other: &Descriptor) -> Option<f64> {
        euclidean_distance(&self.0, &other.0)
    }

    /// Scales to unit length; the zero vector is returned unchanged.
    pub fn l2_normalized(mut self) -> Self {
        let norm = self.0.iter().map(|v| (*v as f64) * (*v as f64)).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in self.0.iter_mut() {
                *value = (*value as f64 / norm) as f32;
            }
        }
        self
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// `sqrt(sum((a_i - b_i)^2))`, accumulated in f64.
pub fn euclidean_distance(lhs: &[f32], rhs: &[f32]) -> Option<f64> {
    if lhs.len() != rhs.len() {
        return None;
    }

    let sum = lhs
        .iter()
        .zip(rhs.iter())
        .map(|(a, b)| {
            let diff = *a as f64 - *b as f64;
            diff * diff
        })
        .sum::<f64>();

    Some(sum.sqrt())
}
