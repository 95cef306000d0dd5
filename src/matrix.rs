
// imports
use crate::error::{GloveError, Result};
use crate::vocab::TokenId;

use std::collections::HashMap;
use std::fmt;
use ndarray::{array, s, Array1, Array2};
use serde::{de::Visitor, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};

/// `(main_id, context_id)`
pub type PairKey = (TokenId, TokenId);

/// One non-zero entry: main id, context id, accumulated weight.
pub type Triplet = (TokenId, TokenId, f64);


/// Sparse, directed cooccurrence counts. `(a, b)` and `(b, a)` are separate
/// entries; a symmetric value is their sum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CooccurrenceMatrix {
    x_mat: HashMap<PairKey, f64>,
}

impl CooccurrenceMatrix {

    pub fn new() -> CooccurrenceMatrix {
        Self::default()
    }

    pub fn add(&mut self, main: TokenId, context: TokenId, weight: f64) {
        let val = self.x_mat.entry((main, context)).or_insert(0.0);
        *val += weight;
    }

    pub fn get(&self, main: TokenId, context: TokenId) -> Option<f64> {
        self.x_mat.get(&(main, context)).copied()
    }

    pub fn weight(&self, main: TokenId, context: TokenId) -> f64 {
        self.get(main, context).unwrap_or(0.0)
    }

    pub fn symmetric_weight(&self, a: TokenId, b: TokenId) -> f64 {
        if a == b {
            return self.weight(a, a);
        }
        self.weight(a, b) + self.weight(b, a)
    }

    pub fn len(&self) -> usize {
        self.x_mat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_mat.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.x_mat.values().sum()
    }

    /// Sums the weights of `other` into `self`. The order of merging partial
    /// matrices does not matter (up to floating point rounding).
    pub fn merge(self, other: CooccurrenceMatrix) -> CooccurrenceMatrix {
        // fold the smaller map into the larger one
        let (mut large, small) = if self.len() >= other.len() { (self, other) } else { (other, self) };
        for ((i, j), v) in small.x_mat {
            large.add(i, j, v);
        }
        large
    }

    /// The `k` heaviest contexts of `main`, heaviest first.
    pub fn top_contexts(&self, main: TokenId, k: usize) -> Vec<(TokenId, f64)> {
        let mut row: Vec<(TokenId, f64)> = self.x_mat
            .iter()
            .filter(|(key, _)| key.0 == main)
            .map(|(key, v)| (key.1, *v))
            .collect();
        row.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        row.truncate(k);
        row
    }

    /// All entries sorted by main id, then context id.
    pub fn triplets(&self) -> Vec<Triplet> {
        let mut triplets: Vec<Triplet> = self.x_mat.iter().map(|(k, v)| (k.0, k.1, *v)).collect();
        triplets.sort_by_key(|t| (t.0, t.1));
        triplets
    }

    pub fn from_triplets<I>(triplets: I) -> CooccurrenceMatrix
    where I: IntoIterator<Item = Triplet> {
        // repeated keys are summed, like a merge
        let mut matrix = CooccurrenceMatrix::new();
        for (i, j, v) in triplets {
            matrix.add(i, j, v);
        }
        matrix
    }

    /// `N x 3` array of the sorted triplets, ids stored as floats.
    pub fn to_ndarray(&self) -> Array2<f64> {
        let triplets = self.triplets();
        let mut nd_array: Array2<f64> = Array2::zeros((triplets.len(), 3));
        for (i, (main, context, v)) in triplets.into_iter().enumerate() {
            let line: Array1<f64> = array![main as f64, context as f64, v];
            nd_array.slice_mut(s![i, ..]).assign(&line);
        }
        nd_array
    }

    pub fn from_ndarray(nd_array: &Array2<f64>) -> Result<CooccurrenceMatrix> {
        if nd_array.ncols() != 3 {
            return Err(GloveError::Serialization(format!("expected 3 columns, found {}", nd_array.ncols())));
        }
        let mut matrix = CooccurrenceMatrix::new();
        for row in nd_array.rows() {
            let main = id_from_f64(row[0])?;
            let context = id_from_f64(row[1])?;
            matrix.add(main, context, row[2]);
        }
        Ok(matrix)
    }
}

fn id_from_f64(x: f64) -> Result<TokenId> {
    if x < 0.0 || x.fract() != 0.0 || !x.is_finite() {
        return Err(GloveError::Serialization(format!("{} is not a token id", x)));
    }
    Ok(x as TokenId)
}


// serialized as a sequence of (main, context, weight) in triplet order, so that
// the bytes do not depend on hash map iteration
impl Serialize for CooccurrenceMatrix {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer {

            let mut seq = serializer.serialize_seq(Some(self.len()))?;
            for (main, context, v) in self.triplets() {
                seq.serialize_element(&(main as u64, context as u64, v))?;
            }
            seq.end()
    }
}

struct TripletsVisitor;

impl<'de> Visitor<'de> for TripletsVisitor {

    type Value = CooccurrenceMatrix;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence of (main id, context id, weight)")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>, {

                let mut matrix = CooccurrenceMatrix::new();
                while let Some((main, context, v)) = seq.next_element::<(u64, u64, f64)>()? {
                    matrix.add(main as TokenId, context as TokenId, v);
                }
                Ok(matrix)
    }
}

impl<'de> Deserialize<'de> for CooccurrenceMatrix {

    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de> {
            deserializer.deserialize_seq(TripletsVisitor)
    }
}


#[cfg(test)]
mod tests {

    use super::CooccurrenceMatrix;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn sample() -> CooccurrenceMatrix {
        CooccurrenceMatrix::from_triplets(vec![(2, 0, 0.5), (0, 1, 1.0), (1, 0, 0.25), (0, 1, 1.0)])
    }

    #[test]
    fn entries_accumulate_and_sort() {
        let matrix = sample();
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.triplets(), vec![(0, 1, 2.0), (1, 0, 0.25), (2, 0, 0.5)]);
        assert_eq!(matrix.get(0, 2), None);
        assert_eq!(matrix.weight(0, 2), 0.0);
        assert_relative_eq!(matrix.symmetric_weight(0, 1), 2.25);
        assert_relative_eq!(matrix.total_weight(), 2.75);
    }

    #[test]
    fn merge_sums_and_commutes() {
        let other = CooccurrenceMatrix::from_triplets(vec![(0, 1, 0.5), (3, 3, 1.0)]);
        let ab = sample().merge(other.clone());
        let ba = other.merge(sample());
        assert_eq!(ab, ba);
        assert_eq!(ab.triplets(), vec![(0, 1, 2.5), (1, 0, 0.25), (2, 0, 0.5), (3, 3, 1.0)]);
        assert_eq!(sample().merge(CooccurrenceMatrix::new()), sample());
    }

    #[test]
    fn top_contexts_of_a_row() {
        let matrix = CooccurrenceMatrix::from_triplets(vec![(0, 3, 0.5), (0, 1, 2.0), (0, 2, 0.5), (1, 0, 9.0)]);
        assert_eq!(matrix.top_contexts(0, 2), vec![(1, 2.0), (2, 0.5)]);
        assert_eq!(matrix.top_contexts(0, 10).len(), 3);
        assert!(matrix.top_contexts(5, 3).is_empty());
    }

    #[test]
    fn ndarray_rows_follow_triplet_order() {
        let nd = sample().to_ndarray();
        assert_eq!(nd, array![[0.0, 1.0, 2.0], [1.0, 0.0, 0.25], [2.0, 0.0, 0.5]]);
        assert_eq!(CooccurrenceMatrix::from_ndarray(&nd).unwrap(), sample());

        assert!(CooccurrenceMatrix::from_ndarray(&array![[0.0, 1.0]]).is_err());
        assert!(CooccurrenceMatrix::from_ndarray(&array![[0.5, 1.0, 1.0]]).is_err());
        assert!(CooccurrenceMatrix::from_ndarray(&array![[-1.0, 1.0, 1.0]]).is_err());
    }

    #[test]
    fn serde_sequence_is_deterministic() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, "[[0,1,2.0],[1,0,0.25],[2,0,0.5]]");
        let back: CooccurrenceMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }
}
