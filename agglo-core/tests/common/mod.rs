#![expect(
    dead_code,
    reason = "each integration test binary uses a different subset of these fixtures"
)]

use agglo_core::{DataSource, DataSourceError, MergeHistory};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use test_strategy::Arbitrary;

/// Points in the plane compared by Euclidean distance.
#[derive(Clone, Debug)]
pub struct Points {
    coords: Vec<[f64; 2]>,
}

impl Points {
    #[must_use]
    pub fn new(coords: Vec<[f64; 2]>) -> Self {
        Self { coords }
    }
}

impl DataSource for Points {
    fn len(&self) -> usize {
        self.coords.len()
    }

    fn name(&self) -> &str {
        "points"
    }

    fn distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
        let a = self
            .coords
            .get(i)
            .ok_or(DataSourceError::OutOfBounds { index: i })?;
        let b = self
            .coords
            .get(j)
            .ok_or(DataSourceError::OutOfBounds { index: j })?;
        Ok((a[0] - b[0]).hypot(a[1] - b[1]))
    }
}

/// A source whose distances fail past a given row.
pub struct Truncated {
    pub len: usize,
    pub readable: usize,
}

impl DataSource for Truncated {
    fn len(&self) -> usize {
        self.len
    }

    fn name(&self) -> &str {
        "truncated"
    }

    fn distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
        for index in [i, j] {
            if index >= self.readable {
                return Err(DataSourceError::OutOfBounds { index });
            }
        }
        Ok(1.0)
    }
}

/// Vectors of mixed dimensionality; comparing two of different length fails.
#[derive(Clone, Debug)]
pub struct Ragged(pub Vec<Vec<f64>>);

impl DataSource for Ragged {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn name(&self) -> &str {
        "ragged"
    }

    fn distance(&self, i: usize, j: usize) -> Result<f64, DataSourceError> {
        let (left, right) = (&self.0[i], &self.0[j]);
        if left.len() != right.len() {
            return Err(DataSourceError::DimensionMismatch {
                left: left.len(),
                right: right.len(),
            });
        }
        Ok(left
            .iter()
            .zip(right)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt())
    }
}

/// Shape of a generated point set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Arbitrary)]
pub enum Layout {
    /// Points sampled uniformly in a square.
    #[weight(3)]
    Uniform,
    /// Tight blobs around a few random centres.
    #[weight(3)]
    Clustered,
    /// Points along a line with random gaps.
    #[weight(2)]
    Line,
    /// Uniform points with exact duplicates mixed in.
    #[weight(1)]
    Duplicates,
}

impl Layout {
    /// Whether the layout can produce tied distances.
    #[must_use]
    pub fn has_ties(self) -> bool {
        matches!(self, Self::Duplicates)
    }

    /// Generates `count` points from `seed`.
    #[must_use]
    pub fn generate(self, count: usize, seed: u64) -> Points {
        let mut rng = SmallRng::seed_from_u64(seed);
        let coords = match self {
            Self::Uniform => (0..count).map(|_| uniform(&mut rng, 100.0)).collect(),
            Self::Clustered => {
                let centres: Vec<[f64; 2]> = (0..rng.gen_range(1..=4))
                    .map(|_| uniform(&mut rng, 100.0))
                    .collect();
                (0..count)
                    .map(|index| {
                        let centre = centres[index % centres.len()];
                        let offset = uniform(&mut rng, 2.0);
                        [centre[0] + offset[0], centre[1] + offset[1]]
                    })
                    .collect()
            }
            Self::Line => {
                let mut x = 0.0;
                (0..count)
                    .map(|_| {
                        x += rng.gen_range(0.1..10.0);
                        [x, 0.0]
                    })
                    .collect()
            }
            Self::Duplicates => {
                let mut coords: Vec<[f64; 2]> = Vec::with_capacity(count);
                for _ in 0..count {
                    if !coords.is_empty() && rng.gen_bool(0.3) {
                        let copy = coords[rng.gen_range(0..coords.len())];
                        coords.push(copy);
                    } else {
                        coords.push(uniform(&mut rng, 100.0));
                    }
                }
                coords
            }
        };
        Points::new(coords)
    }
}

fn uniform(rng: &mut SmallRng, bound: f64) -> [f64; 2] {
    [rng.gen_range(-bound..bound), rng.gen_range(-bound..bound)]
}

/// Checks that `history` encodes one binary tree over its leaves with
/// consistent cluster sizes. Returns a description of the first problem.
pub fn tree_problem(history: &MergeHistory) -> Option<String> {
    let n = history.leaf_count();
    if !history.is_complete() {
        return Some(format!("{} merges for {n} leaves", history.merge_count()));
    }
    let mut used = vec![false; history.leaf_count() + history.merge_count()];
    for merge in history.iter() {
        for child in [merge.left(), merge.right()] {
            if child >= merge.id() {
                return Some(format!("{merge:?} references cluster {child} too early"));
            }
            if std::mem::replace(&mut used[child], true) {
                return Some(format!("cluster {child} merged twice"));
            }
        }
        let expected = history.cluster_size(merge.left()).unwrap_or(0)
            + history.cluster_size(merge.right()).unwrap_or(0);
        if merge.size() != expected {
            return Some(format!("{merge:?} should hold {expected} objects"));
        }
    }
    if n > 0 && history.cluster_size(n + history.merge_count() - 1) != Some(n) {
        return Some("root does not hold every object".to_owned());
    }
    None
}

/// Merge heights in ascending order.
#[must_use]
pub fn sorted_heights(history: &MergeHistory) -> Vec<f64> {
    let mut heights = history.distances().to_vec();
    heights.sort_by(f64::total_cmp);
    heights
}

/// Whether `a` and `b` agree elementwise up to a relative tolerance.
#[must_use]
pub fn heights_agree(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= 1e-9 * x.abs().max(y.abs()).max(1.0))
}

/// Whether heights never drop by more than rounding noise.
#[must_use]
pub fn nearly_monotone(heights: &[f64]) -> bool {
    heights
        .windows(2)
        .all(|pair| pair[1] >= pair[0] - 1e-9 * pair[0].abs().max(1.0))
}
