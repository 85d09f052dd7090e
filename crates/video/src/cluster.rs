//! Centroid-based clustering of visual embeddings.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use visionrag_core::{AppError, AppResult};

/// Result of partitioning `n` points into `k` clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct Clusters {
    /// Cluster of each input point, in input order
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f32>>,
    /// Sum of squared distances from points to their centroid
    pub inertia: f64,
}

impl Clusters {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Indices of the points assigned to `cluster`.
    pub fn members(&self, cluster: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, &label)| label == cluster)
            .map(|(i, _)| i)
    }
}

/// Partitions points into clusters.
pub trait Clustering: Send + Sync {
    /// Cluster `points` into `min(k, points.len())` groups, at least one.
    ///
    /// An empty input yields empty clusters.
    fn fit(&self, points: &[Vec<f32>], k: usize) -> AppResult<Clusters>;
}

/// Lloyd's k-means with k-means++ seeding and several restarts.
///
/// Deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl KMeans {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    fn run_once(&self, points: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Clusters {
        let mut centroids = init_plus_plus(points, k, rng);
        let mut labels = vec![0usize; points.len()];

        for iteration in 0..self.max_iter {
            let changed = assign(points, &centroids, &mut labels);
            let mut updated = recompute(points, &labels, k, centroids[0].len());
            refill_empty(points, &mut labels, &mut updated);

            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(a, b)| squared_distance(a, b))
                .sum();
            centroids = updated;

            if (!changed && iteration > 0) || shift <= self.tolerance {
                break;
            }
        }

        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &l)| squared_distance(p, &centroids[l]))
            .sum();

        Clusters {
            labels,
            centroids,
            inertia,
        }
    }
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-8,
        }
    }
}

impl Clustering for KMeans {
    fn fit(&self, points: &[Vec<f32>], k: usize) -> AppResult<Clusters> {
        if points.is_empty() {
            return Ok(Clusters {
                labels: Vec::new(),
                centroids: Vec::new(),
                inertia: 0.0,
            });
        }

        let dim = points[0].len();
        if dim == 0 || points.iter().any(|p| p.len() != dim) {
            return Err(AppError::Other(
                "Cannot cluster embeddings of differing or zero dimension".to_string(),
            ));
        }

        let k = k.clamp(1, points.len());
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Clusters> = None;

        for _ in 0..self.n_init.max(1) {
            let candidate = self.run_once(points, k, &mut rng);
            if best.as_ref().map_or(true, |b| candidate.inertia < b.inertia) {
                best = Some(candidate);
            }
        }

        best.ok_or_else(|| AppError::Other("k-means produced no clustering".to_string()))
    }
}

pub(crate) fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum()
}

fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++: each next centre is drawn with probability proportional to
/// its squared distance from the closest centre chosen so far.
fn init_plus_plus(points: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = weights.iter().sum();

        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = points.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    pick = i;
                    break;
                }
                target -= w;
            }
            pick
        } else {
            rng.gen_range(0..points.len())
        };
        centroids.push(points[chosen].clone());
    }

    centroids
}

/// Assign every point to its nearest centroid. Returns whether any label moved.
fn assign(points: &[Vec<f32>], centroids: &[Vec<f32>], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (point, label) in points.iter().zip(labels.iter_mut()) {
        let (best, _) = nearest(point, centroids);
        if *label != best {
            *label = best;
            changed = true;
        }
    }
    changed
}

fn recompute(points: &[Vec<f32>], labels: &[usize], k: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut sums = vec![vec![0f64; dim]; k];
    let mut counts = vec![0usize; k];
    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(point) {
            *s += *v as f64;
        }
    }

    sums.into_iter()
        .zip(&counts)
        .map(|(sum, &count)| {
            if count == 0 {
                // marked for refill
                Vec::new()
            } else {
                sum.into_iter().map(|s| (s / count as f64) as f32).collect()
            }
        })
        .collect()
}

/// Give each empty cluster the point farthest from its own centroid, taken
/// from a cluster that keeps at least one member.
fn refill_empty(points: &[Vec<f32>], labels: &mut [usize], centroids: &mut [Vec<f32>]) {
    let k = centroids.len();
    for empty in 0..k {
        if !centroids[empty].is_empty() {
            continue;
        }

        let mut counts = vec![0usize; k];
        for &l in labels.iter() {
            counts[l] += 1;
        }

        let donor = points
            .iter()
            .enumerate()
            .filter(|(i, _)| counts[labels[*i]] > 1 && !centroids[labels[*i]].is_empty())
            .map(|(i, p)| (i, squared_distance(p, &centroids[labels[i]])))
            .fold(None, |best: Option<(usize, f64)>, cur| match best {
                Some(b) if b.1 >= cur.1 => Some(b),
                _ => Some(cur),
            });

        if let Some((idx, _)) = donor {
            labels[idx] = empty;
            centroids[empty] = points[idx].clone();
        } else {
            // every point is already alone; reuse any point
            centroids[empty] = points[empty % points.len()].clone();
        }
    }
}
