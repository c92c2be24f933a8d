//! Row clustering for sum nodes
//!
//! Rows of a slice are min-max normalized per column and split with k-means
//! (k-means++ seeding, Lloyd iterations). All randomness comes from the
//! learner's seeded generator so a structure is reproducible.

use rand::rngs::StdRng;
use rand::Rng;

use crate::Matrix;

/// Upper bound on Lloyd iterations.
pub const MAX_ITERATIONS: usize = 100;

/// Per-column min-max normalization of `data[rows, scope]`.
///
/// Missing values map to 0.5 and constant columns to 0.
#[must_use]
pub fn normalize(data: &Matrix, rows: &[usize], scope: &[usize]) -> Vec<Vec<f64>> {
    let ranges: Vec<(f64, f64)> = scope
        .iter()
        .map(|&col| {
            rows.iter()
                .map(|&r| data.get(r, col))
                .filter(|v| !v.is_nan())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
        })
        .collect();

    rows.iter()
        .map(|&r| {
            scope
                .iter()
                .zip(&ranges)
                .map(|(&col, &(lo, hi))| {
                    let v = data.get(r, col);
                    if v.is_nan() {
                        0.5
                    } else if hi > lo {
                        (v - lo) / (hi - lo)
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Cluster `points` into at most `k` groups.
///
/// Returns one label per point, renumbered to `0..m` in order of first
/// appearance, or `None` when fewer than two non-empty clusters come out
/// (for example when every point is identical).
#[must_use]
pub fn kmeans(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Option<Vec<usize>> {
    if points.len() < 2 || k < 2 {
        return None;
    }
    let mut centers = seed_centers(points, k, rng)?;
    let mut labels = vec![usize::MAX; points.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (label, point) in labels.iter_mut().zip(points) {
            let nearest = nearest_center(point, &centers).0;
            if *label != nearest {
                *label = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        update_centers(points, &labels, &mut centers);
    }

    relabel(&labels)
}

/// k-means++: first center uniform, the rest proportional to squared distance.
fn seed_centers(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Option<Vec<Vec<f64>>> {
    let mut centers = vec![points[rng.gen_range(0..points.len())].clone()];
    while centers.len() < k {
        let distances: Vec<f64> = points.iter().map(|p| nearest_center(p, &centers).1).collect();
        let total: f64 = distances.iter().sum();
        if total <= 0.0 {
            break;
        }
        let mut target = rng.gen::<f64>() * total;
        let mut chosen = points.len() - 1;
        for (i, d) in distances.iter().enumerate() {
            if target < *d {
                chosen = i;
                break;
            }
            target -= d;
        }
        centers.push(points[chosen].clone());
    }
    (centers.len() >= 2).then_some(centers)
}

fn nearest_center(point: &[f64], centers: &[Vec<f64>]) -> (usize, f64) {
    centers
        .iter()
        .map(|c| squared_distance(point, c))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Move every center to the mean of its points. Empty clusters keep their center.
fn update_centers(points: &[Vec<f64>], labels: &[usize], centers: &mut [Vec<f64>]) {
    let dims = points[0].len();
    let mut sums = vec![vec![0.0; dims]; centers.len()];
    let mut counts = vec![0usize; centers.len()];
    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(point) {
            *s += v;
        }
    }
    for ((center, sum), count) in centers.iter_mut().zip(sums).zip(counts) {
        if count > 0 {
            #[allow(clippy::cast_precision_loss)]
            let n = count as f64;
            *center = sum.into_iter().map(|s| s / n).collect();
        }
    }
}

fn relabel(labels: &[usize]) -> Option<Vec<usize>> {
    let mut mapping: Vec<(usize, usize)> = Vec::new();
    let out: Vec<usize> = labels
        .iter()
        .map(|&label| {
            if let Some(&(_, dense)) = mapping.iter().find(|(raw, _)| *raw == label) {
                dense
            } else {
                let dense = mapping.len();
                mapping.push((label, dense));
                dense
            }
        })
        .collect();
    (mapping.len() >= 2).then_some(out)
}
