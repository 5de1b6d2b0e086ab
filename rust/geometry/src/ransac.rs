// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RANSAC plane fitting.
//!
//! Samples are drawn sequentially from a seeded RNG, then scored in
//! parallel. The winner is the candidate with the most inliers; among equal
//! counts the earliest trial wins, so the result does not depend on how
//! rayon schedules the trials.

use crate::fit::fit_plane_indexed;
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use scan_lite_core::{Outcome, PlaneModel};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// RANSAC parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Maximum point-to-plane distance for an inlier
    pub distance_threshold: f64,
    /// Number of sampled candidate planes
    pub iterations: usize,
    /// Points per sample (3 = exact plane through the sample)
    pub sample_size: usize,
    pub seed: u64,
    /// Refit the winning plane to all of its inliers
    pub refine: bool,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            distance_threshold: 0.02,
            iterations: 1000,
            sample_size: 3,
            seed: 42,
            refine: true,
        }
    }
}

/// Winning plane and its inliers
#[derive(Debug, Clone)]
pub struct PlaneFit {
    pub model: PlaneModel,
    /// Inlier indices into the full point slice, ascending
    pub inliers: Vec<usize>,
    /// Trials whose sample could not define a plane
    pub degenerate_trials: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    model: PlaneModel,
    inliers: usize,
}

/// Fit the best-supported plane among `points[i]` for `i` in `subset`.
///
/// Returns `Skipped` when the subset is smaller than one sample and
/// `Failed` when every trial drew a degenerate sample.
pub fn fit_plane_ransac(
    points: &[Point3<f64>],
    subset: &[usize],
    params: &RansacParams,
) -> Outcome<PlaneFit> {
    let sample_size = params.sample_size.max(3);
    if subset.len() < sample_size {
        return Outcome::Skipped(format!(
            "{} points available, {} needed for a sample",
            subset.len(),
            sample_size
        ));
    }
    if params.iterations == 0 {
        return Outcome::Skipped("no RANSAC iterations requested".into());
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let samples: Vec<SmallVec<[usize; 3]>> = (0..params.iterations)
        .map(|_| {
            rand::seq::index::sample(&mut rng, subset.len(), sample_size)
                .into_iter()
                .map(|k| subset[k])
                .collect()
        })
        .collect();

    let threshold = params.distance_threshold;
    let candidates: Vec<Option<Candidate>> = samples
        .par_iter()
        .map(|sample| {
            let model = sample_plane(points, sample)?;
            let inliers = count_inliers(points, subset, &model, threshold);
            Some(Candidate { model, inliers })
        })
        .collect();

    let degenerate_trials = candidates.iter().filter(|c| c.is_none()).count();
    // Trial order is preserved by collect(); the strict comparison keeps
    // the first of equally supported candidates.
    let best = candidates
        .into_iter()
        .flatten()
        .reduce(|best, next| if next.inliers > best.inliers { next } else { best });

    let Some(best) = best else {
        return Outcome::Failed(format!(
            "all {} RANSAC samples were degenerate",
            params.iterations
        ));
    };

    let mut model = best.model;
    let mut inliers = collect_inliers(points, subset, &model, threshold);

    if params.refine && inliers.len() >= 3 {
        if let Some(refined) = fit_plane_indexed(points, &inliers) {
            let refined = if refined.normal().dot(&model.normal()) < 0.0 {
                refined.flipped()
            } else {
                refined
            };
            let refined_inliers = collect_inliers(points, subset, &refined, threshold);
            if refined_inliers.len() >= inliers.len() {
                model = refined;
                inliers = refined_inliers;
            }
        }
    }

    Outcome::Ok(PlaneFit {
        model,
        inliers,
        degenerate_trials,
    })
}

fn sample_plane(points: &[Point3<f64>], sample: &[usize]) -> Option<PlaneModel> {
    if sample.len() == 3 {
        PlaneModel::from_points(&points[sample[0]], &points[sample[1]], &points[sample[2]])
    } else {
        fit_plane_indexed(points, sample)
    }
}

#[inline]
fn count_inliers(points: &[Point3<f64>], subset: &[usize], model: &PlaneModel, threshold: f64) -> usize {
    subset
        .iter()
        .filter(|&&i| model.distance(&points[i]) <= threshold)
        .count()
}

fn collect_inliers(
    points: &[Point3<f64>],
    subset: &[usize],
    model: &PlaneModel,
    threshold: f64,
) -> Vec<usize> {
    let mut inliers: Vec<usize> = subset
        .iter()
        .copied()
        .filter(|&i| model.distance(&points[i]) <= threshold)
        .collect();
    inliers.sort_unstable();
    inliers
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floor_with_clutter() -> Vec<Point3<f64>> {
        let mut points: Vec<Point3<f64>> = (0..30)
            .flat_map(|i| (0..30).map(move |j| Point3::new(i as f64 * 0.1, j as f64 * 0.1, 0.0)))
            .collect();
        // A few boxes standing on the floor
        for k in 0..40 {
            let t = k as f64;
            points.push(Point3::new(0.5 + (t * 0.37) % 1.0, 0.5 + (t * 0.53) % 1.0, 0.3 + (t * 0.11) % 0.8));
        }
        points
    }

    #[test]
    fn test_finds_dominant_plane() {
        let points = floor_with_clutter();
        let subset: Vec<usize> = (0..points.len()).collect();
        let fit = fit_plane_ransac(&points, &subset, &RansacParams::default())
            .ok()
            .unwrap();
        assert_eq!(fit.inliers.len(), 900);
        assert_relative_eq!(fit.model.normal().z.abs(), 1.0, epsilon = 1e-9);
        assert!(fit.inliers.iter().all(|&i| i < 900));
    }

    #[test]
    fn test_same_seed_same_result() {
        let points = floor_with_clutter();
        let subset: Vec<usize> = (0..points.len()).collect();
        let params = RansacParams {
            iterations: 50,
            refine: false,
            ..Default::default()
        };
        let a = fit_plane_ransac(&points, &subset, &params).ok().unwrap();
        let b = fit_plane_ransac(&points, &subset, &params).ok().unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.inliers, b.inliers);
    }

    #[test]
    fn test_subset_restricts_search() {
        let points = floor_with_clutter();
        let subset: Vec<usize> = (900..points.len()).collect();
        let params = RansacParams {
            iterations: 200,
            ..Default::default()
        };
        if let Outcome::Ok(fit) = fit_plane_ransac(&points, &subset, &params) {
            assert!(fit.inliers.iter().all(|&i| i >= 900));
        }
    }

    #[test]
    fn test_too_few_points_skipped() {
        let points = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let outcome = fit_plane_ransac(&points, &[0, 1], &RansacParams::default());
        assert!(matches!(outcome, Outcome::Skipped(_)));
    }

    #[test]
    fn test_collinear_points_fail() {
        let points: Vec<Point3<f64>> = (0..10).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        let subset: Vec<usize> = (0..10).collect();
        let params = RansacParams {
            iterations: 20,
            ..Default::default()
        };
        assert!(matches!(
            fit_plane_ransac(&points, &subset, &params),
            Outcome::Failed(_)
        ));
    }
}
