use crate::core::utils::geometry::{centroid, kabsch_rotation};
use nalgebra::{Point3, Rotation3, Vector3};
use tracing::trace;

/// Passes of reference refinement before giving up on convergence.
const MAX_PASSES: usize = 100;
/// Mean squared per-residue movement of the reference, relative to its mean squared
/// radius, below which it is considered stable.
const CONVERGENCE_TOLERANCE: f64 = 1e-18;

/// A proper rigid motion. `apply` maps `x` to `R · (x − t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    #[inline]
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * (point.coords - self.translation))
    }

    /// Maps an aligned point back into the member's original frame: `Rᵀ · y + t`.
    #[inline]
    pub fn inverse_apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation.inverse() * point.coords + self.translation)
    }

    pub fn apply_all(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| self.apply(p)).collect()
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

fn mean_squared_shift(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> f64 {
    let total: f64 = a.iter().zip(b).map(|(x, y)| (x - y).norm_squared()).sum();
    total / a.len() as f64
}

fn mean_squared_radius(points: &[Vector3<f64>]) -> f64 {
    points.iter().map(|v| v.norm_squared()).sum::<f64>() / points.len() as f64
}

/// Finds, for every trace, the rigid transform that brings it onto the common
/// consensus frame (generalized Procrustes analysis).
///
/// Each trace is centered on its own centroid, then rotated onto a reference that
/// starts as the first centered trace and is replaced by the mean of the rotated traces
/// until it stops moving. The resulting transforms minimize the summed squared
/// deviation of every member from the mean trace.
///
/// # Panics
///
/// Panics if `traces` is empty, if any trace is empty, or if the traces differ in
/// length. Callers validate ensemble shape before reaching this point.
pub fn find_alignment_transforms(traces: &[Vec<Point3<f64>>]) -> Vec<RigidTransform> {
    assert!(!traces.is_empty(), "superposition needs at least one trace");
    let residues = traces[0].len();
    assert!(residues > 0, "superposition needs non-empty traces");
    assert!(
        traces.iter().all(|t| t.len() == residues),
        "all traces must have the same length"
    );

    let centers: Vec<Vector3<f64>> = traces
        .iter()
        .map(|t| centroid(t).map_or_else(Vector3::zeros, |c| c.coords))
        .collect();
    let centered: Vec<Vec<Vector3<f64>>> = traces
        .iter()
        .zip(&centers)
        .map(|(trace, center)| trace.iter().map(|p| p.coords - center).collect())
        .collect();

    let mut rotations = vec![Rotation3::identity(); traces.len()];
    let mut reference = centered[0].clone();

    if traces.len() > 1 {
        for pass in 0..MAX_PASSES {
            for (rotation, member) in rotations.iter_mut().zip(&centered) {
                *rotation = kabsch_rotation(member, &reference);
            }

            let mut mean = vec![Vector3::zeros(); residues];
            for (rotation, member) in rotations.iter().zip(&centered) {
                for (acc, v) in mean.iter_mut().zip(member) {
                    *acc += rotation * v;
                }
            }
            let scale = 1.0 / traces.len() as f64;
            mean.iter_mut().for_each(|v| *v *= scale);

            let shift = mean_squared_shift(&mean, &reference);
            let radius = mean_squared_radius(&mean);
            reference = mean;
            trace!(pass, shift, radius, "Refined superposition reference.");
            if shift <= CONVERGENCE_TOLERANCE * radius {
                break;
            }
        }
    }

    rotations
        .into_iter()
        .zip(centers)
        .map(|(rotation, translation)| RigidTransform {
            rotation,
            translation,
        })
        .collect()
}
