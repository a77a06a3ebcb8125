use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Some(Point3::from(sum / points.len() as f64))
}

/// Proper rotation `R` minimizing `Σ |R·mobile[k] − target[k]|²` for two centered
/// point sets (Kabsch). Reflections are corrected so that `det(R) = +1`.
pub fn kabsch_rotation(mobile: &[Vector3<f64>], target: &[Vector3<f64>]) -> Rotation3<f64> {
    let covariance: Matrix3<f64> = mobile
        .iter()
        .zip(target.iter())
        .map(|(x, y)| x * y.transpose())
        .sum();

    let svd = covariance.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Rotation3::identity();
    };
    let mut v = v_t.transpose();

    if (v * u.transpose()).determinant() < 0.0 {
        let weakest = svd.singular_values.imin();
        v.column_mut(weakest).neg_mut();
    }

    Rotation3::from_matrix_unchecked(v * u.transpose())
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}
