use nalgebra::{DMatrix, Point3, Vector3};

/// Squared distance of every member's residue from the ensemble mean position of that
/// residue, after alignment. Rows are members, columns are residues.
///
/// Values are in squared coordinate units and are not normalized by chain length, so
/// they are only comparable within a single ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEstimate {
    squared_deviation: DMatrix<f64>,
}

impl ErrorEstimate {
    /// Builds the estimate from aligned traces of equal length.
    ///
    /// # Panics
    ///
    /// Panics if `aligned` is empty or the traces differ in length.
    pub fn from_aligned_traces(aligned: &[Vec<Point3<f64>>]) -> Self {
        assert!(!aligned.is_empty(), "error estimate needs at least one member");
        let members = aligned.len();
        let residues = aligned[0].len();
        assert!(
            aligned.iter().all(|t| t.len() == residues),
            "all aligned traces must have the same length"
        );

        let mut mean = vec![Vector3::zeros(); residues];
        for trace in aligned {
            for (acc, p) in mean.iter_mut().zip(trace) {
                *acc += p.coords;
            }
        }
        mean.iter_mut().for_each(|v| *v /= members as f64);

        let squared_deviation = DMatrix::from_fn(members, residues, |m, r| {
            (aligned[m][r].coords - mean[r]).norm_squared()
        });
        Self { squared_deviation }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.squared_deviation
    }

    pub fn member_count(&self) -> usize {
        self.squared_deviation.nrows()
    }

    pub fn residue_count(&self) -> usize {
        self.squared_deviation.ncols()
    }

    /// Mean squared deviation of each residue across members.
    pub fn per_residue_mean(&self) -> Vec<f64> {
        self.squared_deviation
            .column_iter()
            .map(|column| column.mean())
            .collect()
    }

    /// Root of [`Self::per_residue_mean`]: the distance-to-consensus written as the
    /// per-atom confidence annotation.
    pub fn per_residue_confidence(&self) -> Vec<f64> {
        self.per_residue_mean().into_iter().map(f64::sqrt).collect()
    }

    /// Mean squared deviation of each member across residues; the ranking key.
    pub fn per_member_mean(&self) -> Vec<f64> {
        self.squared_deviation
            .row_iter()
            .map(|row| row.mean())
            .collect()
    }
}
