use super::confidence::ErrorEstimate;
use super::error::EngineError;
use super::ranking::Ranking;
use super::superposition::{RigidTransform, find_alignment_transforms};
use crate::core::models::prediction::{RawPrediction, ResidueAtoms};
use crate::core::models::sequence::NumberedChains;
use nalgebra::Point3;
use tracing::debug;

/// The reconciled output of one prediction call.
///
/// Built once by [`EnsembleResult::assemble`]; alignment, error estimate and ranking
/// are computed at construction and never change afterwards.
#[derive(Debug, Clone)]
pub struct EnsembleResult {
    member_names: Vec<String>,
    numbered: NumberedChains,
    predictions: Vec<RawPrediction>,
    transforms: Vec<RigidTransform>,
    aligned_traces: Vec<Vec<Point3<f64>>>,
    error_estimate: ErrorEstimate,
    ranking: Ranking,
    confidence: Vec<f64>,
}

impl EnsembleResult {
    /// Validates the member predictions against the numbered chains and derives the
    /// alignment, error estimate and ranking.
    ///
    /// # Errors
    ///
    /// * [`EngineError::EmptyEnsemble`] if there are no predictions.
    /// * [`EngineError::MemberCount`] if the name list does not match the predictions.
    /// * [`EngineError::Shape`] if a prediction's residue count differs from the
    ///   numbered chains.
    /// * [`EngineError::Model`] if a prediction holds non-finite coordinates.
    pub fn assemble(
        member_names: Vec<String>,
        numbered: NumberedChains,
        predictions: Vec<RawPrediction>,
    ) -> Result<Self, EngineError> {
        if predictions.is_empty() {
            return Err(EngineError::EmptyEnsemble);
        }
        if member_names.len() != predictions.len() {
            return Err(EngineError::MemberCount {
                names: member_names.len(),
                predictions: predictions.len(),
            });
        }

        let expected = numbered.total_residues();
        if expected == 0 {
            return Err(EngineError::Shape {
                member: member_names[0].clone(),
                expected: 1,
                actual: 0,
            });
        }
        for (name, prediction) in member_names.iter().zip(&predictions) {
            if prediction.residue_count() != expected {
                return Err(EngineError::Shape {
                    member: name.clone(),
                    expected,
                    actual: prediction.residue_count(),
                });
            }
            if !prediction.is_finite() {
                return Err(EngineError::Model {
                    member: name.clone(),
                    message: "prediction contains non-finite coordinates".to_string(),
                });
            }
        }

        let traces: Vec<_> = predictions.iter().map(RawPrediction::trace).collect();
        let transforms = find_alignment_transforms(&traces);
        let aligned_traces: Vec<_> = transforms
            .iter()
            .zip(&traces)
            .map(|(transform, trace)| transform.apply_all(trace))
            .collect();

        let error_estimate = ErrorEstimate::from_aligned_traces(&aligned_traces);
        let ranking = Ranking::from_scores(&error_estimate.per_member_mean());
        let confidence = error_estimate.per_residue_confidence();

        debug!(
            members = predictions.len(),
            residues = expected,
            ranking = ?ranking.order(),
            "Assembled ensemble."
        );

        Ok(Self {
            member_names,
            numbered,
            predictions,
            transforms,
            aligned_traces,
            error_estimate,
            ranking,
            confidence,
        })
    }

    pub fn member_count(&self) -> usize {
        self.predictions.len()
    }

    pub fn member_names(&self) -> &[String] {
        &self.member_names
    }

    pub fn member_name(&self, member: usize) -> Option<&str> {
        self.member_names.get(member).map(String::as_str)
    }

    pub fn numbered(&self) -> &NumberedChains {
        &self.numbered
    }

    pub fn predictions(&self) -> &[RawPrediction] {
        &self.predictions
    }

    pub fn transforms(&self) -> &[RigidTransform] {
        &self.transforms
    }

    pub fn aligned_traces(&self) -> &[Vec<Point3<f64>>] {
        &self.aligned_traces
    }

    pub fn error_estimate(&self) -> &ErrorEstimate {
        &self.error_estimate
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    /// Per-residue distance to consensus, one entry per residue in output order.
    pub fn per_residue_confidence(&self) -> &[f64] {
        &self.confidence
    }

    pub fn per_residue_mean_error(&self) -> Vec<f64> {
        self.error_estimate.per_residue_mean()
    }

    /// Full atom coordinates of `member` in the common aligned frame.
    pub fn aligned_atoms(&self, member: usize) -> Option<Vec<ResidueAtoms>> {
        let prediction = self.predictions.get(member)?;
        let transform = self.transforms.get(member)?;
        Some(
            prediction
                .atoms
                .iter()
                .map(|residue| residue.map(|p| transform.apply(&p)))
                .collect(),
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::core::utils::geometry::calculate_rmsd;
    use nalgebra::{Rotation3, Vector3};

    #[test]
    fn identical_members_have_zero_error_and_stable_ranking() {
        let atoms = backbone(5);
        let result = EnsembleResult::assemble(
            names(2),
            chains("EVQ", "DI"),
            vec![
                RawPrediction::from_atoms(atoms.clone()),
                RawPrediction::from_atoms(atoms),
            ],
        )
        .unwrap();

        assert!(result.error_estimate().matrix().iter().all(|&v| v.abs() < 1e-18));
        assert_eq!(result.ranking().order(), &[0, 1]);
        assert_eq!(result.per_residue_confidence().len(), 5);
        assert!(result.per_residue_confidence().iter().all(|&c| c < 1e-9));
    }

    #[test]
    fn shifted_member_aligns_onto_the_other() {
        let atoms = backbone(5);
        let result = EnsembleResult::assemble(
            names(2),
            chains("EVQ", "DI"),
            vec![
                RawPrediction::from_atoms(atoms.clone()),
                moved(&atoms, Rotation3::identity(), Vector3::new(10.0, -3.0, 7.5)),
            ],
        )
        .unwrap();

        let traces = result.aligned_traces();
        assert!(calculate_rmsd(&traces[0], &traces[1]).unwrap() < 1e-9);
        assert!(result.error_estimate().matrix().max() < 1e-18);
    }

    #[test]
    fn outlier_member_ranks_last() {
        let atoms = backbone(8);
        let rotation = Rotation3::from_euler_angles(0.3, -1.1, 2.0);
        let predictions = vec![
            RawPrediction::from_atoms(atoms.clone()),
            perturbed(&atoms, 4, Vector3::new(6.0, 0.0, 0.0)),
            moved(&atoms, rotation, Vector3::new(1.0, 2.0, 3.0)),
        ];
        let result = EnsembleResult::assemble(names(3), chains("EVQLV", "DIQ"), predictions).unwrap();

        assert_eq!(result.ranking().member_at(2), Some(1));
        assert_eq!(result.ranking().rank_of(1), Some(2));
        let confidence = result.per_residue_confidence();
        let worst = confidence
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(worst, Some(4));
    }

    #[test]
    fn confidence_does_not_depend_on_member_order() {
        let atoms = backbone(10);
        let a = RawPrediction::from_atoms(atoms.clone());
        let b = perturbed(&atoms, 2, Vector3::new(0.0, 1.5, -0.5));
        let c = moved(
            &perturbed(&atoms, 7, Vector3::new(2.0, 0.0, 1.0)).atoms,
            Rotation3::from_euler_angles(1.0, 0.5, -0.25),
            Vector3::new(-4.0, 8.0, 0.0),
        );

        let forward = EnsembleResult::assemble(
            names(3),
            chains("EVQLVE", "DIQM"),
            vec![a.clone(), b.clone(), c.clone()],
        )
        .unwrap();
        let reversed =
            EnsembleResult::assemble(names(3), chains("EVQLVE", "DIQM"), vec![c, b, a]).unwrap();

        for (x, y) in forward
            .per_residue_confidence()
            .iter()
            .zip(reversed.per_residue_confidence())
        {
            assert!((x - y).abs() < 1e-6, "{} vs {}", x, y);
        }
        let means = forward.error_estimate().per_member_mean();
        let reversed_means = reversed.error_estimate().per_member_mean();
        assert!((means[0] - reversed_means[2]).abs() < 1e-6);
    }

    #[test]
    fn aligned_atoms_follow_the_member_transform() {
        let atoms = backbone(5);
        let result = EnsembleResult::assemble(
            names(2),
            chains("EVQ", "DI"),
            vec![
                RawPrediction::from_atoms(atoms.clone()),
                moved(&atoms, Rotation3::from_euler_angles(0.0, 0.0, 1.2), Vector3::new(3.0, 0.0, 0.0)),
            ],
        )
        .unwrap();

        let first = result.aligned_atoms(0).unwrap();
        let second = result.aligned_atoms(1).unwrap();
        for (r0, r1) in first.iter().zip(&second) {
            for (p0, p1) in r0.iter().zip(r1) {
                assert!((p0 - p1).norm() < 1e-8);
            }
        }
        assert_eq!(first[2][1], result.aligned_traces()[0][2]);
        assert!(result.aligned_atoms(2).is_none());
    }

    #[test]
    fn rejects_empty_ensemble() {
        let result = EnsembleResult::assemble(vec![], chains("EVQ", "DI"), vec![]);
        assert!(matches!(result, Err(EngineError::EmptyEnsemble)));
    }

    #[test]
    fn rejects_names_that_do_not_match_the_predictions() {
        let result = EnsembleResult::assemble(
            names(3),
            chains("EVQ", "DI"),
            vec![
                RawPrediction::from_atoms(backbone(5)),
                RawPrediction::from_atoms(backbone(5)),
            ],
        );
        assert!(matches!(
            result,
            Err(EngineError::MemberCount {
                names: 3,
                predictions: 2
            })
        ));
    }

    #[test]
    fn rejects_residue_count_mismatch_naming_the_member() {
        let result = EnsembleResult::assemble(
            names(2),
            chains("EVQ", "DI"),
            vec![
                RawPrediction::from_atoms(backbone(5)),
                RawPrediction::from_atoms(backbone(4)),
            ],
        );
        match result {
            Err(EngineError::Shape {
                member,
                expected,
                actual,
            }) => {
                assert_eq!(member, "antibody_model_2");
                assert_eq!((expected, actual), (5, 4));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let mut atoms = backbone(5);
        atoms[3][7].z = f64::INFINITY;
        let result = EnsembleResult::assemble(
            names(1),
            chains("EVQ", "DI"),
            vec![RawPrediction::from_atoms(atoms)],
        );
        assert!(
            matches!(result, Err(EngineError::Model { ref member, .. }) if member == "antibody_model_1")
        );
    }
}
