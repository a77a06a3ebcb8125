use crate::core::models::sequence::{ChainKind, ChainSequences, InputError, SequenceMap};
use crate::engine::backends::encoding::OneHotEncoder;
use crate::engine::backends::numbering::SequentialNumbering;
use crate::engine::collaborators::{Encoder, ModelLoader, Numbering, StructureModel};
use crate::engine::config::PredictorConfig;
use crate::engine::ensemble::EnsembleResult;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

/// Runs every configured ensemble member on a heavy/light pair.
///
/// All members are loaded up front; a predictor is read-only afterwards and can serve
/// any number of [`Predictor::predict`] calls.
pub struct Predictor {
    config: PredictorConfig,
    models: Vec<Box<dyn StructureModel>>,
    numbering: Box<dyn Numbering>,
    encoder: Box<dyn Encoder>,
}

impl Predictor {
    /// Loads every member of `config` through `loader`.
    ///
    /// # Errors
    ///
    /// Returns the loader's [`EngineError::Resource`] for the first member whose
    /// weights cannot be used. No member is skipped.
    #[instrument(skip_all, name = "predictor_setup")]
    pub fn new(
        config: PredictorConfig,
        loader: &dyn ModelLoader,
        numbering: Box<dyn Numbering>,
        encoder: Box<dyn Encoder>,
    ) -> Result<Self, EngineError> {
        let models = config
            .members
            .iter()
            .map(|member| loader.load(member))
            .collect::<Result<Vec<_>, _>>()?;
        info!(members = models.len(), parallel = config.parallel, "Ensemble loaded.");
        Ok(Self {
            config,
            models,
            numbering,
            encoder,
        })
    }

    /// A predictor with sequential numbering and one-hot encoding.
    pub fn with_default_collaborators(
        config: PredictorConfig,
        loader: &dyn ModelLoader,
    ) -> Result<Self, EngineError> {
        Self::new(
            config,
            loader,
            Box::new(SequentialNumbering),
            Box::new(OneHotEncoder),
        )
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// Predicts the structure of the antibody with chains `H` and `L` in `sequences`.
    ///
    /// # Errors
    ///
    /// Input errors (missing or empty chains, unknown residues) are returned before any
    /// model runs. A failing member aborts the call with [`EngineError::Model`].
    #[instrument(skip_all, name = "predict_workflow")]
    pub fn predict(
        &self,
        sequences: &SequenceMap,
        reporter: &ProgressReporter,
    ) -> Result<EnsembleResult, EngineError> {
        let chains = ChainSequences::from_map(sequences)?;

        let (numbered, encoding, sequence) =
            reporter.phase("Numbering", || -> Result<_, EngineError> {
                let numbered = self.numbering.number(&chains)?;
                for chain in ChainKind::ALL {
                    let expected = chains.get(chain).chars().count();
                    let actual = numbered.get(chain).len();
                    if expected != actual {
                        return Err(InputError::NumberingMismatch {
                            chain,
                            expected,
                            actual,
                        }
                        .into());
                    }
                }
                let encoding = self.encoder.encode(&numbered.flat_sequences())?;
                let sequence = numbered.concatenated_sequence();
                Ok((numbered, encoding, sequence))
            })?;
        debug!(
            residues = numbered.total_residues(),
            encoding_width = encoding.ncols(),
            "Prepared model input."
        );

        reporter.report(Progress::PhaseStart { name: "Inference" });
        reporter.report(Progress::TaskStart {
            total_steps: self.models.len() as u64,
        });
        let run = |model: &Box<dyn StructureModel>| {
            debug!(member = model.name(), "Running ensemble member.");
            let prediction = model.predict(&encoding, &sequence);
            reporter.report(Progress::TaskIncrement);
            prediction
        };
        let predictions = if self.config.parallel {
            self.models.par_iter().map(run).collect::<Result<Vec<_>, _>>()?
        } else {
            self.models.iter().map(run).collect::<Result<Vec<_>, _>>()?
        };
        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);

        let names: Vec<String> = self.models.iter().map(|m| m.name().to_string()).collect();
        let result = reporter.phase("Superposition", || {
            EnsembleResult::assemble(names, numbered, predictions)
        })?;
        info!(
            best = result
                .ranking()
                .best()
                .and_then(|m| result.member_name(m))
                .unwrap_or_default(),
            "Ensemble prediction complete."
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::prediction::{RawPrediction, ResidueAtoms};
    use crate::core::models::sequence::NumberedChains;
    use crate::engine::config::{MemberSpec, PredictorConfigBuilder};
    use crate::engine::ensemble::test_support::{backbone, perturbed};
    use nalgebra::{DMatrix, Vector3};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedModel {
        name: String,
        prediction: RawPrediction,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl StructureModel for FixedModel {
        fn name(&self) -> &str {
            &self.name
        }

        fn predict(
            &self,
            encoding: &DMatrix<f64>,
            sequence: &str,
        ) -> Result<RawPrediction, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(encoding.nrows(), sequence.len());
            if self.fail {
                return Err(EngineError::Model {
                    member: self.name.clone(),
                    message: "boom".to_string(),
                });
            }
            Ok(self.prediction.clone())
        }
    }

    /// Every member nudges residue 1 of a shared backbone by `embed_dim / 100`.
    struct FixedLoader {
        atoms: Vec<ResidueAtoms>,
        calls: Arc<AtomicUsize>,
        failing_member: Option<String>,
        missing_member: Option<String>,
    }

    impl FixedLoader {
        fn new(residues: usize) -> Self {
            Self {
                atoms: backbone(residues),
                calls: Arc::new(AtomicUsize::new(0)),
                failing_member: None,
                missing_member: None,
            }
        }
    }

    impl ModelLoader for FixedLoader {
        fn load(&self, member: &MemberSpec) -> Result<Box<dyn StructureModel>, EngineError> {
            if self.missing_member.as_deref() == Some(member.name.as_str()) {
                return Err(EngineError::Resource {
                    member: member.name.clone(),
                    message: "weights not found".to_string(),
                });
            }
            let shift = member.embed_dim as f64 * 0.01;
            Ok(Box::new(FixedModel {
                name: member.name.clone(),
                prediction: perturbed(&self.atoms, 1, Vector3::new(shift, 0.0, 0.0)),
                calls: Arc::clone(&self.calls),
                fail: self.failing_member.as_deref() == Some(member.name.as_str()),
            }))
        }
    }

    fn config(dims: &[usize], parallel: bool) -> PredictorConfig {
        let members = dims
            .iter()
            .enumerate()
            .map(|(i, &dim)| MemberSpec::new(format!("m{}", i + 1), format!("w{}", i + 1), dim))
            .collect();
        PredictorConfigBuilder::new()
            .members(members)
            .parallel(parallel)
            .build()
            .unwrap()
    }

    fn sequences(heavy: &str, light: &str) -> SequenceMap {
        let mut map = SequenceMap::new();
        map.insert('H', heavy.to_string());
        map.insert('L', light.to_string());
        map
    }

    #[test]
    fn predicts_one_prediction_per_member() {
        let loader = FixedLoader::new(7);
        let predictor =
            Predictor::with_default_collaborators(config(&[0, 100, 300], false), &loader).unwrap();

        let result = predictor
            .predict(&sequences("EVQL", "DIQ"), &ProgressReporter::new())
            .unwrap();

        assert_eq!(loader.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.member_count(), 3);
        assert_eq!(result.member_names(), &["m1", "m2", "m3"]);
        assert_eq!(result.per_residue_confidence().len(), 7);
        assert_eq!(result.ranking().member_at(2), Some(2));
    }

    #[test]
    fn parallel_and_sequential_inference_agree() {
        let loader = FixedLoader::new(7);
        let dims = [250, 0, 100, 40];
        let sequential = Predictor::with_default_collaborators(config(&dims, false), &loader)
            .unwrap()
            .predict(&sequences("EVQL", "DIQ"), &ProgressReporter::new())
            .unwrap();
        let parallel = Predictor::with_default_collaborators(config(&dims, true), &loader)
            .unwrap()
            .predict(&sequences("EVQL", "DIQ"), &ProgressReporter::new())
            .unwrap();

        assert_eq!(sequential.member_names(), parallel.member_names());
        assert_eq!(sequential.ranking(), parallel.ranking());
        assert_eq!(
            sequential.per_residue_confidence(),
            parallel.per_residue_confidence()
        );
    }

    #[test]
    fn missing_chain_fails_before_any_model_runs() {
        let loader = FixedLoader::new(7);
        let predictor =
            Predictor::with_default_collaborators(config(&[0, 1], false), &loader).unwrap();
        let mut map = SequenceMap::new();
        map.insert('H', "EVQL".to_string());

        let err = predictor.predict(&map, &ProgressReporter::new()).err().unwrap();
        assert!(matches!(
            err,
            EngineError::Input(InputError::MissingChain {
                chain: ChainKind::Light
            })
        ));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_residue_is_an_input_error() {
        let loader = FixedLoader::new(7);
        let predictor =
            Predictor::with_default_collaborators(config(&[0], false), &loader).unwrap();
        let err = predictor
            .predict(&sequences("EVZL", "DIQ"), &ProgressReporter::new())
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Input(InputError::InvalidResidue { .. })));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn loading_stops_at_the_first_missing_member() {
        let mut loader = FixedLoader::new(7);
        loader.missing_member = Some("m2".to_string());
        let err = Predictor::with_default_collaborators(config(&[0, 1, 2], false), &loader)
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Resource { ref member, .. } if member == "m2"));
    }

    #[test]
    fn model_failure_names_the_member() {
        let mut loader = FixedLoader::new(7);
        loader.failing_member = Some("m2".to_string());
        let predictor =
            Predictor::with_default_collaborators(config(&[0, 1], true), &loader).unwrap();
        let err = predictor
            .predict(&sequences("EVQL", "DIQ"), &ProgressReporter::new())
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Model { ref member, .. } if member == "m2"));
    }

    struct DroppingNumbering;

    impl Numbering for DroppingNumbering {
        fn number(&self, sequences: &ChainSequences) -> Result<NumberedChains, InputError> {
            let shortened = ChainSequences {
                heavy: sequences.heavy[1..].to_string(),
                light: sequences.light.clone(),
            };
            SequentialNumbering.number(&shortened)
        }
    }

    #[test]
    fn numbering_that_changes_residue_count_is_rejected() {
        let loader = FixedLoader::new(6);
        let predictor = Predictor::new(
            config(&[0], false),
            &loader,
            Box::new(DroppingNumbering),
            Box::new(OneHotEncoder),
        )
        .unwrap();
        let err = predictor
            .predict(&sequences("EVQL", "DIQ"), &ProgressReporter::new())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            EngineError::Input(InputError::NumberingMismatch {
                chain: ChainKind::Heavy,
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn reports_phases_and_one_increment_per_member() {
        let loader = FixedLoader::new(7);
        let predictor =
            Predictor::with_default_collaborators(config(&[0, 1, 2], true), &loader).unwrap();
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));

        predictor
            .predict(&sequences("EVQL", "DIQ"), &reporter)
            .unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        let increments = events
            .iter()
            .filter(|e| matches!(e, Progress::TaskIncrement))
            .count();
        let phases: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Progress::PhaseStart { name } => Some(*name),
                _ => None,
            })
            .collect();
        let finishes = events
            .iter()
            .filter(|e| matches!(e, Progress::PhaseFinish))
            .count();
        assert_eq!(increments, 3);
        assert_eq!(phases, vec!["Numbering", "Inference", "Superposition"]);
        assert_eq!(finishes, phases.len());
    }

    #[test]
    fn failed_numbering_still_closes_its_phase() {
        let loader = FixedLoader::new(6);
        let predictor = Predictor::new(
            config(&[0], false),
            &loader,
            Box::new(DroppingNumbering),
            Box::new(OneHotEncoder),
        )
        .unwrap();
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));

        assert!(predictor.predict(&sequences("EVQL", "DIQ"), &reporter).is_err());
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert!(matches!(
            events.as_slice(),
            [
                Progress::PhaseStart { name: "Numbering" },
                Progress::PhaseFinish
            ]
        ));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }
}
