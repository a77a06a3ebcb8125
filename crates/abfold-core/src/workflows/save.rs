use crate::core::io::estimates::write_error_estimates_to_path;
use crate::core::io::pdb::{PdbConfidenceAnnotator, PdbWriter};
use crate::core::io::traits::{ConfidenceAnnotator, StructureSerializer};
use crate::core::models::prediction::ResidueAtoms;
use crate::engine::collaborators::Refiner;
use crate::engine::ensemble::EnsembleResult;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_OUTPUT_FILE: &str = "abfold_output.pdb";
pub const DEFAULT_OUTPUT_DIR: &str = "abfold_output";
pub const DEFAULT_FINAL_NAME: &str = "final_model.pdb";
pub const ERROR_ESTIMATES_FILE: &str = "error_estimates.csv";

const PROVENANCE_REMARK: &str = "REMARK  ANTIBODY STRUCTURE MODELLED USING ABFOLD";
const MAX_REFINEMENT_ATTEMPTS: usize = 2;

/// The provenance line prepended to every final structure, padded to 80 columns.
pub fn provenance_header() -> String {
    format!("{:<80}", PROVENANCE_REMARK)
}

pub fn unrefined_file_name(rank: usize) -> String {
    format!("rank{}_unrefined.pdb", rank)
}

fn unrefined_rank(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix("rank")?
        .strip_suffix("_unrefined.pdb")?
        .parse()
        .ok()
}

/// Deletes `rank{r}_unrefined.pdb` files with `r >= members` left by an earlier run.
fn remove_stale_unrefined(dir: &Path, members: usize) -> Result<(), EngineError> {
    let entries = fs::read_dir(dir).map_err(|e| EngineError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::io(dir, e))?;
        let name = entry.file_name();
        let Some(rank) = name.to_str().and_then(unrefined_rank) else {
            continue;
        };
        if rank >= members {
            let path = entry.path();
            fs::remove_file(&path).map_err(|e| EngineError::io(&path, e))?;
            debug!(path = %path.display(), "Removed stale unrefined model.");
        }
    }
    Ok(())
}

/// What the orchestrator left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementOutcome {
    /// The annotated final structure.
    pub path: PathBuf,
    /// Ensemble member whose coordinates the final structure holds.
    pub member: usize,
    pub attempts: usize,
    /// `false` if every attempt failed and the final structure is unrefined.
    pub refined: bool,
}

/// Writes an [`EnsembleResult`] to disk, refining the best-ranked member.
///
/// Refinement failure never fails a save: the unrefined structure is kept, a warning
/// is logged and [`RefinementOutcome::refined`] is `false`. The final file always
/// carries the per-residue confidence annotation.
pub struct OutputWriter<S = PdbWriter, A = PdbConfidenceAnnotator> {
    refiner: Box<dyn Refiner>,
    serializer: S,
    annotator: A,
    final_name: String,
}

impl OutputWriter {
    pub fn new(refiner: Box<dyn Refiner>) -> Self {
        Self::with_collaborators(refiner, PdbWriter, PdbConfidenceAnnotator)
    }
}

impl<S: StructureSerializer, A: ConfidenceAnnotator> OutputWriter<S, A> {
    pub fn with_collaborators(refiner: Box<dyn Refiner>, serializer: S, annotator: A) -> Self {
        Self {
            refiner,
            serializer,
            annotator,
            final_name: DEFAULT_FINAL_NAME.to_string(),
        }
    }

    /// File name of the refined model in directory mode.
    pub fn final_name(mut self, name: impl Into<String>) -> Self {
        self.final_name = name.into();
        self
    }

    /// Writes the best-ranked member to `path` and refines it in place, retrying once
    /// with a freshly written copy of the same member if the first attempt fails.
    #[instrument(skip_all, name = "save_single", fields(path = %path.display()))]
    pub fn save(
        &self,
        result: &EnsembleResult,
        path: &Path,
        reporter: &ProgressReporter,
    ) -> Result<RefinementOutcome, EngineError> {
        let member = result.ranking().best().ok_or(EngineError::EmptyEnsemble)?;
        let atoms = result
            .aligned_atoms(member)
            .ok_or(EngineError::EmptyEnsemble)?;
        ensure_parent_dir(path)?;

        reporter.report(Progress::PhaseStart { name: "Refinement" });
        reporter.report(Progress::TaskStart {
            total_steps: MAX_REFINEMENT_ATTEMPTS as u64,
        });

        let mut attempts = 0;
        let mut refined = false;
        while !refined && attempts < MAX_REFINEMENT_ATTEMPTS {
            self.write_structure(result, &atoms, path)?;
            attempts += 1;
            debug!(attempt = attempts, member, "Refining best-ranked structure.");
            refined = self.refiner.refine(path, path);
            reporter.report(Progress::TaskIncrement);
            if !refined {
                warn!(
                    attempt = attempts,
                    max_attempts = MAX_REFINEMENT_ATTEMPTS,
                    "Refinement attempt failed."
                );
            }
        }
        reporter.report(Progress::TaskFinish);

        if !refined {
            // The refiner may have left a partial file behind.
            self.write_structure(result, &atoms, path)?;
            warn!(
                path = %path.display(),
                "Refinement failed {} times; keeping the unrefined structure.",
                attempts
            );
        }

        self.annotate(result, path)?;
        reporter.report(Progress::PhaseFinish);

        info!(refined, attempts, "Saved final structure.");
        Ok(RefinementOutcome {
            path: path.to_path_buf(),
            member,
            attempts,
            refined,
        })
    }

    /// Writes every member as `rank{r}_unrefined.pdb`, the per-residue mean error as
    /// CSV, and a single refinement of rank 0 as the final model.
    #[instrument(skip_all, name = "save_all", fields(dir = %dir.display()))]
    pub fn save_all(
        &self,
        result: &EnsembleResult,
        dir: &Path,
        reporter: &ProgressReporter,
    ) -> Result<RefinementOutcome, EngineError> {
        fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;
        let ranking = result.ranking();

        reporter.report(Progress::PhaseStart {
            name: "Writing Models",
        });
        reporter.report(Progress::TaskStart {
            total_steps: result.member_count() as u64,
        });
        for member in 0..result.member_count() {
            let (Some(rank), Some(atoms)) = (ranking.rank_of(member), result.aligned_atoms(member))
            else {
                return Err(EngineError::EmptyEnsemble);
            };
            let path = dir.join(unrefined_file_name(rank));
            self.write_structure(result, &atoms, &path)?;
            debug!(member, rank, path = %path.display(), "Wrote unrefined model.");
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        remove_stale_unrefined(dir, result.member_count())?;

        let estimates_path = dir.join(ERROR_ESTIMATES_FILE);
        write_error_estimates_to_path(
            result.numbered(),
            &result.per_residue_mean_error(),
            &estimates_path,
        )
        .map_err(|e| EngineError::serialization(&estimates_path, e))?;
        reporter.report(Progress::PhaseFinish);

        reporter.report(Progress::PhaseStart { name: "Refinement" });
        let best = ranking.best().ok_or(EngineError::EmptyEnsemble)?;
        let unrefined = dir.join(unrefined_file_name(0));
        let final_path = dir.join(&self.final_name);
        if final_path.exists() {
            fs::remove_file(&final_path).map_err(|e| EngineError::io(&final_path, e))?;
        }

        let refined = self.refiner.refine(&unrefined, &final_path);
        if !refined {
            fs::copy(&unrefined, &final_path).map_err(|e| EngineError::io(&final_path, e))?;
            warn!(
                path = %final_path.display(),
                "Refinement failed; the final model is the unrefined rank 0 structure."
            );
        }

        self.annotate(result, &final_path)?;
        reporter.report(Progress::PhaseFinish);

        info!(
            refined,
            models = result.member_count(),
            "Saved all ranked models."
        );
        Ok(RefinementOutcome {
            path: final_path,
            member: best,
            attempts: 1,
            refined,
        })
    }

    fn write_structure(
        &self,
        result: &EnsembleResult,
        atoms: &[ResidueAtoms],
        path: &Path,
    ) -> Result<(), EngineError> {
        self.serializer
            .write_to_path(result.numbered(), atoms, path)
            .map_err(|e| EngineError::serialization(path, e))
    }

    fn annotate(&self, result: &EnsembleResult, path: &Path) -> Result<(), EngineError> {
        let header = provenance_header();
        self.annotator
            .annotate(path, result.per_residue_confidence(), &[header.as_str()])
            .map_err(|e| EngineError::annotation(path, e))
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), EngineError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdb::read_residue_b_factors;
    use crate::core::models::prediction::RawPrediction;
    use crate::engine::backends::refinement::DisabledRefiner;
    use crate::engine::ensemble::test_support::{backbone, chains, moved, names, perturbed};
    use nalgebra::{Rotation3, Vector3};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;
    use tracing_test::traced_test;

    /// Succeeds on the given call number (1-based), optionally scribbling over its
    /// output on failure.
    struct ScriptedRefiner {
        calls: Arc<AtomicUsize>,
        succeed_on: Option<usize>,
        corrupt_on_failure: bool,
    }

    impl ScriptedRefiner {
        fn boxed(succeed_on: Option<usize>, corrupt_on_failure: bool) -> (Box<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let refiner = Box::new(Self {
                calls: Arc::clone(&calls),
                succeed_on,
                corrupt_on_failure,
            });
            (refiner, calls)
        }
    }

    impl Refiner for ScriptedRefiner {
        fn refine(&self, input: &Path, output: &Path) -> bool {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.succeed_on == Some(call) {
                if input != output {
                    fs::copy(input, output).unwrap();
                }
                return true;
            }
            if self.corrupt_on_failure {
                fs::write(output, "half-written garbage\n").unwrap();
            }
            false
        }
    }

    fn ensemble(members: usize) -> EnsembleResult {
        let atoms = backbone(6);
        let predictions = (0..members)
            .map(|m| {
                let nudged = perturbed(&atoms, m % 6, Vector3::new(0.4 * m as f64, 0.0, 0.2));
                moved(
                    &nudged.atoms,
                    Rotation3::from_euler_angles(0.2 * m as f64, 0.1, -0.3 * m as f64),
                    Vector3::new(m as f64, -2.0 * m as f64, 0.5),
                )
            })
            .collect();
        EnsembleResult::assemble(names(members), chains("EVQL", "DI"), predictions).unwrap()
    }

    fn assert_annotated(path: &Path, result: &EnsembleResult) {
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().next(), Some(provenance_header().as_str()));
        let b_factors = read_residue_b_factors(&text).unwrap();
        let expected = result.per_residue_confidence();
        assert_eq!(b_factors.len(), expected.len());
        for (written, value) in b_factors.iter().zip(expected) {
            assert!((written - value).abs() < 0.006, "{} vs {}", written, value);
        }
    }

    fn pdb_text(result: &EnsembleResult, member: usize) -> String {
        let mut buffer = Vec::new();
        PdbWriter
            .write_to(result.numbered(), &result.aligned_atoms(member).unwrap(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn provenance_header_is_80_columns() {
        let header = provenance_header();
        assert_eq!(header.len(), 80);
        assert!(header.starts_with("REMARK  ANTIBODY STRUCTURE MODELLED USING ABFOLD"));
    }

    #[test]
    fn save_succeeds_on_first_attempt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_FILE);
        let result = ensemble(3);
        let (refiner, calls) = ScriptedRefiner::boxed(Some(1), false);

        let outcome = OutputWriter::new(refiner)
            .save(&result, &path, &ProgressReporter::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcome,
            RefinementOutcome {
                path: path.clone(),
                member: result.ranking().best().unwrap(),
                attempts: 1,
                refined: true,
            }
        );
        assert_annotated(&path, &result);
    }

    #[test]
    fn save_retries_once_with_the_same_candidate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_FILE);
        let result = ensemble(3);
        let (refiner, calls) = ScriptedRefiner::boxed(Some(2), true);

        let outcome = OutputWriter::new(refiner)
            .save(&result, &path, &ProgressReporter::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(outcome.refined);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.member, result.ranking().best().unwrap());
        assert_annotated(&path, &result);
    }

    #[test]
    #[traced_test]
    fn save_keeps_an_annotated_unrefined_structure_when_refinement_always_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("model.pdb");
        let result = ensemble(4);
        let (refiner, calls) = ScriptedRefiner::boxed(None, true);

        let outcome = OutputWriter::new(refiner)
            .save(&result, &path, &ProgressReporter::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), MAX_REFINEMENT_ATTEMPTS);
        assert!(!outcome.refined);
        assert_eq!(outcome.attempts, MAX_REFINEMENT_ATTEMPTS);
        assert_annotated(&path, &result);

        let best = result.ranking().best().unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let coordinates = |s: &str| -> Vec<String> {
            s.lines()
                .filter(|l| l.starts_with("ATOM"))
                .map(|l| l[30..54].to_string())
                .collect()
        };
        assert_eq!(coordinates(&text), coordinates(&pdb_text(&result, best)));
        assert!(logs_contain("Refinement attempt failed."));
        assert!(logs_contain("keeping the unrefined structure"));
    }

    #[test]
    fn identical_members_are_annotated_with_zero_confidence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.pdb");
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
        assert_eq!(result.ranking().order(), &[0, 1]);

        OutputWriter::new(Box::new(DisabledRefiner))
            .save(&result, &path, &ProgressReporter::new())
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(read_residue_b_factors(&text).unwrap(), vec![0.0; 5]);
    }

    #[test]
    fn save_all_writes_every_ranked_model_and_one_final() {
        let dir = tempdir().unwrap();
        let out = dir.path().join(DEFAULT_OUTPUT_DIR);
        let result = ensemble(4);
        let (refiner, calls) = ScriptedRefiner::boxed(Some(1), false);

        let outcome = OutputWriter::new(refiner)
            .save_all(&result, &out, &ProgressReporter::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcome.refined);
        assert_eq!(outcome.path, out.join(DEFAULT_FINAL_NAME));

        let mut entries: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                "error_estimates.csv",
                "final_model.pdb",
                "rank0_unrefined.pdb",
                "rank1_unrefined.pdb",
                "rank2_unrefined.pdb",
                "rank3_unrefined.pdb",
            ]
        );

        for rank in 0..4 {
            let member = result.ranking().member_at(rank).unwrap();
            let written = fs::read_to_string(out.join(unrefined_file_name(rank))).unwrap();
            assert_eq!(written, pdb_text(&result, member));
        }

        let csv = fs::read_to_string(out.join(ERROR_ESTIMATES_FILE)).unwrap();
        assert_eq!(csv.lines().count(), 1 + 6);
        assert_annotated(&outcome.path, &result);
    }

    #[test]
    #[traced_test]
    fn save_all_falls_back_to_rank0_when_refinement_fails() {
        let dir = tempdir().unwrap();
        let result = ensemble(2);

        let outcome = OutputWriter::new(Box::new(DisabledRefiner))
            .final_name("best.pdb")
            .save_all(&result, dir.path(), &ProgressReporter::new())
            .unwrap();

        assert!(!outcome.refined);
        assert_eq!(outcome.path, dir.path().join("best.pdb"));
        assert_eq!(outcome.member, result.ranking().best().unwrap());
        assert_annotated(&outcome.path, &result);

        let final_text = fs::read_to_string(&outcome.path).unwrap();
        let atoms_only = |s: &str| -> Vec<String> {
            s.lines()
                .filter(|l| l.starts_with("ATOM"))
                .map(|l| l[..60].to_string())
                .collect()
        };
        let rank0 = fs::read_to_string(dir.path().join(unrefined_file_name(0))).unwrap();
        assert_eq!(atoms_only(&final_text), atoms_only(&rank0));
        assert!(logs_contain("Refinement failed"));
        assert!(logs_contain("unrefined rank 0 structure"));
    }

    #[test]
    fn save_all_removes_rank_files_left_by_a_larger_ensemble() {
        let dir = tempdir().unwrap();
        for rank in 0..5 {
            fs::write(dir.path().join(unrefined_file_name(rank)), "old\n").unwrap();
        }
        fs::write(dir.path().join("rank9_notes.txt"), "keep\n").unwrap();
        let result = ensemble(2);

        OutputWriter::new(Box::new(DisabledRefiner))
            .save_all(&result, dir.path(), &ProgressReporter::new())
            .unwrap();

        let mut ranks: Vec<usize> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| unrefined_rank(&e.unwrap().file_name().to_string_lossy()))
            .collect();
        ranks.sort();
        assert_eq!(ranks, vec![0, 1]);
        assert!(dir.path().join("rank9_notes.txt").exists());
        let rank1 = fs::read_to_string(dir.path().join(unrefined_file_name(1))).unwrap();
        assert_eq!(rank1, pdb_text(&result, result.ranking().member_at(1).unwrap()));
    }

    #[test]
    fn unrefined_rank_parses_only_rank_files() {
        assert_eq!(unrefined_rank("rank0_unrefined.pdb"), Some(0));
        assert_eq!(unrefined_rank("rank12_unrefined.pdb"), Some(12));
        assert_eq!(unrefined_rank("final_model.pdb"), None);
        assert_eq!(unrefined_rank("rankX_unrefined.pdb"), None);
    }

    #[test]
    fn save_all_replaces_a_stale_final_model() {
        let dir = tempdir().unwrap();
        let result = ensemble(2);
        fs::write(dir.path().join(DEFAULT_FINAL_NAME), "stale\n").unwrap();
        let (refiner, _) = ScriptedRefiner::boxed(None, false);

        let outcome = OutputWriter::new(refiner)
            .save_all(&result, dir.path(), &ProgressReporter::new())
            .unwrap();

        let text = fs::read_to_string(outcome.path).unwrap();
        assert!(!text.contains("stale"));
    }
}
