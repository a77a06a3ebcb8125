use crate::cli::PredictArgs;
use crate::config::{PartialRunConfig, RunConfig};
use crate::data::DataManager;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use abfold::{
    core::{
        io::fasta::read_chain_sequences_from_path,
        models::sequence::{ChainKind, SequenceMap},
    },
    engine::{
        backends::{
            model::CommandModelLoader,
            refinement::{CommandRefiner, DisabledRefiner},
        },
        collaborators::Refiner,
        ensemble::EnsembleResult,
        progress::ProgressReporter,
    },
    workflows::{
        predict::Predictor,
        save::{DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FILE, OutputWriter, RefinementOutcome},
    },
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub fn run(args: PredictArgs) -> Result<()> {
    info!("Initializing data manager...");
    let data_manager = DataManager::new()?;

    let partial_config = match &args.config {
        Some(path) => PartialRunConfig::from_file(path)?,
        None => PartialRunConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let final_config = partial_config.merge_with_cli(&args, &data_manager)?;
    debug!("Final run configuration: {:?}", &final_config);

    let sequences = read_sequences(&args)?;
    let output_path = resolve_output_path(&args);

    let loader = CommandModelLoader::new(&final_config.model.program, final_config.model.args.clone());
    info!(
        "Loading {} ensemble member(s)...",
        final_config.predictor.members.len()
    );
    let predictor = Predictor::with_default_collaborators(final_config.predictor.clone(), &loader)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Predicting structure with {} model(s): {}",
        predictor.member_names().len(),
        predictor.member_names().join(", ")
    );
    let result = predictor.predict(&sequences, &reporter)?;
    info!(
        "Ensemble finished: {} member(s), {} residue(s).",
        result.member_count(),
        result.numbered().total_residues()
    );

    let writer = OutputWriter::new(build_refiner(&final_config)).final_name(&final_config.final_name);
    let outcome = if args.to_directory {
        writer.save_all(&result, &output_path, &reporter)?
    } else {
        writer.save(&result, &output_path, &reporter)?
    };

    print_summary(&result, &outcome);
    Ok(())
}

fn read_sequences(args: &PredictArgs) -> Result<SequenceMap> {
    match (&args.heavy, &args.light, &args.fasta) {
        (Some(heavy), Some(light), None) => Ok(SequenceMap::from([
            (ChainKind::Heavy.id(), heavy.clone()),
            (ChainKind::Light.id(), light.clone()),
        ])),
        (None, None, Some(path)) => {
            info!("Reading sequences from {:?}", path);
            read_chain_sequences_from_path(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })
        }
        _ => Err(CliError::Argument(
            "Provide either both --heavy and --light, or --fasta.".to_string(),
        )),
    }
}

fn resolve_output_path(args: &PredictArgs) -> PathBuf {
    args.output.clone().unwrap_or_else(|| {
        if args.to_directory {
            PathBuf::from(DEFAULT_OUTPUT_DIR)
        } else {
            PathBuf::from(DEFAULT_OUTPUT_FILE)
        }
    })
}

fn build_refiner(config: &RunConfig) -> Box<dyn Refiner> {
    match &config.refinement {
        Some(settings) => Box::new(CommandRefiner::new(&settings.program, settings.args.clone())),
        None => {
            info!("Refinement disabled.");
            Box::new(DisabledRefiner)
        }
    }
}

fn print_summary(result: &EnsembleResult, outcome: &RefinementOutcome) {
    let confidence = result.per_residue_confidence();
    let mean_confidence = if confidence.is_empty() {
        0.0
    } else {
        confidence.iter().sum::<f64>() / confidence.len() as f64
    };
    let best_name = result.member_name(outcome.member).unwrap_or("unknown");

    let member_errors = result.error_estimate().per_member_mean();

    println!("Ranking (best first):");
    for (rank, &member) in result.ranking().order().iter().enumerate() {
        println!(
            "  {}. {} (mean squared deviation: {:.3})",
            rank,
            result.member_name(member).unwrap_or("unknown"),
            member_errors[member]
        );
    }

    if outcome.refined {
        println!(
            "✓ Refined model from {} written to: {}",
            best_name,
            outcome.path.display()
        );
    } else {
        warn!("Refinement did not succeed; the saved model is unrefined.");
        println!(
            "Unrefined model from {} written to: {} (refinement failed or disabled)",
            best_name,
            outcome.path.display()
        );
    }
    println!(
        "  Mean per-residue confidence value (B-factor column): {:.3}",
        mean_confidence
    );
}
