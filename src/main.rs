//! bn-controller CLI - Run a controller search from a JSON experiment file.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::process;

use bn_controller::{
    compute::{
        BooleanNetwork, NetworkGenerator, load_network, save_network,
        search::{AttractorDistance, ModelArchive, SearchEngine},
    },
    schema::{ArchiveConfig, ExperimentConfig, TargetStructure},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <experiment.json>", args[0]);
        eprintln!();
        eprintln!("Search a Boolean network whose attractor structure matches a target.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  experiment.json  Path to experiment configuration file");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        process::exit(1);
    });
    let config: ExperimentConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        process::exit(1);
    });
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        process::exit(1);
    }

    let network = initial_network(&config);

    println!("Boolean Network Controller Search");
    println!("=================================");
    println!(
        "Network: N = {}, K = {} ({} inputs, {} outputs)",
        network.len(),
        network.k(),
        network.inputs().len(),
        network.outputs().len()
    );
    println!("Target attractors: {}", config.target.len());
    println!("Max iterations: {}", config.search.max_iters);
    println!();

    let evaluator = AttractorDistance::from_config(&config).unwrap_or_else(|e| {
        eprintln!("Error creating evaluator: {}", e);
        process::exit(1);
    });

    let archive_config = config.archive.clone().unwrap_or_default();
    let mut archive = ModelArchive::new(&archive_config).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        process::exit(1);
    });

    let mut engine = SearchEngine::new(config.search.clone(), network, evaluator)
        .unwrap_or_else(|e| {
            eprintln!("Invalid search configuration: {}", e);
            process::exit(1);
        });

    let report_every = (config.search.max_iters / 10).max(1);
    let mut archive_error = None;
    let result = engine.run_with_callback(|progress, bn| {
        if archive_error.is_none()
            && let Err(e) = archive.record(progress.iteration, progress.distance, bn)
        {
            archive_error = Some(e);
        }
        if (progress.iteration + 1) % report_every == 0 {
            println!(
                "  Iteration {}: k = {}, distance = {}",
                progress.iteration + 1,
                progress.neighborhood,
                progress.distance
            );
        }
    });

    let outcome = result.unwrap_or_else(|e| {
        eprintln!("Search failed: {}", e);
        process::exit(1);
    });
    if let Some(e) = archive_error {
        eprintln!("Warning: failed to save models: {}", e);
    }

    let final_path = archive_config.output_dir.join("bn_final.json");
    if let Err(e) = save_network(&outcome.network, &final_path) {
        eprintln!("Error saving final network: {}", e);
        process::exit(1);
    }

    println!();
    println!("Stopped: {:?}", outcome.stats.stop_reason);
    println!("Final distance: {}", outcome.distance);
    println!(
        "Iterations: {} ({} improved, {} stalled, {} rejected)",
        outcome.stats.iterations,
        outcome.stats.improved,
        outcome.stats.stalled,
        outcome.stats.rejected
    );
    println!("Largest neighborhood: {}", outcome.stats.max_neighborhood);
    println!("Time: {:.2}s", outcome.stats.elapsed_seconds);
    println!("Final network: {}", final_path.display());
    println!("Archived models: {}", archive.output_dir().display());
}

fn initial_network(config: &ExperimentConfig) -> BooleanNetwork {
    if let Some(path) = &config.model_path {
        return load_network(path).unwrap_or_else(|e| {
            eprintln!("Error loading network {}: {}", path.display(), e);
            process::exit(1);
        });
    }

    let mut generator = NetworkGenerator::new(config.generator.clone()).unwrap_or_else(|e| {
        eprintln!("Invalid generator configuration: {}", e);
        process::exit(1);
    });
    generator.generate().unwrap_or_else(|e| {
        eprintln!("Error generating network: {}", e);
        process::exit(1);
    })
}

fn print_example_config() {
    let config = ExperimentConfig {
        target: TargetStructure {
            attractors: vec!["rest".into(), "seek".into()],
            transitions: vec![vec![0.9, 0.1], vec![0.2, 0.8]],
        },
        archive: Some(ArchiveConfig::default()),
        ..Default::default()
    };

    println!("Example configuration (experiment.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
