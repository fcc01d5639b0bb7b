use crate::cli::RunArgs;
use crate::config::PartialEngineConfig;
use crate::config::defaults::DefaultsConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::fmt::Write as _;
use std::sync::Arc;
use strider::core::backend::PlatformChoice;
use strider::core::backend::reference::ReferenceBackend;
use strider::engine::DynamicsEngine;
use strider::engine::progress::ProgressReporter;
use strider::workflows::trajectory::{self, StopReason, TrajectoryResult};
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    let partial_config = PartialEngineConfig::from_file(&args.engine.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args.engine)?;

    let mut engine = DynamicsEngine::new(Arc::new(ReferenceBackend::default()), config);
    engine.initialize(PlatformChoice::Default)?;
    let platform = engine.platform_name().unwrap_or_default();
    println!("Simulation session ready on platform '{}'.", platform);

    if args.minimize {
        info!("Minimizing energy before generating frames.");
        engine.minimize()?;
        let minimized = engine.current_snapshot()?;
        println!(
            "Minimized potential energy: {:.4} kJ/mol",
            minimized.potential_energy().unwrap_or(f64::NAN)
        );
    }

    let n_frames = args.frames.unwrap_or(DefaultsConfig::default().n_frames);
    let timestep = engine.snapshot_timestep()?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Generating {} frame(s)...", n_frames);
    let result = trajectory::run(&mut engine, None, n_frames, &reporter)?;
    print!("{}", energy_table(&result, timestep));

    match result.stop_reason {
        StopReason::Completed => Ok(()),
        StopReason::FrameLimit => {
            warn!("Run was truncated by the engine's frame limit.");
            println!(
                "Warning: stopped after {} frame(s) because of the frame limit.",
                result.generated()
            );
            Ok(())
        }
        StopReason::Diverged { frame } => Err(CliError::Diverged(frame)),
    }
}

/// One line per frame: index, simulated time and the recorded energies.
fn energy_table(result: &TrajectoryResult, timestep: f64) -> String {
    let mut table = format!(
        "{:>6} {:>12} {:>16} {:>16} {:>16}\n",
        "frame", "time (ps)", "potential", "kinetic", "total"
    );
    let energy = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |e| format!("{:.4}", e));
    for (index, frame) in result.frames.iter().enumerate() {
        let _ = writeln!(
            table,
            "{:>6} {:>12.4} {:>16} {:>16} {:>16}",
            index,
            index as f64 * timestep,
            energy(frame.potential_energy()),
            energy(frame.kinetic_energy()),
            energy(frame.total_energy()),
        );
    }
    table
}
