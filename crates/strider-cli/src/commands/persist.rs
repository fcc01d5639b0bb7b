use crate::cli::{InspectArgs, PersistArgs};
use crate::config::PartialEngineConfig;
use crate::error::{CliError, Result};
use std::fmt::Write as _;
use std::sync::Arc;
use strider::core::backend::reference::ReferenceBackend;
use strider::engine::DynamicsEngine;
use strider::engine::persist::PersistedEngine;
use tracing::info;

pub fn run(args: PersistArgs) -> Result<()> {
    let config = PartialEngineConfig::from_file(&args.engine.config)?.merge_with_cli(&args.engine)?;
    let engine = DynamicsEngine::new(Arc::new(ReferenceBackend::default()), config);

    let text = engine.to_persisted()?.to_toml()?;
    std::fs::write(&args.output, text)?;

    info!(engine = %engine.id(), "Persisted engine record to {:?}", &args.output);
    println!("✓ Engine record written to: {}", args.output.display());
    Ok(())
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.record)?;
    let record = PersistedEngine::from_toml(&content).map_err(|e| CliError::FileParsing {
        path: args.record.clone(),
        source: e.into(),
    })?;
    let mut engine = DynamicsEngine::from_persisted(Arc::new(ReferenceBackend::default()), &record)?;

    print!("{}", describe(&engine));
    if args.probe {
        print!("{}", probe(&mut engine)?);
    }
    Ok(())
}

fn describe(engine: &DynamicsEngine<ReferenceBackend>) -> String {
    let config = engine.configuration();
    let options = engine.options();
    let mut text = String::new();

    let _ = writeln!(text, "Topology:      {}", engine.descriptor());
    if !engine.topology().atom_names.is_empty() {
        let _ = writeln!(text, "Atom names:    {}", engine.topology().atom_names.join(", "));
    }
    let _ = writeln!(
        text,
        "System:        {} particle(s), spring constant {} kJ/mol/nm^2",
        config.system().n_particles(),
        config.system().spring_constant
    );
    let _ = writeln!(text, "Step size:     {} ps", config.integrator().step_size);
    let _ = writeln!(text, "Steps/frame:   {}", options.n_steps_per_frame);
    let _ = writeln!(
        text,
        "Frame limit:   {}",
        options
            .n_frames_max
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );
    let _ = writeln!(
        text,
        "Platform:      {}",
        options.platform.as_deref().unwrap_or("(backend default)")
    );
    for (key, value) in config.backend_properties() {
        let _ = writeln!(text, "Property:      {} = {}", key, value);
    }
    text
}

fn probe(engine: &mut DynamicsEngine<ReferenceBackend>) -> Result<String> {
    let snapshot = engine.current_snapshot()?;
    let timestep = engine.snapshot_timestep()?;
    let mut text = String::new();
    let _ = writeln!(
        text,
        "Session:       {}",
        engine.platform_name().unwrap_or_default()
    );
    let _ = writeln!(text, "Frame time:    {:.4} ps", timestep);
    let _ = writeln!(
        text,
        "Energy:        {:.4} kJ/mol potential, {:.4} kJ/mol kinetic",
        snapshot.potential_energy().unwrap_or(f64::NAN),
        snapshot.kinetic_energy().unwrap_or(f64::NAN)
    );
    Ok(text)
}
