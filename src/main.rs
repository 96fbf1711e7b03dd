use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use rust_spins::{read_run_config, run_simulation, Phase, RunConfig, SimulationResults};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Override the seed of the run file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the temperature of the run file
    #[arg(short, long)]
    temperature: Option<f64>,
}

fn main() -> ExitCode {
    // read the config file, with command line argument, use clap mod to input the file name
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> rust_spins::Result<()> {
    let mut config: RunConfig = read_run_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(temperature) = args.temperature {
        config.simulation.temperature = temperature;
    }

    let table = config.neighbor_table()?;
    let params = &config.simulation;

    let total_sweeps = params.equilibration_sweeps + params.sweeps;
    let bar = ProgressBar::new(total_sweeps as u64);
    bar.set_style(
        ProgressStyle::with_template(" {bar:40.cyan/blue} {pos}/{len} sweeps [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let results = run_simulation(&table, params, |phase| {
        bar.inc(1);
        match phase {
            Phase::Equilibrating { .. } => bar.set_message("equilibrating"),
            Phase::Producing { .. } => bar.set_message("producing"),
            Phase::Finished => bar.finish_with_message("done"),
        }
    })?;

    print_results(&config, &results);
    Ok(())
}

fn print_results(config: &RunConfig, results: &SimulationResults) {
    let params = &config.simulation;
    let thermo = &results.thermodynamics;

    println!("Metropolis Simulation Results");
    println!("-----------------------------");
    println!("Mode: {}", results.mode);
    println!("Number of sites: {}", results.number_sites);
    println!("Temperature: {:.4}", params.temperature);
    println!("Sweeps: {} (+{} equilibration)", params.sweeps, params.equilibration_sweeps);
    println!("Samples: {}", results.estimators.samples());
    println!("Acceptance rate: {:.4}", results.acceptance_rate);
    println!("Energy per site: {:.6} ± {:.6}", thermo.energy, thermo.energy_error);
    println!("Autocorrelation time: {:.2} samples", thermo.autocorrelation_time);
    println!("Specific heat per site: {:.6}", thermo.specific_heat);
    println!("Magnetization per site: {:.6}", thermo.magnetization);
    println!("Susceptibility per site: {:.6}", thermo.susceptibility);
    println!("Staggered magnetization per site: {:.6}", thermo.staggered_magnetization);
    println!("Staggered susceptibility per site: {:.6}", thermo.staggered_susceptibility);
    println!("Binder cumulant: {:.6}", thermo.binder_cumulant);

    if let Some(path) = &params.trace_path {
        println!("Trace written to {path}");
    }
    if let Some(path) = &params.snapshot_path {
        println!("Snapshots written to {path}");
    }
}
