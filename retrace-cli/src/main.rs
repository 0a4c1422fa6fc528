//! Retrace CLI Binary
//!
//! ## Usage
//!
//! ```bash
//! # Capture a prerecorded fixture into ./recorded-events.json
//! retrace record session.json
//!
//! # Replay it into screenshots/baseline, then into screenshots/current
//! RETRACE_ENDPOINT=http://localhost:4444 retrace replay --baseline
//! RETRACE_ENDPOINT=http://localhost:4444 retrace replay
//!
//! # Compare the two runs
//! retrace compare screenshots
//! ```

use clap::Parser;
use retrace_cli::{commands, fixture, init_tracing, Cli, Command, CaptureFixture};
use retrace_core::config::RetraceConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Command::Replay(args) => {
            let report = commands::replay(&args).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for step in &report.steps {
                    match &step.error {
                        Some(error) => println!(
                            "step {:>3}  {:<9} {:?}  {}",
                            step.step, step.kind, step.status, error
                        ),
                        None => {
                            println!("step {:>3}  {:<9} {:?}", step.step, step.kind, step.status)
                        }
                    }
                }
                println!(
                    "{} of {} record(s) processed, outcome: {:?}",
                    report.steps.len(),
                    report.total_records,
                    report.outcome
                );
            }
            if !report.success() {
                std::process::exit(1);
            }
        }
        Command::Record(args) => {
            let config = match &args.config {
                Some(path) => RetraceConfig::load(path)?,
                None => RetraceConfig::default(),
            };
            let fixture = CaptureFixture::load(&args.fixture)?;
            let (artifact, path) = fixture::record(&fixture, &args.out, &config.capture).await?;
            println!("{} record(s) written to {}", artifact.len(), path.display());
        }
        Command::Inspect(args) => {
            let summary = commands::inspect(&args.file)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary);
            }
        }
        Command::Compare(args) => {
            let report = commands::compare(&args)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.steps.is_empty() {
                println!("No screenshots under {}", args.root.display());
            } else {
                for step in &report.steps {
                    match (&step.outcome, step.missing) {
                        (Some(outcome), _) => println!(
                            "step {:>3}  {:.2}% mismatch",
                            step.step, outcome.mismatch_percentage
                        ),
                        (None, Some(missing)) => {
                            println!("step {:>3}  missing in {}", step.step, missing)
                        }
                        (None, None) => println!("step {:>3}  not compared", step.step),
                    }
                }
            }
            if !report.mismatched(args.threshold).is_empty() || !report.incomplete().is_empty() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
