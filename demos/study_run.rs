//! Study Run Example
//!
//! Provisions a study under a scratch directory, runs it twice and prints
//! what ended up on disk.
//!
//! Run with: RUST_LOG=aipim=debug cargo run --example study_run

use std::fs;

use aipim::study::{provision, RunArgs, RunContext};
use anyhow::Context;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct Optimizer {
    kind: String,
    learning_rate: f64,
}

#[derive(Serialize)]
struct TrainSummary {
    epochs: u32,
    final_loss: f64,
    model: String,
    optimizer: Optimizer,
}

fn train(ctx: RunContext) -> aipim::Result<TrainSummary> {
    let epochs = 5;
    let mut loss = 2.5;
    for epoch in 0..epochs {
        loss = 2.5 / (f64::from(epoch) + 1.0) + 0.1;
        ctx.log.info(format_args!("epoch {epoch}: loss {loss:.4}"));
    }
    fs::write(ctx.results_dir.join("loss.txt"), format!("{loss}\n"))?;

    Ok(TrainSummary {
        epochs,
        final_loss: loss,
        model: "mlp".to_string(),
        optimizer: Optimizer {
            kind: "adam".to_string(),
            learning_rate: 0.001,
        },
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== aipim Study Run ===\n");

    let base = std::env::temp_dir().join("aipim-demo");
    fs::create_dir_all(&base)?;
    let provisioner = provision(&base).context("provisioning base directory")?;
    let study = provisioner.wrap("train", train);

    for round in 1..=2 {
        let outcome = study.call_recorded(RunArgs::new())?;
        println!("Run {round}: {}", outcome.record.run_dir().display());
        println!("   Final loss: {:.4}", outcome.output.final_loss);
        println!(
            "   metadata.json:\n{}",
            fs::read_to_string(outcome.record.metadata_path())?
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    println!("Runs on disk: {:?}", provisioner.list_runs("train")?);
    println!(
        "Study log:\n{}",
        fs::read_to_string(provisioner.study_dir("train").join("aipim.log"))?
    );

    Ok(())
}
