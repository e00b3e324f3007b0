use anyhow::{Context, Result};
use leso_transfers::{run_with, CensusClient, Config, PipelineError};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leso_transfers=info".into()),
        )
        .init();

    println!("🚚 LESO transfers v{}", leso_transfers::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env().context("Failed to read configuration")?;
    let census = CensusClient::new(config.census.clone())
        .context("Failed to build census client")?;

    let output = run_with(&config, &census).map_err(|err: PipelineError| {
        eprintln!("\n❌ Run aborted during {} stage", err.stage());
        anyhow::Error::new(err)
    })?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Run {} complete", output.run.run_id);
    println!("   {}", output.charts.total_value.display());
    println!("   {}", output.charts.value_per_capita.display());
    println!("   {}", output.charts.record_count.display());
    println!("   {}", output.charts.cumulative_value.display());
    if !output.processed.discrepancies.is_empty() {
        println!(
            "⚠️  {} regions failed reconciliation (see log)",
            output.processed.discrepancies.len()
        );
    }

    Ok(())
}
