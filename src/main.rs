//! Churn service entry point

use clap::Parser;
use churn_service::cli::{
    cmd_evaluate, cmd_importance, cmd_load, cmd_predict, cmd_prepare, cmd_retrain, cmd_save,
    cmd_serve, cmd_train, Cli, Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_service=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.service_config();

    match cli.command {
        Commands::Prepare { output } => cmd_prepare(&config, &output)?,
        Commands::Train { params, prepared } => cmd_train(&config, &params, prepared.as_deref())?,
        Commands::Evaluate { prepared } => cmd_evaluate(&config, prepared.as_deref())?,
        Commands::Save { output } => cmd_save(&config, &output)?,
        Commands::Load => cmd_load(&config)?,
        Commands::Predict { features, record } => {
            cmd_predict(&config, features.as_deref(), record.as_deref())?
        }
        Commands::Retrain { params } => cmd_retrain(&config, &params)?,
        Commands::Importance { k } => cmd_importance(&config, k)?,
        Commands::Serve { host, port } => cmd_serve(config, host, port).await?,
    }

    Ok(())
}
