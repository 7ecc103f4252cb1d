mod classifier;
mod commands;
mod config;
mod dataset;
mod engine;
mod error;
mod feature_packages;
mod modification;
mod results;
mod scheduler;
mod storage;
#[cfg(test)]
mod test_support;

use anyhow::{anyhow, Context};
use chrono::Local;
use log::{error, info, warn};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::watch;

use crate::classifier::RainfallClassifier;
use crate::commands::{AppCommand, USAGE};
use crate::config::{ClassifierConfig, EngineConfig, SchedulerConfig};
use crate::engine::HttpScenarioEngine;
use crate::scheduler::SchedulerService;
use crate::storage::repository::ModelRunRepository;

fn init_logging() -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder
        .filter_level(log::LevelFilter::Warn)
        .filter_module("agscenario", log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Error)
        .filter_module("sea_orm", log::LevelFilter::Error);

    if let Ok(dir) = std::env::var("LOG_DIR") {
        let log_dir = std::path::PathBuf::from(dir);
        std::fs::create_dir_all(&log_dir)?;
        let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let log_file = std::fs::File::create(log_dir.join(format!("scheduler-{}.log", ts)))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    builder.init();
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine; the environment may already be set
    let env_loaded = dotenv::dotenv().is_ok();
    init_logging()?;
    if !env_loaded {
        info!("No .env file found, reading configuration from the environment");
    }

    let line = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let command: AppCommand = line.parse().unwrap_or(AppCommand::Help);
    if let AppCommand::Unknown(msg) = &command {
        if !msg.is_empty() {
            eprintln!("{}", msg);
        }
        println!("{}", USAGE);
        return Ok(());
    }
    if command == AppCommand::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let db_url = config::database_url();
    let db = storage::establish_connection(&db_url)
        .await
        .with_context(|| format!("could not open database {}", db_url))?;
    let db = Arc::new(db);

    run_command(command, db).await
}

async fn run_command(command: AppCommand, db: Arc<DatabaseConnection>) -> anyhow::Result<()> {
    match command {
        AppCommand::ProcessRuns => process_runs(db).await,
        AppCommand::Rerun(target) => {
            let n = commands::rerun::run(db.as_ref(), &target).await?;
            println!("{} model runs set back to ready", n);
            Ok(())
        }
        AppCommand::CalibrationReplace {
            old_set_id,
            new_set_id,
        } => {
            let n = commands::calibration::replace(db.as_ref(), old_set_id, new_set_id).await?;
            println!(
                "calibration set {} replaced by {}; {} model runs requeued",
                old_set_id, new_set_id, n
            );
            Ok(())
        }
        AppCommand::Classify { model_area_id } => {
            let report = RainfallClassifier::new(ClassifierConfig::from_env())
                .classify(db.as_ref(), model_area_id)
                .await?;
            for r in &report.regions {
                println!(
                    "{:<12} irrigated {:>12.1}  rainfall {:>12.1}  irrigation={} rainfall={}",
                    r.external_id,
                    r.irrigated_land,
                    r.rainfall_land,
                    r.supports_irrigation,
                    r.supports_rainfall
                );
            }
            println!(
                "model area {}: irrigation={} rainfall={}",
                report.model_area_id, report.supports_irrigation, report.supports_rainfall
            );
            Ok(())
        }
        AppCommand::FeaturesApply {
            model_area_id,
            package,
        } => {
            let package = match package {
                Some(name) => Some(
                    feature_packages::lookup(&name)
                        .ok_or_else(|| anyhow!("unknown feature package '{}'", name))?,
                ),
                None => None,
            };
            match feature_packages::apply(db.as_ref(), model_area_id, package).await? {
                Some(p) => println!("model area {} now uses {}", model_area_id, p.name),
                None => return Err(anyhow!("no model area with id {}", model_area_id)),
            }
            Ok(())
        }
        AppCommand::Stats => {
            let stats = ModelRunRepository::get_stats(db.as_ref()).await?;
            println!(
                "total {}  pending {}  ready {}  running {}  complete {}",
                stats.total, stats.pending, stats.ready, stats.running, stats.complete
            );
            Ok(())
        }
        AppCommand::Help | AppCommand::Unknown(_) => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

async fn process_runs(db: Arc<DatabaseConnection>) -> anyhow::Result<()> {
    let engine = HttpScenarioEngine::from_config(&EngineConfig::from_env()?)?;
    let service = SchedulerService::new(db, Arc::new(engine), SchedulerConfig::from_env());
    service.recover().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping after the current run");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Could not listen for ctrl-c: {}", e),
        }
    });

    service.run_forever(shutdown_rx).await?;
    Ok(())
}
