use crate::cli::args::{Cli, Commands};
use crate::cli::logging::init_logging;
use crate::error::Result;
use crate::fetchers::PoiFetcher;
use crate::processors::StationPipeline;
use crate::readers::{ObservationReader, ParameterReader, StationReader};
use crate::settings::Settings;
use crate::store::PostgresStore;
use crate::utils::filename::default_log_file_path;
use crate::utils::progress::ProgressReporter;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            config,
            max_workers,
            quiet,
            json,
        } => {
            let settings = Settings::load(&config)?;
            let log_path = cli
                .log_file
                .clone()
                .unwrap_or_else(|| default_log_file_path(&settings.paths.log_dir));
            init_logging(Some(&log_path), cli.verbose)?;

            let started = Instant::now();
            info!(config = %config.display(), "starting import run");

            let stations = StationReader::new().read_stations(&settings.paths.stations_file)?;
            let parameters = ParameterReader::read_parameters(&settings.paths.parameter_file)?;
            let max_workers = max_workers.unwrap_or(settings.run.max_workers).max(1);
            info!(
                stations = stations.len(),
                parameters = parameters.len(),
                max_workers,
                "loaded station registry and parameter map"
            );

            let fetcher = PoiFetcher::new(
                &settings.paths.base_url,
                &settings.paths.save_dir,
                &settings.fetch,
            )?;
            let store = PostgresStore::connect(&settings.database, max_workers as u32).await?;

            let pipeline = StationPipeline::new(
                Arc::new(store),
                fetcher,
                parameters,
                settings.retention.days,
            )
            .with_max_workers(max_workers);

            let progress = ProgressReporter::new(stations.len() as u64, quiet || cli.verbose);
            let summary = pipeline
                .run(stations, Utc::now().naive_utc(), &progress)
                .await?;
            progress.finish_with_message("done");

            info!(
                completed = summary.completed(),
                failed = summary.failed(),
                duration = ?started.elapsed(),
                "import run finished"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary.generate_summary());
                println!("Log written to {}", log_path.display());
            }
        }

        Commands::Validate { config } => {
            init_logging(cli.log_file.as_deref(), cli.verbose)?;

            let settings = Settings::load(&config)?;
            println!("Configuration: {} ✓", config.display());

            let stations = StationReader::new().read_stations(&settings.paths.stations_file)?;
            println!("Station registry: {} stations ✓", stations.len());

            let parameters = ParameterReader::read_parameters(&settings.paths.parameter_file)?;
            println!("Parameter map: {} fields ✓", parameters.len());
            for mapping in parameters.mappings() {
                println!(
                    "  {} ← {}{}",
                    mapping.target_field,
                    mapping.source_column,
                    mapping
                        .unit
                        .as_deref()
                        .map(|u| format!(" [{}]", u))
                        .unwrap_or_default()
                );
            }

            println!(
                "Target: table {} on {}:{}/{}, retention {} days",
                settings.database.table_name,
                settings.database.host,
                settings.database.port,
                settings.database.name,
                settings.retention.days
            );
        }

        Commands::Inspect {
            file,
            parameters,
            sample,
        } => {
            init_logging(cli.log_file.as_deref(), cli.verbose)?;

            let parameters = ParameterReader::read_parameters(&parameters)?;
            let parsed = ObservationReader::new().read_file(&file, &parameters)?;

            println!("File: {}", file.display());
            println!(
                "Observations: {} (skipped rows: {})",
                parsed.observations.len(),
                parsed.skipped_rows
            );
            if let (Some(first), Some(last)) =
                (parsed.observations.first(), parsed.observations.last())
            {
                println!("Range: {} .. {}", first.timestamp, last.timestamp);
            }
            if !parsed.missing_columns.is_empty() {
                println!("Columns not in file: {}", parsed.missing_columns.join(", "));
            }

            for observation in parsed.observations.iter().take(sample) {
                println!("{}", serde_json::to_string(observation)?);
            }
        }
    }

    Ok(())
}
