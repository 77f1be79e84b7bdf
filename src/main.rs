use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use crossmatch::classifier::MatchClassifier;
use crossmatch::config::Config;
use crossmatch::geo::google::GoogleMapsClient;
use crossmatch::geo::{GeoDistanceResolver, GeocodingService, NoopGeocoder, RouteDistanceService};
use crossmatch::output::terminal;
use crossmatch::pipeline::{batch, ClassifierState, PairEvaluator};
use crossmatch::profile::{JsonProfileSource, ProfileRef};
use crossmatch::report::rows::PREDICTION_SHEET_PREFIX;
use crossmatch::report::ReportSink;
use crossmatch::scoring::features::FeatureVectorBuilder;
use crossmatch::topics::{SegmentStore, TfIdfEngine};

/// Crossmatch: decide whether two social-network profiles belong to the
/// same person.
///
/// Scores name, friend, location and time-segmented topic similarity, then
/// asks a pretrained classifier for a verdict.
#[derive(Parser)]
#[command(name = "crossmatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the report database
    Init,

    /// Compare two profiles (e.g. facebook:alice twitter:al)
    Compare {
        /// First profile, as network:user_id
        first: ProfileRef,

        /// Second profile, as network:user_id
        second: ProfileRef,

        /// Only compute features, don't ask the classifier
        #[arg(long)]
        no_classify: bool,
    },

    /// Compare every pair listed in a JSON manifest
    Batch {
        /// File containing [["net:user", "net:user"], ...]
        manifest: PathBuf,

        /// Number of pairs to evaluate in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Driving distance between two locations (auxiliary)
    Route {
        from: String,
        to: String,
    },

    /// Show recent classification results
    Report {
        /// Number of rows to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show system status (database, model, geocoder)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crossmatch=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing report database...");
            init_database(&config)?;
            println!("Database initialized at: {}", config.db_path);
            println!("\nNext: put profile dumps under {}", config.profile_dir.display());
            println!("  ({{network}}/{{user_id}}.json with \"profile\" and \"posts\")");
            println!("\nThen run: crossmatch compare facebook:someone twitter:someone");
        }

        Commands::Compare {
            first,
            second,
            no_classify,
        } => {
            let sink = open_database(&config)?;
            let evaluator = build_evaluator(&config, !no_classify)?.with_sink(sink);
            let source = JsonProfileSource::new(&config.profile_dir);

            println!("Comparing {first} with {second}...");
            let outcome = evaluator.evaluate_refs(&source, &first, &second).await?;
            terminal::display_outcome(&outcome);
        }

        Commands::Batch {
            manifest,
            concurrency,
        } => {
            let pairs = batch::load_manifest(&manifest)?;
            if pairs.is_empty() {
                println!("Manifest {} lists no pairs.", manifest.display());
                return Ok(());
            }

            let sink = open_database(&config)?;
            let evaluator = build_evaluator(&config, true)?.with_sink(sink);
            let source = JsonProfileSource::new(&config.profile_dir);

            println!("Evaluating {} pairs ({concurrency} concurrent)...", pairs.len());
            let summary = batch::run(&evaluator, &source, pairs, concurrency).await?;
            terminal::display_batch_summary(&summary);
        }

        Commands::Route { from, to } => {
            config.require_maps()?;
            let client = GoogleMapsClient::new(&config.maps_api_url, config.maps_api_key.clone())?;
            let guard = config.service_guard();
            let km = guard
                .call("maps", "route_distance", || client.route_distance(&from, &to))
                .await?;
            terminal::display_route(&from, &to, km);
        }

        Commands::Report { limit } => {
            let sink = open_database(&config)?;
            let rows = sink.recent_rows(Some(PREDICTION_SHEET_PREFIX), limit).await?;
            terminal::display_report_rows(&rows);
        }

        Commands::Status => {
            let sink = if std::path::Path::new(&config.db_path).exists() {
                Some(open_database(&config)?)
            } else {
                None
            };
            crossmatch::status::show(&config, sink.as_deref()).await?;
        }
    }

    Ok(())
}

/// Wire the ports from configuration into a pair evaluator.
fn build_evaluator(config: &Config, classify: bool) -> Result<PairEvaluator> {
    let engine = Arc::new(TfIdfEngine::default());
    let store = if config.persist_segments {
        Arc::new(SegmentStore::with_persist_dir(config.segment_dir()))
    } else {
        Arc::new(SegmentStore::new())
    };

    let geocoder: Arc<dyn GeocodingService> = if config.has_geocoder() {
        info!("Using Google Maps geocoder");
        Arc::new(GoogleMapsClient::new(
            &config.maps_api_url,
            config.maps_api_key.clone(),
        )?)
    } else {
        warn!("GOOGLE_MAPS_API_KEY not set; location distances will be unknown");
        Arc::new(NoopGeocoder)
    };
    let resolver = GeoDistanceResolver::new(geocoder, config.service_guard());

    let builder = FeatureVectorBuilder::new(
        engine,
        store,
        resolver,
        config.segment_params(),
        config.top_keywords,
        config.service_guard(),
    );

    let classifier = if classify {
        if let Err(e) = config.require_model() {
            println!("{}", format!("{e}").yellow());
        }
        ClassifierState::from_load(MatchClassifier::load(&config.model_path))
    } else {
        ClassifierState::Disabled
    };

    Ok(PairEvaluator::new(builder, classifier))
}

/// Open the report database.
#[cfg(feature = "sqlite")]
fn open_database(config: &Config) -> Result<Arc<dyn ReportSink>> {
    let sink = crossmatch::report::SqliteReportSink::open(&config.db_path)?;
    Ok(Arc::new(sink))
}

/// Initialize the report database (create if needed).
#[cfg(feature = "sqlite")]
fn init_database(config: &Config) -> Result<()> {
    let sink = crossmatch::report::SqliteReportSink::initialize(&config.db_path)?;
    drop(sink);
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn open_database(_config: &Config) -> Result<Arc<dyn ReportSink>> {
    warn!("Built without the 'sqlite' feature; report rows are kept in memory only");
    Ok(Arc::new(crossmatch::report::MemoryReportSink::new()))
}

#[cfg(not(feature = "sqlite"))]
fn init_database(_config: &Config) -> Result<()> {
    anyhow::bail!(
        "The report database needs the 'sqlite' feature.\n\
         Rebuild with: cargo build --features sqlite"
    )
}
