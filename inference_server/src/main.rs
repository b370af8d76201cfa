use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use data_ingestion::config::DEFAULT_CONFIG_FILE;
use data_ingestion::logger::init_logger;
use data_ingestion::{MarketDataSource, PriceRequest, PriceSource};
use feature_processing::extract_features;
use log::{error, info};

use inference_server::config::AppConfig;
use inference_server::model::load_model;
use inference_server::server::Server;
use inference_server::{InferenceEngine, PredictError, Predictor, run_pipeline};

/// Predict next-day stock movement (Up/Down) from technical indicators.
#[derive(Parser, Debug)]
#[command(name = "inference_server", version)]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve predictions over HTTP (default)
    Serve,
    /// Score one ticker and print the latest predictions
    Predict {
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Also print the tail of the feature table
        #[arg(long)]
        features: bool,
    },
}

struct Pipeline {
    cfg: AppConfig,
    engine: InferenceEngine,
    source: MarketDataSource,
}

impl Pipeline {
    /// Loads and checks the model once; any failure here aborts startup.
    fn new(cfg: AppConfig) -> Result<Self> {
        let model = load_model(&cfg.model.path).context("Failed to load prediction model")?;
        let engine = InferenceEngine::new(model).context("Model does not match the feature pipeline")?;
        let source = MarketDataSource::from_config(&cfg.source).context("Failed to set up market data source")?;

        Ok(Self { cfg, engine, source })
    }

    async fn serve(self) -> Result<()> {
        let bind_addr = self.cfg.server.bind_addr.clone();
        let predictor = Predictor::new(self.source, self.engine, self.cfg.report.tail_len);
        let server = Server::init(predictor, self.cfg.report, &bind_addr);
        server.run().await
    }

    async fn predict_once(
        &self,
        ticker: Option<String>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        show_features: bool,
    ) -> Result<(), PredictError> {
        let defaults = &self.cfg.report;
        let ticker = ticker.unwrap_or_else(|| defaults.default_ticker.clone());
        let request = PriceRequest::new(
            &ticker,
            start.unwrap_or(defaults.default_start),
            end.unwrap_or(defaults.default_end),
        )?;

        let series = self.source.fetch(&request).await?;
        let report = run_pipeline(&self.engine, &request.ticker, &series, defaults.tail_len)?;

        if show_features {
            let table = extract_features(&series);
            match table.to_dataframe() {
                Ok(df) => println!("{}", df.tail(Some(defaults.tail_len))),
                Err(e) => error!("Failed to render feature table: {}", e),
            }
        }

        println!(
            "{} {} to {}: {} rows scored, {} predicted up days",
            report.ticker, request.start, request.end, report.rows_scored, report.up_count
        );
        match report.summary_frame() {
            Ok(df) => println!("Last {} predictions\n{}", report.recent.len(), df),
            Err(e) => error!("Failed to render summary table: {}", e),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_logger();

    let cli = Cli::parse();
    let cfg = AppConfig::from_env(&cli.config).context("Failed to load configuration")?;
    let pipeline = Pipeline::new(cfg)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            pipeline.serve().await?;
            info!("Pipeline has been shut down gracefully");
        }
        Command::Predict {
            ticker,
            start,
            end,
            features,
        } => {
            if let Err(e) = pipeline.predict_once(ticker, start, end, features).await {
                error!("{}", e);
                eprintln!("{}", e.user_message());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
