use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};

use optigrade::api::start_api;
use optigrade::config::Settings;
use optigrade::features::{RawStudentInput, SessionContext};
use optigrade::model::{Predictor, UNAVAILABLE_MESSAGE};
use optigrade::recommendation::CannedRecommendations;
use optigrade::training::Trainer;
use optigrade::{Forecaster, OptiGradeError};

#[derive(Parser)]
#[command(author, version, about = "OptiGrade CGPA forecaster", long_about = None)]
struct Cli {
    /// Model artifact to load or write (overrides settings)
    #[arg(long, global = true, env = "OPTIGRADE_MODEL_PATH")]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model on historical student records and save it
    Train {
        /// CSV with feature columns and target_CGPA
        #[arg(long, default_value = "data/training_data.csv")]
        data: PathBuf,
        /// Where to write the artifact (defaults to the model path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Predict a CGPA from a JSON object of form fields
    Predict {
        /// e.g. '{"Current GPA": 3.4, "Attendance %": 80}'
        #[arg(long)]
        input: String,
        #[arg(long)]
        last_semester_gpa: Option<f64>,
        #[arg(long)]
        current_cgpa: Option<f64>,
    },
    /// Serve the JSON API
    Serve,
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let settings = Settings::new().context("Failed to load settings")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level)).init();

    let cli = Cli::parse();
    let model_path = cli.model.unwrap_or_else(|| settings.model_path.clone());

    match cli.command {
        Commands::Train { data, out } => {
            let model_path = out.unwrap_or(model_path);
            info!("Loading student data from {}", data.display());
            let model = Trainer::new(settings.training)
                .train_from_csv(&data)
                .with_context(|| format!("Training on {} failed", data.display()))?;
            if let Some(metrics) = model.metrics() {
                println!("Model trained with features: {:?}", model.feature_names());
                println!("   Hold-out R2: {:.3}  MAE: {:.3}", metrics.r2, metrics.mean_absolute_error);
            }
            model.save(&model_path).context("Failed to save model")?;
            println!("Model saved as {}", model_path.display());
        }
        Commands::Predict {
            input,
            last_semester_gpa,
            current_cgpa,
        } => {
            let raw: RawStudentInput = serde_json::from_str(&input).context("--input must be a JSON object")?;
            let forecaster = Forecaster::new(Predictor::load(&model_path), settings.missing_feature_policy);
            let context = SessionContext {
                last_semester_gpa,
                current_cgpa,
            };

            match forecaster.forecast(&raw, &context) {
                Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                Err(OptiGradeError::Unavailable(_)) => {
                    warn!("No usable model at {}", model_path.display());
                    println!("{}", UNAVAILABLE_MESSAGE);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Serve => {
            let forecaster = Forecaster::new(Predictor::load(&model_path), settings.missing_feature_policy);
            if !forecaster.predictor().is_available() {
                warn!("Serving with predictions disabled");
            }
            start_api(&settings.host, settings.port, forecaster, Arc::new(CannedRecommendations)).await?;
        }
    }

    Ok(())
}
