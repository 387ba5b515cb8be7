use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tracing::error;

use athlete_risk::columns::ColumnKind;
use athlete_risk::export::{export_features_to_path, raw_preview, recorded_columns};
use athlete_risk::logging::{init_logging, LogFormat};
use athlete_risk::{
    load_classifier, AppConfig, AppContext, AthleteInput, Column, Dataset, DatasetSummarizer,
    Predictor, RiskBand, RiskError, Trainer,
};

/// athlete-risk - Athlete Injury Risk CLI
///
/// Summarizes athlete monitoring data, derives workload and recovery ratios,
/// and scores injury risk with a gradient-boosted classifier.
#[derive(Parser)]
#[command(name = "athlete-risk")]
#[command(author = "athlete-risk contributors")]
#[command(version)]
#[command(about = "Athlete injury risk analytics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the athlete dataset
    Summary {
        /// Dataset CSV (defaults to the configured path)
        #[arg(short, long, value_name = "FILE")]
        dataset: Option<PathBuf>,

        /// Show descriptive statistics for a column (repeatable)
        #[arg(long = "column", value_name = "NAME")]
        columns: Vec<Column>,

        /// Compare column means for injured and uninjured athletes
        #[arg(long)]
        by_label: bool,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Show engineered or recorded values per athlete, or export them to CSV
    Features {
        /// Dataset CSV (defaults to the configured path)
        #[arg(short, long, value_name = "FILE")]
        dataset: Option<PathBuf>,

        /// Number of athletes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Write every row to this CSV instead of printing
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Show the recorded columns instead of the engineered ones
        #[arg(long, conflicts_with = "output")]
        raw: bool,
    },

    /// Assess one athlete's injury risk
    Predict {
        /// Model artifact (defaults to the configured path)
        #[arg(short, long, value_name = "FILE")]
        model: Option<PathBuf>,

        #[command(flatten)]
        input: InputArgs,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Score every labeled athlete and compare with the recorded outcome
    Evaluate {
        /// Dataset CSV (defaults to the configured path)
        #[arg(short, long, value_name = "FILE")]
        dataset: Option<PathBuf>,

        /// Model artifact (defaults to the configured path)
        #[arg(short, long, value_name = "FILE")]
        model: Option<PathBuf>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Train the classifier and write the model artifact
    Train {
        /// Dataset CSV (defaults to the configured path)
        #[arg(short, long, value_name = "FILE")]
        dataset: Option<PathBuf>,

        /// Where to write the artifact (defaults to the configured model path)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Number of boosting rounds
        #[arg(long)]
        trees: Option<usize>,

        /// Seed for the split and subsampling
        #[arg(long)]
        seed: Option<u64>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Show or initialize the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the default configuration path
        #[arg(long)]
        path: bool,
    },
}

/// Athlete values for `predict`; omitted flags take the form defaults
#[derive(Args)]
struct InputArgs {
    /// Age in years (16-45) [default: 25]
    #[arg(long)]
    age: Option<u8>,
    /// Height in cm (150-210) [default: 175]
    #[arg(long)]
    height_cm: Option<f64>,
    /// Weight in kg (45-120) [default: 72]
    #[arg(long)]
    weight_kg: Option<f64>,
    /// Acute (7-day) load (100-2000) [default: 900]
    #[arg(long)]
    acute_load: Option<f64>,
    /// Chronic (28-day) load (100-2000) [default: 1000]
    #[arg(long)]
    chronic_load: Option<f64>,
    /// Match minutes in the last 7 days (0-540) [default: 180]
    #[arg(long)]
    match_minutes: Option<u32>,
    /// Sprint count (0-400) [default: 120]
    #[arg(long)]
    sprint_count: Option<u32>,
    /// Total distance in km (1-30) [default: 10.5]
    #[arg(long)]
    distance_km: Option<f64>,
    /// Resting heart rate (40-90) [default: 58]
    #[arg(long)]
    resting_hr: Option<f64>,
    /// Average training heart rate (90-190) [default: 145]
    #[arg(long)]
    avg_training_hr: Option<f64>,
    /// Heart rate variability (10-120) [default: 45]
    #[arg(long)]
    hrv: Option<f64>,
    /// VO2 max (30-75) [default: 54]
    #[arg(long)]
    vo2_max: Option<f64>,
    /// Average sleep hours (3-10) [default: 7.2]
    #[arg(long)]
    sleep_hours: Option<f64>,
    /// Sleep quality score (0-100) [default: 80]
    #[arg(long)]
    sleep_quality: Option<f64>,
    /// Fatigue score (0-100) [default: 65]
    #[arg(long)]
    fatigue: Option<f64>,
    /// Muscle soreness (0-100) [default: 55]
    #[arg(long)]
    soreness: Option<f64>,
    /// Perceived exertion (1-10) [default: 6]
    #[arg(long)]
    rpe: Option<u8>,
    /// Previous injury count (0-10) [default: 1]
    #[arg(long)]
    previous_injuries: Option<u32>,
    /// Days since the last injury (0-2000) [default: 120]
    #[arg(long)]
    days_since_injury: Option<u32>,
    /// Severity of the last injury (0-5) [default: 2]
    #[arg(long)]
    severity: Option<u8>,
}

impl InputArgs {
    fn into_input(self) -> AthleteInput {
        let d = AthleteInput::default();
        AthleteInput {
            age: self.age.unwrap_or(d.age),
            height_cm: self.height_cm.unwrap_or(d.height_cm),
            weight_kg: self.weight_kg.unwrap_or(d.weight_kg),
            acute_load: self.acute_load.unwrap_or(d.acute_load),
            chronic_load: self.chronic_load.unwrap_or(d.chronic_load),
            match_minutes_last_7_days: self.match_minutes.unwrap_or(d.match_minutes_last_7_days),
            sprint_count: self.sprint_count.unwrap_or(d.sprint_count),
            total_distance_km: self.distance_km.unwrap_or(d.total_distance_km),
            resting_heart_rate: self.resting_hr.unwrap_or(d.resting_heart_rate),
            avg_training_heart_rate: self.avg_training_hr.unwrap_or(d.avg_training_heart_rate),
            heart_rate_variability: self.hrv.unwrap_or(d.heart_rate_variability),
            vo2_max: self.vo2_max.unwrap_or(d.vo2_max),
            sleep_hours_avg: self.sleep_hours.unwrap_or(d.sleep_hours_avg),
            sleep_quality_score: self.sleep_quality.unwrap_or(d.sleep_quality_score),
            fatigue_score: self.fatigue.unwrap_or(d.fatigue_score),
            muscle_soreness: self.soreness.unwrap_or(d.muscle_soreness),
            perceived_exertion: self.rpe.unwrap_or(d.perceived_exertion),
            previous_injury_count: self.previous_injuries.unwrap_or(d.previous_injury_count),
            days_since_last_injury: self.days_since_injury.unwrap_or(d.days_since_last_injury),
            injury_severity_score: self.severity.unwrap_or(d.injury_severity_score),
        }
    }
}

/// Columns the dashboard plotted against the injury label
const DASHBOARD_COLUMNS: [Column; 6] = [
    Column::WeeklyTrainingLoad,
    Column::FatigueScore,
    Column::SleepDebt,
    Column::CardioStrain,
    Column::RecoveryStressRatio,
    Column::InjuryHistoryRisk,
];

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl MetricRow {
    fn new(metric: &str, value: String) -> Self {
        Self {
            metric: metric.to_string(),
            value,
        }
    }
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std Dev")]
    std_dev: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Median")]
    median: String,
    #[tabled(rename = "Max")]
    max: String,
}

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Injured (mean)")]
    injured: String,
    #[tabled(rename = "Not injured (mean)")]
    uninjured: String,
}

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    row: usize,
    #[tabled(rename = "BMI")]
    bmi: String,
    #[tabled(rename = "ACWR")]
    acwr: String,
    #[tabled(rename = "km/sprint")]
    distance_per_sprint: String,
    #[tabled(rename = "Cardio strain")]
    cardio_strain: String,
    #[tabled(rename = "Sleep debt")]
    sleep_debt: String,
    #[tabled(rename = "Recovery idx")]
    recovery_index: String,
    #[tabled(rename = "Stress ratio")]
    recovery_stress_ratio: String,
    #[tabled(rename = "History risk")]
    injury_history_risk: String,
    #[tabled(rename = "Injured")]
    injured: String,
}

#[derive(Tabled)]
struct BandRow {
    #[tabled(rename = "Band")]
    band: String,
    #[tabled(rename = "Athletes")]
    athletes: usize,
    #[tabled(rename = "Share")]
    share: String,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<RiskError>() {
            Some(risk) => {
                error!(severity = ?risk.severity(), fatal = risk.is_fatal(), "{}", risk);
                eprintln!("{} {}", "Error:".red().bold(), risk.user_message());
            }
            None => eprintln!("{} {:#}", "Error:".red().bold(), err),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::resolve(cli.config.as_deref())?;

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(&log_config).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Summary {
            dataset,
            columns,
            by_label,
            json,
        } => {
            override_path(&mut config.paths.dataset, dataset);
            summary_command(&config, &columns, by_label, json)
        }

        Commands::Features {
            dataset,
            limit,
            output,
            raw,
        } => {
            override_path(&mut config.paths.dataset, dataset);
            if raw {
                raw_command(&config, limit)
            } else {
                features_command(&config, limit, output)
            }
        }

        Commands::Predict { model, input, json } => {
            override_path(&mut config.paths.model, model);
            predict_command(&config, input.into_input(), json)
        }

        Commands::Evaluate {
            dataset,
            model,
            json,
        } => {
            override_path(&mut config.paths.dataset, dataset);
            override_path(&mut config.paths.model, model);
            evaluate_command(&config, json)
        }

        Commands::Train {
            dataset,
            output,
            trees,
            seed,
            no_progress,
        } => {
            override_path(&mut config.paths.dataset, dataset);
            override_path(&mut config.paths.model, output);
            if let Some(trees) = trees {
                config.training.params.n_estimators = trees;
            }
            if let Some(seed) = seed {
                config.training.split.seed = seed;
            }
            if no_progress {
                config.training.show_progress = false;
            }
            train_command(&config)
        }

        Commands::Config { init, path } => {
            if path {
                println!("{}", AppConfig::default_config_path().display());
            } else if init {
                let target = AppConfig::init(cli.config.as_deref())?;
                println!(
                    "{} {}",
                    "✓ Wrote default configuration to".green(),
                    target.display()
                );
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
            Ok(())
        }
    }
}

fn override_path(slot: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(path) = value {
        *slot = path;
    }
}

fn load_dataset(config: &AppConfig) -> Result<Dataset> {
    let dataset = Dataset::load(&config.paths.dataset, config.data.load_options())?;
    if dataset.skipped_rows() > 0 {
        eprintln!(
            "{}",
            format!("Skipped {} invalid rows", dataset.skipped_rows()).yellow()
        );
    }
    Ok(dataset)
}

fn summary_command(config: &AppConfig, columns: &[Column], by_label: bool, json: bool) -> Result<()> {
    let dataset = load_dataset(config)?;
    let summarizer = DatasetSummarizer::new(&dataset);

    let summary = summarizer.summarize().map_err(RiskError::from)?;
    let stats = columns
        .iter()
        .map(|&column| summarizer.column_stats(column))
        .collect::<Result<Vec<_>, _>>()
        .map_err(RiskError::from)?;
    let splits = if by_label {
        let selected = if columns.is_empty() {
            &DASHBOARD_COLUMNS[..]
        } else {
            columns
        };
        selected
            .iter()
            .map(|&column| summarizer.by_label(column))
            .collect::<Result<Vec<_>, _>>()
            .map_err(RiskError::from)?
    } else {
        Vec::new()
    };

    if json {
        let report = serde_json::json!({
            "summary": summary,
            "columns": stats,
            "by_label": splits,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Athlete dataset summary".cyan().bold());
    if let Some(source) = dataset.source() {
        println!("  Source: {}", source.display());
    }
    let rows = vec![
        MetricRow::new("Total records", summary.total_records.to_string()),
        MetricRow::new("Avg weekly load", format!("{:.1}", summary.avg_weekly_load)),
        MetricRow::new("Avg fatigue score", format!("{:.1}", summary.avg_fatigue_score)),
        MetricRow::new(
            "Injury rate",
            summary
                .injury_rate_pct
                .map_or("-".to_string(), |rate| format!("{:.2}%", rate)),
        ),
        MetricRow::new("Avg sleep debt (hrs)", format!("{:.2}", summary.avg_sleep_debt)),
    ];
    println!("{}", Table::new(rows));

    if !stats.is_empty() {
        println!("\n{}", "Column statistics".cyan().bold());
        let rows: Vec<StatsRow> = stats
            .iter()
            .zip(columns.iter())
            .map(|(s, column)| StatsRow {
                column: s.column.clone(),
                count: s.count,
                mean: column.format_value(s.mean),
                std_dev: s
                    .std_dev
                    .map_or("-".to_string(), |sd| column.format_value(sd)),
                min: column.format_value(s.min),
                median: column.format_value(s.median),
                max: column.format_value(s.max),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    if !splits.is_empty() {
        println!("\n{}", "Injured vs not injured".cyan().bold());
        let format_mean = |column: &str, mean: Option<f64>| match (mean, column.parse::<Column>()) {
            (Some(value), Ok(column)) => column.format_value(value),
            (Some(value), Err(_)) => format!("{:.2}", value),
            (None, _) => "-".to_string(),
        };
        let rows: Vec<LabelRow> = splits
            .iter()
            .map(|split| LabelRow {
                column: split.column.clone(),
                injured: format_mean(&split.column, split.injured_mean),
                uninjured: format_mean(&split.column, split.uninjured_mean),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    Ok(())
}

fn features_command(config: &AppConfig, limit: usize, output: Option<PathBuf>) -> Result<()> {
    let dataset = load_dataset(config)?;

    if let Some(path) = output {
        let rows = export_features_to_path(&dataset, &path)?;
        println!(
            "{} {} rows to {}",
            "✓ Exported".green(),
            rows,
            path.display()
        );
        return Ok(());
    }

    let rows: Vec<FeatureRow> = dataset
        .rows()
        .take(limit)
        .enumerate()
        .map(|(index, (record, derived))| FeatureRow {
            row: index + 1,
            bmi: Column::Bmi.format_value(derived.bmi),
            acwr: Column::Acwr.format_value(derived.acwr),
            distance_per_sprint: Column::DistancePerSprint.format_value(derived.distance_per_sprint),
            cardio_strain: Column::CardioStrain.format_value(derived.cardio_strain),
            sleep_debt: Column::SleepDebt.format_value(derived.sleep_debt),
            recovery_index: Column::RecoveryIndex.format_value(derived.recovery_index),
            recovery_stress_ratio: Column::RecoveryStressRatio
                .format_value(derived.recovery_stress_ratio),
            injury_history_risk: Column::InjuryHistoryRisk.format_value(derived.injury_history_risk),
            injured: match record.is_injured() {
                Some(true) => "yes".to_string(),
                Some(false) => "no".to_string(),
                None => "-".to_string(),
            },
        })
        .collect();

    println!(
        "{}",
        format!("Engineered features ({} of {} athletes)", rows.len(), dataset.len())
            .cyan()
            .bold()
    );
    println!("{}", Table::new(rows));
    Ok(())
}

fn raw_command(config: &AppConfig, limit: usize) -> Result<()> {
    let dataset = load_dataset(config)?;
    let header: Vec<String> = recorded_columns()
        .map(|column| column.name().to_string())
        .collect();
    let rows = raw_preview(&dataset, limit);

    println!(
        "{}",
        format!("Recorded data ({} of {} athletes)", rows.len(), dataset.len())
            .cyan()
            .bold()
    );
    println!("{}", Table::from_iter(std::iter::once(header).chain(rows)));
    Ok(())
}

fn predict_command(config: &AppConfig, input: AthleteInput, json: bool) -> Result<()> {
    let predictor = Predictor::new(load_classifier(&config.paths.model)?);
    let assessment = predictor.assess(&input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    println!("{}", "Injury risk assessment".cyan().bold());
    println!(
        "\n  {}  {:.1}% probability of injury",
        assessment.band.colored_label(),
        assessment.percent
    );
    println!("  {}\n", assessment.band.recommendation().dimmed());

    let rows: Vec<MetricRow> = Column::ALL
        .iter()
        .filter(|column| column.kind() == ColumnKind::Derived)
        .filter_map(|column| {
            column
                .value(&assessment.record, &assessment.derived)
                .map(|value| MetricRow::new(column.name(), column.format_value(value)))
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

fn evaluate_command(config: &AppConfig, json: bool) -> Result<()> {
    let context = AppContext::startup(config)?;
    let evaluation = context.evaluate()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("Evaluation over {} labeled athletes", evaluation.rows)
            .cyan()
            .bold()
    );
    let rows: Vec<BandRow> = [RiskBand::Low, RiskBand::Moderate, RiskBand::High]
        .into_iter()
        .map(|band| {
            let athletes = evaluation.count(band);
            BandRow {
                band: band.label().to_string(),
                athletes,
                share: format!(
                    "{:.1}%",
                    athletes as f64 / evaluation.rows.max(1) as f64 * 100.0
                ),
            }
        })
        .collect();
    println!("{}", Table::new(rows));

    let metrics = &evaluation.metrics;
    let rows = vec![
        MetricRow::new("ROC-AUC", format_auc(metrics.roc_auc)),
        MetricRow::new("Log loss", format!("{:.4}", metrics.log_loss)),
        MetricRow::new("Accuracy (p >= 0.5)", format!("{:.1}%", metrics.accuracy)),
        MetricRow::new("Injury rate", format!("{:.1}%", metrics.positive_rate * 100.0)),
    ];
    println!("{}", Table::new(rows));
    Ok(())
}

fn train_command(config: &AppConfig) -> Result<()> {
    let dataset = load_dataset(config)?;

    println!(
        "{}",
        format!(
            "Training injury risk model on {} athletes...",
            dataset.len()
        )
        .blue()
        .bold()
    );
    let model = Trainer::new(config.training.clone()).train(&dataset)?;
    model.save(&config.paths.model)?;

    if let Some(metrics) = &model.metrics {
        let rows = vec![
            MetricRow::new("Trees", model.n_trees().to_string()),
            MetricRow::new("Train rows", metrics.train_rows.to_string()),
            MetricRow::new("Held-out rows", metrics.test_rows.to_string()),
            MetricRow::new("Held-out ROC-AUC", format_auc(metrics.roc_auc)),
            MetricRow::new("Held-out log loss", format!("{:.4}", metrics.log_loss)),
            MetricRow::new("Held-out accuracy", format!("{:.1}%", metrics.accuracy)),
        ];
        println!("{}", Table::new(rows));
    }

    let importance: Vec<MetricRow> = model
        .feature_importance()
        .into_iter()
        .take(5)
        .map(|(feature, splits)| MetricRow::new(&feature, format!("{} splits", splits)))
        .collect();
    if !importance.is_empty() {
        println!("\n{}", "Most used features".cyan().bold());
        println!("{}", Table::new(importance));
    }

    println!(
        "{} {}",
        "✓ Model written to".green(),
        config.paths.model.display()
    );
    Ok(())
}

fn format_auc(auc: Option<f64>) -> String {
    auc.map_or("n/a".to_string(), |auc| format!("{:.4}", auc))
}
