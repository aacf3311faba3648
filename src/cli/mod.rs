//! Command-line surface: argument parsing and pipeline orchestration.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::config::PipelineConfig;
use crate::entities::run_report::{FatalDetailsOutput, RunReport, SummaryOutput};
use crate::entities::{drug_summary, fatal_report};
use crate::error::FaersError;
use crate::render;
use crate::sources::openfda::OpenFdaClient;

pub mod health;

#[derive(Parser, Debug)]
#[command(
    name = "painkiller-faers",
    version,
    about = "openFDA regulatory status, FAERS report counts, and single-drug fatal case samples for common painkillers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Print the run report as JSON instead of markdown
    #[arg(long, short = 'j', global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the drug risk summary, then the fatal report details (default)
    Run(PipelineArgs),

    /// Write only the drug risk summary
    Summary(PipelineArgs),

    /// Write only the fatal report details
    FatalDetails(PipelineArgs),

    /// Check connectivity to the openFDA endpoints and the output directory
    Health {
        /// Skip the output directory write check
        #[arg(long)]
        apis_only: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Summary CSV path (default: drug_risk_summary.csv)
    #[arg(long)]
    pub summary_out: Option<PathBuf>,

    /// Fatal details CSV path (default: fatal_report_details.csv)
    #[arg(long)]
    pub details_out: Option<PathBuf>,

    /// Restrict the run to these configured drugs (repeatable)
    #[arg(long = "drug", short = 'd')]
    pub drugs: Vec<String>,

    /// Complete fatal examples to collect per drug (default: 10)
    #[arg(long)]
    pub examples: Option<usize>,

    /// Fatal report ids to request per drug (default: 50)
    #[arg(long)]
    pub candidates: Option<usize>,
}

impl PipelineArgs {
    fn into_config(self) -> Result<PipelineConfig, FaersError> {
        let mut config = PipelineConfig::default().only_drugs(&self.drugs)?;
        if let Some(path) = self.summary_out {
            config.summary_path = path;
        }
        if let Some(path) = self.details_out {
            config.details_path = path;
        }
        if let Some(examples) = self.examples {
            config.target_examples = examples;
        }
        if let Some(candidates) = self.candidates {
            config.candidate_limit = candidates;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    All,
    Summary,
    FatalDetails,
}

impl Stage {
    fn includes_summary(self) -> bool {
        matches!(self, Self::All | Self::Summary)
    }

    fn includes_fatal_details(self) -> bool {
        matches!(self, Self::All | Self::FatalDetails)
    }
}

fn now_rfc3339() -> anyhow::Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format report timestamp")
}

/// Runs the requested passes in order and writes their output files.
///
/// Upstream failures are absorbed by the pipelines; only local problems such as
/// an unwritable output path are returned as errors.
async fn execute(
    client: &OpenFdaClient,
    config: &PipelineConfig,
    stage: Stage,
) -> anyhow::Result<RunReport> {
    let summary = if stage.includes_summary() {
        info!(path = %config.summary_path.display(), "generating drug risk summary");
        let rows = drug_summary::run_summary(client, config).await;
        let bytes = render::csv::summary_csv(&rows)?;
        render::csv::write_file(&config.summary_path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", config.summary_path.display()))?;
        info!(path = %config.summary_path.display(), rows = rows.len(), "saved drug risk summary");
        Some(SummaryOutput::new(&config.summary_path, rows))
    } else {
        None
    };

    let fatal_details = if stage.includes_fatal_details() {
        info!(path = %config.details_path.display(), "generating fatal report details");
        let harvest = fatal_report::run_fatal_details(client, config).await;
        let bytes = render::csv::fatal_details_csv(&harvest.rows)?;
        render::csv::write_file(&config.details_path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", config.details_path.display()))?;
        info!(path = %config.details_path.display(), rows = harvest.rows.len(), "saved fatal report details");
        Some(FatalDetailsOutput::new(&config.details_path, &harvest))
    } else {
        None
    };

    Ok(RunReport {
        generated_at: now_rfc3339()?,
        summary,
        fatal_details,
    })
}

async fn run_stage(args: PipelineArgs, stage: Stage, json: bool) -> anyhow::Result<String> {
    let config = args.into_config()?;
    let client = OpenFdaClient::new()?;
    let report = execute(&client, &config, stage).await?;
    if json {
        Ok(render::json::to_pretty(&report)?)
    } else {
        Ok(render::markdown::run_report_markdown(&report)?)
    }
}

/// Executes a parsed command and returns the text to print on stdout.
///
/// # Errors
///
/// Returns an error for invalid arguments, HTTP client setup failures, or
/// output files that cannot be written.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let json = cli.json;
    match cli.command.unwrap_or(Commands::Run(PipelineArgs::default())) {
        Commands::Run(args) => run_stage(args, Stage::All, json).await,
        Commands::Summary(args) => run_stage(args, Stage::Summary, json).await,
        Commands::FatalDetails(args) => run_stage(args, Stage::FatalDetails, json).await,
        Commands::Health { apis_only } => {
            let report = health::check(apis_only).await?;
            if json {
                Ok(render::json::to_pretty(&report)?)
            } else {
                Ok(report.to_markdown())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::DrugEntry;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}-{nanos}"))
    }

    #[test]
    fn no_subcommand_defaults_to_full_run() {
        let cli = Cli::try_parse_from(["painkiller-faers"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn parses_pipeline_flags() {
        let cli = Cli::try_parse_from([
            "painkiller-faers",
            "fatal-details",
            "--drug",
            "aspirin",
            "-d",
            "ibuprofen",
            "--examples",
            "3",
            "--details-out",
            "out/fatal.csv",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        let Some(Commands::FatalDetails(args)) = cli.command else {
            panic!("expected fatal-details command");
        };
        let config = args.into_config().unwrap();
        let ids = config.drugs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["ASPIRIN", "IBUPROFEN"]);
        assert_eq!(config.target_examples, 3);
        assert_eq!(config.details_path, PathBuf::from("out/fatal.csv"));
        assert_eq!(config.candidate_limit, 50);
    }

    #[test]
    fn rejects_unknown_drug() {
        let args = PipelineArgs {
            drugs: vec!["TRAMADOL".into()],
            ..PipelineArgs::default()
        };
        assert!(args.into_config().is_err());
    }

    #[test]
    fn rejects_zero_examples() {
        let args = PipelineArgs {
            examples: Some(0),
            ..PipelineArgs::default()
        };
        assert!(args.into_config().is_err());
    }

    #[tokio::test]
    async fn execute_writes_both_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"openfda": {"product_type": ["HUMAN OTC DRUG"]}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("count", "safetyreportid.exact"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"term": "R1", "count": 1}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("search", "safetyreportid:\"R1\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "safetyreportid": "R1",
                    "receiptdate": "20200202",
                    "occurcountry": "GB",
                    "patient": {
                        "patientonsetage": "33",
                        "patientsex": "2",
                        "reaction": [{"reactionmeddrapt": "HEPATIC FAILURE"}]
                    }
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("limit", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {"results": {"skip": 0, "limit": 0, "total": 9}}
            })))
            .mount(&server)
            .await;

        let dir = temp_dir("painkiller-faers-run");
        let config = PipelineConfig {
            drugs: vec![DrugEntry::new("PARACETAMOL", &["ACETAMINOPHEN", "PARACETAMOL"])],
            summary_path: dir.join("summary.csv"),
            details_path: dir.join("details.csv"),
            drug_pause: Duration::ZERO,
            candidate_pause: Duration::ZERO,
            ..PipelineConfig::default()
        };
        let client = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let report = execute(&client, &config, Stage::All).await.unwrap();

        let summary = tokio::fs::read_to_string(&config.summary_path).await.unwrap();
        assert_eq!(
            summary,
            "painkiller_id;us_regulatory_status;total_reports;serious_reports;fatal_reports\n\
             PARACETAMOL;Over-the-Counter;9;9;9\n"
        );
        let details = tokio::fs::read_to_string(&config.details_path).await.unwrap();
        assert!(details.contains("PARACETAMOL;R1;true;20200202;HEPATIC FAILURE;33;Female;GB"));
        assert_eq!(report.fatal_details.map(|d| d.rows_written), Some(1));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn summary_stage_leaves_details_file_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = temp_dir("painkiller-faers-summary");
        let config = PipelineConfig {
            drugs: vec![DrugEntry::new("DIPYRONE", &["DIPYRONE", "METAMIZOLE"])],
            summary_path: dir.join("summary.csv"),
            details_path: dir.join("details.csv"),
            drug_pause: Duration::ZERO,
            candidate_pause: Duration::ZERO,
            ..PipelineConfig::default()
        };
        let client = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let report = execute(&client, &config, Stage::Summary).await.unwrap();

        assert!(report.fatal_details.is_none());
        let summary = tokio::fs::read_to_string(&config.summary_path).await.unwrap();
        assert!(summary.ends_with("DIPYRONE;Not Approved in US;0;0;0\n"));
        assert!(tokio::fs::metadata(&config.details_path).await.is_err());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
