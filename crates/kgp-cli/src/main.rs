//! KGP CLI - Command-line interface
//!
//! Usage:
//!   kgp evaluate [--gold <path>] [--pred-artifacts <path>] [--out <path>]
//!   kgp pipeline <doc.json> [--outdir <dir>] [--use-llm] [--prompt-re <path>]
//!   kgp batch [--gold <path>] [--out <path>] [--outdir <dir>] [--use-llm] [--prompt-re <path>]
//!   kgp llm --prompt <path> --text <text>

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kgp_core::{load_gold, load_pred_artifacts, read_json, write_json_pretty, AppConfig, Document};
use kgp_eval::EvaluationReport;
use kgp_llm::LlmCaller;
use kgp_pipeline::{bundle_from_artifacts, save_artifacts, Pipeline};

#[derive(Parser)]
#[command(name = "kgp")]
#[command(about = "Knowledge-graph and personality extraction and evaluation harness")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score pipeline artifacts against a gold corpus
    Evaluate {
        /// Gold corpus (JSON array of documents)
        #[arg(long)]
        gold: Option<PathBuf>,
        /// Prediction artifacts (`pred_relations`, `rule_personality`)
        #[arg(long)]
        pred_artifacts: Option<PathBuf>,
        /// Report output path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the extraction pipeline for one document
    Pipeline {
        /// Document JSON file
        doc: PathBuf,
        /// Output directory for `pipeline_<doc_id>.json`
        #[arg(long)]
        outdir: Option<PathBuf>,
        #[command(flatten)]
        llm: LlmArgs,
    },
    /// Run the pipeline over a corpus and write the prediction bundle
    Batch {
        /// Corpus (JSON array of documents)
        #[arg(long)]
        gold: Option<PathBuf>,
        /// Bundle output path
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write per-document artifacts into this directory
        #[arg(long)]
        outdir: Option<PathBuf>,
        #[command(flatten)]
        llm: LlmArgs,
    },
    /// Run one prompted model call and print the parsed response
    Llm {
        /// Prompt template containing `{input_text}`
        #[arg(long)]
        prompt: PathBuf,
        /// Input text
        #[arg(long)]
        text: String,
        /// Skip evidence validation
        #[arg(long)]
        no_validate: bool,
    },
}

#[derive(clap::Args)]
struct LlmArgs {
    /// Run prompted relation extraction per sentence
    #[arg(long)]
    use_llm: bool,
    /// Relation-extraction prompt template
    #[arg(long)]
    prompt_re: Option<PathBuf>,
}

impl LlmArgs {
    fn apply(self, config: &mut AppConfig) {
        if self.use_llm {
            config.pipeline.use_llm = true;
        }
        if self.prompt_re.is_some() {
            config.pipeline.prompt_re_path = self.prompt_re;
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref()).context("Failed to load configuration")?;
    init_tracing(&config);

    match cli.command {
        Commands::Evaluate {
            gold,
            pred_artifacts,
            out,
        } => {
            let gold_path = gold.unwrap_or(config.eval.gold_path);
            let artifacts_path = pred_artifacts.unwrap_or(config.eval.pred_artifacts_path);
            let out_path = out.unwrap_or(config.eval.out_path);

            let gold = load_gold(&gold_path)
                .with_context(|| format!("Failed to load gold corpus {}", gold_path.display()))?;
            let bundle = load_pred_artifacts(&artifacts_path).with_context(|| {
                format!("Failed to load artifacts {}", artifacts_path.display())
            })?;

            let report = EvaluationReport::build(&gold, &bundle);
            report
                .write_json(&out_path)
                .with_context(|| format!("Failed to write report {}", out_path.display()))?;

            println!("{}", report.summary());
            println!("Wrote evaluation report to {}", out_path.display());
        }
        Commands::Pipeline { doc, outdir, llm } => {
            llm.apply(&mut config);
            let outdir = outdir.unwrap_or_else(|| config.pipeline.output_dir.clone());

            let document: Document = read_json(&doc)
                .with_context(|| format!("Failed to load document {}", doc.display()))?;
            let path = Pipeline::from_config(&config)
                .run_and_save(&document, &outdir)
                .await
                .context("Failed to save pipeline artifacts")?;

            println!("Wrote pipeline artifacts to {}", path.display());
        }
        Commands::Batch {
            gold,
            out,
            outdir,
            llm,
        } => {
            llm.apply(&mut config);
            let gold_path = gold.unwrap_or_else(|| config.eval.gold_path.clone());
            let out_path = out.unwrap_or_else(|| config.eval.pred_artifacts_path.clone());

            let docs = load_gold(&gold_path)
                .with_context(|| format!("Failed to load corpus {}", gold_path.display()))?;
            let pipeline = Pipeline::from_config(&config);

            let mut artifacts = Vec::with_capacity(docs.len());
            for doc in &docs {
                let doc_artifacts = pipeline.run_for_doc(doc).await;
                if let Some(dir) = &outdir {
                    save_artifacts(&doc_artifacts, dir)
                        .with_context(|| format!("Failed to save artifacts for {}", doc.doc_id))?;
                }
                artifacts.push(doc_artifacts);
            }

            let bundle = bundle_from_artifacts(&artifacts);
            write_json_pretty(&out_path, &bundle)
                .with_context(|| format!("Failed to write bundle {}", out_path.display()))?;

            tracing::info!("Processed {} documents", docs.len());
            println!("Wrote prediction bundle to {}", out_path.display());
        }
        Commands::Llm {
            prompt,
            text,
            no_validate,
        } => {
            let caller = LlmCaller::from_config(&config.llm).with_evidence_validation(!no_validate);
            let response = caller
                .call_text(&prompt, &text)
                .await
                .context("LLM call failed")?;

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
