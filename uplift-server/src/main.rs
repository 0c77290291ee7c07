use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use uplift_pipeline::{
    LocalDirStore, PipelineConfig, PipelineError, RunArtifacts, StageKind, UpliftPipeline, WeekTag,
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "uplift-server")]
#[command(about = "Run the weekly promotion uplift pipeline against a directory blob store")]
struct Args {
    /// Weekly promotion upload (CSV). Not needed with --from.
    upload: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, short = 'c', env = "UPLIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory of the blob store (overrides storage.root)
    #[arg(long, env = "UPLIFT_STORAGE_ROOT")]
    storage_root: Option<PathBuf>,

    /// Container directory under the root (overrides storage.container)
    #[arg(long, env = "UPLIFT_CONTAINER")]
    container: Option<String>,

    /// Promotion week; derived from the upload name (pw_37.csv) when omitted
    #[arg(long, short = 'w')]
    week: Option<String>,

    /// Resume from a stage (register, prepare, preprocess, predict) using
    /// artifacts already in storage
    #[arg(long)]
    from: Option<String>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunJson {
    generated_at: String,
    week: u32,
    started_at_stage: String,
    pipeline_ms: u128,
    storage: String,
    predictions: PredictionsJson,
    written: Vec<String>,
}

#[derive(Serialize)]
struct PredictionsJson {
    svp: String,
    aba: String,
    bundle: String,
}

fn build_json(artifacts: &RunArtifacts, from: StageKind, storage: &Path, pipeline_ms: u128) -> RunJson {
    RunJson {
        generated_at: Utc::now().to_rfc3339(),
        week: artifacts.week.number(),
        started_at_stage: from.to_string(),
        pipeline_ms,
        storage: storage.display().to_string(),
        predictions: PredictionsJson {
            svp: artifacts.svp.clone(),
            aba: artifacts.aba.clone(),
            bundle: artifacts.bundle.clone(),
        },
        written: artifacts.written.clone(),
    }
}

fn print_human(artifacts: &RunArtifacts, from: StageKind, storage: &Path, pipeline_ms: u128) {
    println!();
    println!("  {:\u{2550}<64}", "");
    println!("  PROMO UPLIFT \u{00b7} week {}", artifacts.week);
    println!("  {:\u{2550}<64}", "");
    println!();
    println!("  storage     {}", storage.display());
    println!("  started at  {}", from);
    println!();
    println!("  SVP predictions  {}", artifacts.svp);
    println!("  ABA predictions  {}", artifacts.aba);
    println!("  Bundle           {}", artifacts.bundle);
    println!();
    println!("  {:\u{2500}<64}", "");
    for (i, path) in artifacts.written.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, path);
    }
    println!("  {:\u{2500}<64}", "");
    println!();
    println!("  \u{23f1}  Pipeline ran in {}ms", pipeline_ms);
    println!();
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}: {}", context, err);
    process::exit(1);
}

fn resolve_week(args: &Args) -> Result<WeekTag, PipelineError> {
    match (&args.week, &args.upload) {
        (Some(week), _) => week.parse(),
        (None, Some(upload)) => {
            let name = upload.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            WeekTag::from_file_name(name)
        }
        (None, None) => Err(PipelineError::InvalidWeek(
            "no --week given and no upload to derive it from".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path).unwrap_or_else(|e| fail("loading config", e)),
        None => PipelineConfig::default(),
    };
    if let Some(root) = &args.storage_root {
        config.storage.root = root.clone();
    }
    if let Some(container) = &args.container {
        config.storage.container = container.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let week = resolve_week(&args).unwrap_or_else(|e| fail("resolving week", e));
    let from = match &args.from {
        Some(stage) => stage
            .parse::<StageKind>()
            .unwrap_or_else(|e| fail("parsing --from", e)),
        None => StageKind::Register,
    };

    let store = Arc::new(LocalDirStore::new(&config.storage.root, &config.storage.container));
    let storage = store.base().to_path_buf();
    let pipeline = UpliftPipeline::new(store, &config);

    let pipeline_start = Instant::now();
    let result = match (&args.from, &args.upload) {
        (None, Some(upload)) => {
            let bytes = tokio::fs::read(upload)
                .await
                .unwrap_or_else(|e| fail(&format!("reading {}", upload.display()), e));
            log::info!("week={} uploading {} ({} bytes)", week, upload.display(), bytes.len());
            pipeline.run_pipeline(&week.to_string(), bytes).await
        }
        (None, None) => fail("missing upload", "pass an upload file or --from <stage>"),
        (Some(_), _) => pipeline.resume(week, from).await,
    };
    let pipeline_ms = pipeline_start.elapsed().as_millis();

    let artifacts = result.unwrap_or_else(|e| fail("pipeline failed", e));

    if args.json {
        let json = build_json(&artifacts, from, &storage, pipeline_ms);
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => fail("serializing output", e),
        }
    } else {
        print_human(&artifacts, from, &storage, pipeline_ms);
    }
}
