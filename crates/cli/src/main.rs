mod config;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use recognizer_core::detection::domain::face_analyzer::{FaceAnalyzer, SharedAnalyzer};
use recognizer_core::detection::infrastructure::onnx_face_embedder::OnnxFaceEmbedder;
use recognizer_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use recognizer_core::gallery::domain::identity_source::IdentitySource;
use recognizer_core::gallery::embedding_resolver::EmbeddingResolver;
use recognizer_core::gallery::gallery_cache::{GalleryCache, SystemClock};
use recognizer_core::gallery::gallery_loader::GalleryLoader;
use recognizer_core::gallery::infrastructure::json_identity_source::JsonIdentitySource;
use recognizer_core::gallery::infrastructure::sqlite_identity_source::SqliteIdentitySource;
use recognizer_core::imaging::domain::image_decoder::ImageDecoder;
use recognizer_core::imaging::infrastructure::image_crate_decoder::ImageCrateDecoder;
use recognizer_core::matching::match_engine::MatchEngine;
use recognizer_core::pipeline::recognize_faces_use_case::{
    RecognizeError, RecognizeFacesUseCase, RecognizeResponse,
};
use recognizer_core::pipeline::refresh_gallery_use_case::RefreshGalleryUseCase;
use recognizer_core::shared::constants::{
    DETECTOR_MODEL_NAME, EMBEDDER_MODEL_NAME, IMAGE_EXTENSIONS,
};
use recognizer_core::shared::model_resolver::{ModelResolver, ModelSource};

use config::{RecognizerConfig, SourceConfig};

/// Recognize known people in photographs.
#[derive(Parser)]
#[command(name = "face-recognizer")]
struct Cli {
    /// Config file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Identity database: SQLite file, or a .json identity list.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Base directory for relative reference-photo paths.
    #[arg(long, global = true)]
    image_base: Option<PathBuf>,

    /// Match distance threshold (strictly below counts as a match).
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true)]
    confidence: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match faces in images (or directories of images) against the gallery.
    Recognize {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Force a gallery reload and report the number of known identities.
    Reload,
    /// Load the gallery and report liveness.
    Health,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = apply_overrides(RecognizerConfig::load(cli.config.as_deref())?, &cli);
    config.validate()?;

    let decoder: Arc<dyn ImageDecoder> = Arc::new(ImageCrateDecoder::new());
    let analyzer = build_analyzer(&config)?;
    let cache = Arc::new(build_cache(&config, decoder.clone(), analyzer.clone())?);
    let refresh = RefreshGalleryUseCase::new(cache.clone());

    match cli.command {
        Command::Recognize { images } => {
            refresh.reload()?;
            let use_case = RecognizeFacesUseCase::new(
                cache,
                analyzer,
                decoder,
                MatchEngine::new(config.match_threshold),
            );
            run_recognize(
                &images,
                |bytes| use_case.execute(bytes),
                &mut io::stdout().lock(),
            )?;
        }
        Command::Reload => {
            println!("{}", serde_json::to_string(&refresh.reload()?)?);
        }
        Command::Health => {
            refresh.reload()?;
            println!("{}", serde_json::to_string(&refresh.health())?);
        }
    }
    Ok(())
}

fn apply_overrides(mut config: RecognizerConfig, cli: &Cli) -> RecognizerConfig {
    if let Some(path) = &cli.database {
        config.source = Some(SourceConfig::from_path(path.clone()));
    }
    if let Some(dir) = &cli.image_base {
        config.image_base = dir.clone();
    }
    if let Some(threshold) = cli.threshold {
        config.match_threshold = threshold;
    }
    if let Some(confidence) = cli.confidence {
        config.detector_confidence = confidence;
    }
    config
}

/// One JSON line per image. A failing image is reported and skipped; the
/// batch as a whole still fails if any image did.
fn run_recognize(
    inputs: &[PathBuf],
    recognize: impl Fn(&[u8]) -> Result<RecognizeResponse, RecognizeError>,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = expand_inputs(inputs)?;
    let mut failed = 0;
    for path in &files {
        let outcome = fs::read(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))
            .and_then(|bytes| recognize(&bytes).map_err(|e| format!("{}: {e}", path.display())));
        match outcome {
            Ok(response) => {
                log::info!("{}: {} faces", path.display(), response.matches.len());
                writeln!(out, "{}", serde_json::to_string(&response)?)?;
            }
            Err(message) => {
                eprintln!("Error: {message}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(format!("{failed} of {} images failed", files.len()).into());
    }
    Ok(())
}

/// Files pass through; directories expand to their image files, sorted.
fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    Ok(files)
}

fn build_analyzer(config: &RecognizerConfig) -> Result<SharedAnalyzer, Box<dyn std::error::Error>> {
    let resolver = ModelResolver::platform(config.bundled_models_dir.clone())?;

    let detector_path = resolve_model(
        &resolver,
        DETECTOR_MODEL_NAME,
        &config.detector_model.to_source(),
    )?;
    let embedder_path = resolve_model(
        &resolver,
        EMBEDDER_MODEL_NAME,
        &config.embedder_model.to_source(),
    )?;

    let detector = OnnxYoloDetector::new(&detector_path, config.detector_confidence)?;
    let embedder = OnnxFaceEmbedder::new(&embedder_path)?;
    Ok(FaceAnalyzer::new(Box::new(detector), Box::new(embedder)).into_shared())
}

fn resolve_model(
    resolver: &ModelResolver,
    name: &str,
    source: &ModelSource,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let label = name.to_string();
    let path = resolver.resolve(
        name,
        source,
        Some(Box::new(move |downloaded, total| {
            download_progress(&label, downloaded, total)
        })),
    )?;
    log::debug!("Using {name} from {}", path.display());
    Ok(path)
}

fn build_cache(
    config: &RecognizerConfig,
    decoder: Arc<dyn ImageDecoder>,
    analyzer: SharedAnalyzer,
) -> Result<GalleryCache, Box<dyn std::error::Error>> {
    let source: Arc<dyn IdentitySource> = match &config.source {
        Some(SourceConfig::Sqlite(path)) => Arc::new(SqliteIdentitySource::new(path.clone())),
        Some(SourceConfig::Json(path)) => Arc::new(JsonIdentitySource::new(path.clone())),
        None => return Err(config::ConfigError::MissingSource.into()),
    };
    let resolver = EmbeddingResolver::new(config.image_base.clone(), decoder, analyzer);
    Ok(GalleryCache::with_policy(
        GalleryLoader::new(source, resolver),
        config.staleness(),
        Arc::new(SystemClock),
    ))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
