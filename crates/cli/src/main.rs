use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::{Parser, Subcommand};
use crossbeam_channel::{select, Receiver};

use facewatch_core::alerting::snapshot_recorder::SnapshotRecorder;
use facewatch_core::detection::domain::face_detector::FaceDetector;
use facewatch_core::detection::infrastructure::correlation_tracker::CorrelationTrackerFactory;
use facewatch_core::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;
use facewatch_core::pipeline::frame_annotator::FrameAnnotator;
use facewatch_core::pipeline::frame_orchestrator::{
    FrameEvent, FrameOrchestrator, FrameReport, OrchestratorSettings,
};
use facewatch_core::pipeline::infrastructure::blocking_pipeline_executor::BlockingPipelineExecutor;
use facewatch_core::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
use facewatch_core::pipeline::model_slot::ModelSlot;
use facewatch_core::pipeline::pipeline_executor::{PipelineConfig, PipelineExecutor};
use facewatch_core::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
use facewatch_core::pipeline::retrain_worker::{self, RetrainMessage, RetrainParams};
use facewatch_core::recognition::data_folder::DataFolder;
use facewatch_core::recognition::domain::recognition_model::RecognitionModel;
use facewatch_core::recognition::infrastructure::lbph_classifier::LbphClassifier;
use facewatch_core::recognition::model_trainer::{save_model, ModelTrainer};
use facewatch_core::shared::config::{AppConfig, DEFAULT_CONFIG_FILE};
use facewatch_core::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
use facewatch_core::shared::label_font::LabelFont;
use facewatch_core::shared::model_resolver;
use facewatch_core::video::domain::image_writer::ImageWriter;
use facewatch_core::video::infrastructure::ffmpeg_camera::FfmpegCamera;
use facewatch_core::video::infrastructure::image_file_reader::ImageFileReader;
use facewatch_core::video::infrastructure::image_file_writer::ImageFileWriter;

const REPORT_CHANNEL_CAPACITY: usize = 4;

/// Live face recognition with alerts and evidence snapshots.
#[derive(Parser)]
#[command(name = "facewatch", version)]
struct Cli {
    /// Configuration file.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Camera source override: device index, device path, file or URL.
    #[arg(long, global = true)]
    camera: Option<String>,

    /// Detection interval override (run detection every Nth frame).
    #[arg(long, global = true)]
    frame_skip: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Train the recognition model from the data folder.
    Train,
    /// Console mode: single-threaded frame loop (default).
    Run,
    /// Background frame loop; reads `train` / `quit` commands from stdin.
    Watch,
    /// Create a folder for a new person.
    AddPerson { name: String },
    /// Copy training photos into a person's folder.
    AddImages {
        name: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List known persons.
    Persons,
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
    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Train => run_train(&config),
        Command::Run => run_console(&config),
        Command::Watch => run_watch(&config),
        Command::AddPerson { name } => {
            let folder = DataFolder::new(&config.data_folder).add_person(&name)?;
            println!("Created {}", folder.display());
            Ok(())
        }
        Command::AddImages { name, files } => {
            let summary = DataFolder::new(&config.data_folder).add_images(&name, &files)?;
            println!(
                "Copied {} image(s) for {name}, skipped {}",
                summary.copied.len(),
                summary.skipped
            );
            Ok(())
        }
        Command::Persons => {
            for (name, _) in DataFolder::new(&config.data_folder).persons()? {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(camera) = &cli.camera {
        config.camera_source = camera.clone();
    }
    if let Some(frame_skip) = cli.frame_skip {
        config.frame_skip = frame_skip;
    }
    config.validate()?;
    Ok(config)
}

fn run_train(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut trainer = build_trainer(config)?;
    let set = trainer.collect(&config.data_folder)?;
    let samples = set.samples.len();
    let model = ModelTrainer::fit(set, Box::new(LbphClassifier::default()))?;
    save_model(&model, &config.model_file, &config.labels_file)?;
    println!(
        "Trained {} identities from {samples} samples",
        model.catalog().len()
    );
    Ok(())
}

fn run_console(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(config)?;
    let source = FfmpegCamera::open(&config.camera_source)?;
    let mut orchestrator = build_orchestrator(config, model)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    spawn_quit_listener(cancelled.clone());

    let preview = config.preview_file.clone();
    let writer = ImageFileWriter::new();
    let pipeline_config = PipelineConfig::new(cancelled).with_on_frame(Box::new(move |report| {
        present(&report, preview.as_deref(), &writer);
        true
    }));

    println!("Watching '{}'. Type q and Enter to stop.", config.camera_source);
    let mut logger = StdoutPipelineLogger::default();
    let processed = BlockingPipelineExecutor::new().execute(
        Box::new(source),
        &mut orchestrator,
        &mut logger,
        pipeline_config,
    )?;
    println!("Stopped after {processed} frames");
    Ok(())
}

fn run_watch(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(config)?;
    let source = FfmpegCamera::open(&config.camera_source)?;
    let slot = Arc::new(ModelSlot::new());
    let mut orchestrator = build_orchestrator(config, model)?.with_model_slot(slot.clone());

    let cancelled = Arc::new(AtomicBool::new(false));
    let (report_tx, report_rx) = crossbeam_channel::bounded::<FrameReport>(REPORT_CHANNEL_CAPACITY);
    let pipeline_config = PipelineConfig::new(cancelled.clone())
        .with_on_frame(Box::new(move |report| report_tx.send(report).is_ok()));

    let worker = thread::spawn(move || {
        let executor = ThreadedPipelineExecutor::new().with_drop_stale(true);
        executor
            .execute(
                Box::new(source),
                &mut orchestrator,
                &mut NullPipelineLogger,
                pipeline_config,
            )
            .map_err(|e| e.to_string())
    });

    let stdin_lines = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut retrain: Option<Receiver<RetrainMessage>> = None;
    let writer = ImageFileWriter::new();
    println!("Watching '{}'. Commands: train, quit", config.camera_source);

    loop {
        let retrain_rx = retrain.clone().unwrap_or_else(crossbeam_channel::never);
        let commands = if stdin_open {
            stdin_lines.clone()
        } else {
            crossbeam_channel::never()
        };
        select! {
            recv(report_rx) -> msg => match msg {
                Ok(report) => present(&report, config.preview_file.as_deref(), &writer),
                Err(_) => break,
            },
            recv(commands) -> msg => match msg.as_deref().map(str::trim) {
                Ok("train") if retrain.is_some() => println!("Retraining already in progress"),
                Ok("train") => retrain = Some(start_retrain(config, slot.clone())),
                Ok("quit") | Ok("q") => cancelled.store(true, Ordering::Relaxed),
                // stdin closed: keep watching until the stream ends.
                Err(_) => stdin_open = false,
                Ok("") => {}
                Ok(other) => println!("Unknown command '{other}'. Commands: train, quit"),
            },
            recv(retrain_rx) -> msg => match msg {
                Ok(RetrainMessage::Started) => println!("Retraining..."),
                Ok(RetrainMessage::Complete { identities }) => {
                    println!("Retrained model with {identities} identities");
                    retrain = None;
                }
                Ok(RetrainMessage::Error(e)) => {
                    eprintln!("Retraining failed: {e}");
                    retrain = None;
                }
                Err(_) => retrain = None,
            },
        }
    }

    let processed = worker
        .join()
        .map_err(|_| "frame loop panicked")??;
    println!("Stopped after {processed} frames");
    Ok(())
}

/// Prints alert events and refreshes the preview image.
fn present(report: &FrameReport, preview: Option<&Path>, writer: &dyn ImageWriter) {
    for event in &report.events {
        match event {
            FrameEvent::Alert { name, at, .. } => {
                println!("ALERT: {name} detected at {}", at.format("%H:%M:%S"));
            }
            FrameEvent::Snapshot { name, path } => {
                log::info!("Snapshot of {name} saved to {}", path.display());
            }
            FrameEvent::ModelSwapped { identities } => {
                println!("Now recognizing {identities} identities");
            }
        }
    }
    if let Some(path) = preview {
        if let Err(e) = writer.write(path, &report.annotated, None) {
            log::warn!("Could not write preview {}: {e}", path.display());
        }
    }
}

/// The detector for training is opened on the retrain thread so the
/// presentation loop keeps draining frame reports meanwhile.
fn start_retrain(config: &AppConfig, slot: Arc<ModelSlot>) -> Receiver<RetrainMessage> {
    let trainer_config = config.clone();
    retrain_worker::spawn(RetrainParams {
        trainer: Box::new(move || build_trainer(&trainer_config)),
        classifier: Box::new(LbphClassifier::default()),
        data_folder: config.data_folder.clone(),
        model_file: config.model_file.clone(),
        labels_file: config.labels_file.clone(),
        slot,
    })
}

fn load_model(config: &AppConfig) -> Result<Arc<RecognitionModel>, Box<dyn std::error::Error>> {
    let model = RecognitionModel::load(
        &config.model_file,
        &config.labels_file,
        Box::new(LbphClassifier::default()),
    )?;
    Ok(Arc::new(model))
}

fn build_orchestrator(
    config: &AppConfig,
    model: Arc<RecognitionModel>,
) -> Result<FrameOrchestrator, Box<dyn std::error::Error>> {
    let font = LabelFont::load_or_bundled(config.font_file.as_deref())?;
    let snapshots = SnapshotRecorder::new(
        config.snapshots_dir.clone(),
        config.snapshot_log_file.clone(),
        config.snapshot_padding,
        Box::new(ImageFileWriter::new()),
        font.clone(),
    );

    Ok(FrameOrchestrator::new(
        build_detector(config)?,
        Box::new(CorrelationTrackerFactory::default()),
        model,
        OrchestratorSettings::from_config(config),
    )
    .with_snapshots(snapshots)
    .with_annotator(FrameAnnotator::new(Some(font))))
}

fn build_trainer(config: &AppConfig) -> Result<ModelTrainer, Box<dyn std::error::Error>> {
    Ok(ModelTrainer::new(
        build_detector(config)?,
        Box::new(ImageFileReader::new()),
        config.min_face_size,
    ))
}

fn build_detector(config: &AppConfig) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        config.detector_model.as_deref(),
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        Some(Box::new(download_progress)),
    )?;

    Ok(Box::new(OnnxFaceDetector::new(
        &model_path,
        config.detection_confidence,
    )?))
}

/// Lines typed on stdin. The channel closes at end of input.
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn spawn_quit_listener(cancelled: Arc<AtomicBool>) {
    let commands = spawn_stdin_reader();
    thread::spawn(move || {
        for line in commands {
            if matches!(line.trim(), "q" | "quit") {
                cancelled.store(true, Ordering::Relaxed);
                break;
            }
        }
    });
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
