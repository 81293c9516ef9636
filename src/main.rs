/// Galabone native companion: loads every pending case from a data
/// directory, reports what is annotated and optionally exports YOLO labels.
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    let cli = native::Cli::parse();
    if let Err(e) = native::run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::error::Error;
    use std::path::PathBuf;

    use clap::Parser;
    use galabone::format::{YoloFlavor, write_yolo_labels};
    use galabone::{AnnotationBackend, EditorConfig, EditorSession, JsonDirBackend};

    #[derive(Parser)]
    #[command(name = "galabone-native")]
    #[command(about = "Inspect and export oriented-box bone annotations")]
    #[command(version)]
    pub struct Cli {
        /// Data directory (defaults to backend.data_dir from the config file)
        pub data_dir: Option<PathBuf>,

        /// Write YOLO label files for every case into this directory
        #[arg(long = "export-yolo", value_name = "OUT_DIR")]
        pub export_yolo: Option<PathBuf>,

        /// Export rotated YOLO-OBB corner lines instead of axis-aligned boxes
        #[arg(long = "obb", requires = "export_yolo")]
        pub obb: bool,

        /// Configuration file (defaults to the user config directory)
        #[arg(short = 'c', long = "config")]
        pub config: Option<PathBuf>,

        /// Increase output verbosity (show debug messages)
        #[arg(short = 'v', long = "verbose")]
        pub verbose: bool,
    }

    pub fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
        let config = match &cli.config {
            Some(path) => EditorConfig::load(path)?,
            None => EditorConfig::load_from_default_path(),
        };

        let level = if cli.verbose {
            log::LevelFilter::Debug
        } else {
            config.preferences.log_level.to_level_filter()
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
            .format_target(false)
            .init();

        log::debug!(
            "galabone-native v{} (configured log level: {})",
            env!("CARGO_PKG_VERSION"),
            config.preferences.log_level.name()
        );

        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| config.backend.data_dir.clone())
            .ok_or("no data directory given and none configured")?;
        let backend = JsonDirBackend::new(&data_dir);
        let flavor = if cli.obb {
            YoloFlavor::Obb
        } else {
            YoloFlavor::Detect
        };

        let mut session = EditorSession::new(config);
        if let Err(e) = session.load_taxonomy(&backend) {
            log::warn!("Continuing without taxonomy: {}", e);
        }

        let cases = backend.list_pending_cases()?;
        log::info!("{} pending cases in {:?}", cases.len(), backend.root());

        let mut total_annotations = 0;
        let mut total_skipped = 0;
        for case in &cases {
            session.open_case(&backend, case.case_id);
            let detections = session.load_detections(&backend).unwrap_or(0);
            let annotations = session.annotations().len();
            total_annotations += annotations;

            println!(
                "case {:>6}  {:>3} annotations  {:>3} detections  {}",
                case.case_id, annotations, detections, case.image_url
            );
            if let Some(status) = session.status() {
                println!("              {}", status);
            }

            if let Some(out_dir) = &cli.export_yolo {
                let labels = session.yolo_labels(flavor);
                total_skipped += labels.skipped;
                write_yolo_labels(out_dir, &case.label_stem(), &labels)?;
            }
        }

        println!("{} cases, {} annotations", cases.len(), total_annotations);
        if let Some(out_dir) = &cli.export_yolo {
            println!(
                "YOLO labels written to {} ({} annotations without sub-category skipped)",
                out_dir.display(),
                total_skipped
            );
        }
        Ok(())
    }
}
