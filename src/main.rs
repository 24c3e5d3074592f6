//! Command-line host for the background loader.
//!
//! Loads every given source, prints one line per decoded image and, with
//! `--watch`, keeps polling the watched folders for new and modified files.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use imgload::{
    BackgroundLoader, ImageCollection, LoadOptions, LoadRequest, LoaderConfig, LogLevel,
    TransferFunction,
};

#[derive(Parser)]
#[command(name = "imgload")]
#[command(about = "Decode images, folders and zip archives in the background", long_about = None)]
#[command(version)]
struct Args {
    /// Files, folders, zip archives or `archive.zip:entry` sources
    #[arg(value_name = "PATHS")]
    paths: Vec<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Part/channel selector, e.g. `diffuse,-.A`
    #[arg(short = 's', long, value_name = "PATTERN")]
    channel_selector: Option<String>,

    /// Override the transfer function of loaded files
    #[arg(short, long, value_name = "NAME")]
    transfer_function: Option<TransferFunction>,

    /// Exponent used with `--transfer-function gamma`
    #[arg(short, long, value_name = "VALUE")]
    gamma: Option<f32>,

    /// Decoder threads (0 = one per CPU)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Watch a folder for new and modified images (repeatable); runs until interrupted
    #[arg(short, long, value_name = "DIR")]
    watch: Vec<PathBuf>,

    /// Also load files already present in watched folders
    #[arg(long, default_value_t)]
    load_existing: bool,
}

impl Args {
    fn load_options(&self, defaults: &LoadOptions) -> LoadOptions {
        let mut options = defaults.clone();
        if let Some(selector) = &self.channel_selector {
            options.channel_selector = selector.clone();
        }
        if let Some(tf) = self.transfer_function {
            options.transfer_function = tf;
        }
        if let Some(gamma) = self.gamma {
            options.gamma = gamma;
        }
        options
    }
}

fn print_images(loader: &mut BackgroundLoader, collection: &mut ImageCollection) -> usize {
    loader.get_loaded_images(|image, target, select| {
        println!(
            "{}\t{}x{}\t{}\t{}",
            image.file_and_partname(),
            image.width,
            image.height,
            image.channel_names().join(","),
            image.transfer_function.name(image.gamma),
        );
        collection.accept(image, target, select);
    })
}

fn drain_until_idle(loader: &mut BackgroundLoader, collection: &mut ImageCollection) {
    while !loader.is_idle() {
        if print_images(loader, collection) == 0 {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(LoaderConfig::default_path);
    let mut config = config_path
        .as_deref()
        .map(LoaderConfig::load_or_default)
        .unwrap_or_default();

    let level = args.log_level.unwrap_or(config.preferences.log_level);
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .init();

    if let Some(threads) = args.threads {
        config.preferences.worker_threads = threads;
    }
    let options = args.load_options(&config.preferences.load_options);

    let mut loader = match BackgroundLoader::from_preferences(&config.preferences) {
        Ok(loader) => loader,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    loader.set_recent_files(config.recent_files.clone());

    let ignore_existing = !args.load_existing && config.preferences.ignore_existing_on_watch;
    for dir in config.watched_directories.iter().chain(&args.watch) {
        loader.add_watched_directory(dir, ignore_existing);
    }

    let mut collection = ImageCollection::new();
    let mut scheduled = 0;
    for (i, path) in args.paths.iter().enumerate() {
        scheduled += loader.background_load(LoadRequest::open(path, options.clone()).selecting(i == 0));
    }
    log::debug!("Scheduled {} load(s)", scheduled);
    drain_until_idle(&mut loader, &mut collection);

    if let Some(path) = &args.config {
        config.recent_files = loader.recent_files().to_vec();
        config.watched_directories = loader.watched_directories();
        if let Err(e) = config.save_to_path(path) {
            log::warn!("Could not save configuration: {}", e);
        }
    }

    if !args.watch.is_empty() {
        let interval = Duration::from_millis(config.preferences.watch_interval_ms.max(1));
        log::info!(
            "Watching {} folder(s), press Ctrl+C to stop",
            loader.watched_directories().len()
        );
        loop {
            loader.load_new_and_modified_files(&mut collection, &options);
            drain_until_idle(&mut loader, &mut collection);
            std::thread::sleep(interval);
        }
    }

    if !args.paths.is_empty() && collection.is_empty() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
