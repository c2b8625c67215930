//! Screen Translator - real-time on-screen text translation
//!
//! Captures the screen, recognizes text, translates it through a chain of
//! backends and shows the translations next to the original text.

mod app;
mod capture;
mod config;
mod overlay;
mod pipeline;
mod shared;
mod signals;
mod storage;
mod translation;
mod vision;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::ScreenTranslator;
use crate::capture::{ContinuousCapture, ImageFileGrabber, ScreenGrabber, XcapGrabber};
use crate::config::AppConfig;
use crate::overlay::LogRenderer;
use crate::pipeline::TickOutcome;

/// Screen Translator - real-time on-screen text translation
#[derive(Parser, Debug)]
#[command(name = "screen-translator")]
#[command(about = "Recognizes text on screen and overlays its translation")]
struct Args {
    /// Configuration file (defaults to config.toml in the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    save_default_config: bool,

    /// Read frames from an image file instead of the screen
    #[arg(long)]
    image: Option<PathBuf>,

    /// Process a single frame and exit
    #[arg(long)]
    once: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };

    if args.save_default_config {
        config::save_config(&AppConfig::default(), &config_path)?;
        println!("Default configuration written to {}", config_path.display());
        return Ok(());
    }

    let config = if args.config.is_some() {
        config::load_config(&config_path)?
    } else {
        config::load_or_default(&config_path)?
    };
    config.validate()?;

    if args.show_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("Screen Translator starting...");
    info!(
        "Translating {:?} into {:?}",
        config.translation.source_languages, config.translation.target_language
    );

    let grabber: Box<dyn ScreenGrabber> = match &args.image {
        Some(path) => {
            info!("Reading frames from {:?}", path);
            Box::new(ImageFileGrabber::new(path.clone()))
        }
        None => Box::new(XcapGrabber::new(config.capture.monitor)),
    };
    let capture = ContinuousCapture::new(grabber, config.capture_config()?);

    let mut translator = ScreenTranslator::from_config(&config, Box::new(capture));
    let mut renderer = LogRenderer::default();

    if args.once {
        let outcome = translator.run_once(&mut renderer);
        if outcome == TickOutcome::Failed {
            error!("Frame processing failed");
        }
        translator.print_stats();
        return Ok(());
    }

    signals::install(translator.stop_handle())?;

    let result = translator.run(&mut renderer);
    if let Err(e) = &result {
        error!("Translator error: {:#}", e);
    }

    translator.stop();
    translator.print_stats();
    info!("Program exited");

    result
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
