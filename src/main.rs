use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bookbinder::builders::pdf::ChromiumRenderer;
use bookbinder::core::{BookOptions, BuildError, Pipeline};
use bookbinder::env::{core as log_env, generate_env_docs, EnvVar};
use bookbinder::toc::TocSpec;
use bookbinder::translation::{
    config_file_exists, load_dotenv, ConfigManager, TranslationError, TranslationService,
};

#[derive(Parser)]
#[command(name = "bookbinder")]
#[command(version, about = "Compile .docx chapter fragments into a translated PDF book", long_about = None)]
#[command(after_help = "Settings come from the environment; run `bookbinder env` for the list.

EXAMPLES:
    bookbinder                     Run every stage
    bookbinder order --spec        Show the TOC spec in use
    bookbinder translate           Rerun translation from work/master_en.html")]
struct Cli {
    /// Fragment source directory (overrides BOOK_SRC_DIR)
    #[arg(short, long, global = true, value_name = "DIR")]
    src: Option<PathBuf>,

    /// Work directory for intermediate files (overrides BOOK_WORK_DIR)
    #[arg(short, long, global = true, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Output directory for the PDF (overrides BOOK_OUTPUT_DIR)
    #[arg(short, long, global = true, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// TOC spec file (overrides BOOK_TOC_FILE)
    #[arg(long, global = true, value_name = "FILE")]
    toc_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run every stage (default)
    Build,
    /// Resolve and print the fragment order
    Order {
        /// Print the TOC spec as TOML instead of the resolved order
        #[arg(long)]
        spec: bool,
    },
    /// Merge fragments and produce work/master_en.html
    Assemble,
    /// Translate work/master_en.html into work/master_ko.html
    Translate,
    /// Render work/master_ko.html to PDF
    Render {
        /// Chromium executable (overrides BOOK_CHROME_PATH)
        #[arg(long, value_name = "PATH")]
        chrome: Option<PathBuf>,
    },
    /// Print the supported environment variables
    Env,
    /// Write an example translation config file
    InitConfig {
        /// Destination file
        #[arg(default_value = "bookbinder.toml", value_name = "FILE")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    load_dotenv();
    init_logging();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error_chain(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = log_env::LogFilter::get_or_default("info".to_string());
    let no_color = log_env::NoColor::get_or_default(false);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .init();
}

fn print_error_chain(err: &dyn Error) {
    eprintln!("error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

fn options(cli: &Cli) -> Result<BookOptions, BuildError> {
    let mut options = BookOptions::from_env()?;
    if let Some(src) = &cli.src {
        options.src_dir = Some(src.clone());
    }
    if let Some(work_dir) = &cli.work_dir {
        options.work_dir = work_dir.clone();
    }
    if let Some(output_dir) = &cli.output_dir {
        options.output_dir = output_dir.clone();
    }
    if let Some(toc_file) = &cli.toc_file {
        options.toc_file = Some(toc_file.clone());
    }
    Ok(options)
}

fn translation_service() -> Result<TranslationService, BuildError> {
    let config = ConfigManager::new()?.into_config();
    Ok(TranslationService::from_config(config)?)
}

fn init_config(path: &Path, force: bool) -> Result<(), BuildError> {
    if path.exists() && !force {
        return Err(TranslationError::ConfigError(format!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        ))
        .into());
    }

    ConfigManager::generate_example_config(path)?;
    println!("{}", path.display());
    if !config_file_exists() {
        println!("note: move it to bookbinder.toml, .bookbinder.toml or ~/.config/bookbinder/translation.toml to use it");
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), BuildError> {
    match &cli.command {
        Some(Command::Env) => {
            print!("{}", generate_env_docs());
            return Ok(());
        }
        Some(Command::InitConfig { path, force }) => return init_config(path, *force),
        _ => {}
    }

    let pipeline = Pipeline::new(options(&cli)?);

    match cli.command.unwrap_or(Command::Build) {
        Command::Build => {
            let report = pipeline.run(translation_service, &ChromiumRenderer::new())?;
            println!(
                "{} fragments ({} warnings), {} TOC entries, {} images inlined",
                report.fragments,
                report.warnings,
                report.assemble.toc_entries,
                report.assemble.images.inlined
            );
            println!("{}", report.translation);
            println!("{}", report.pdf.display());
        }
        Command::Order { spec: true } => {
            let src_dir = pipeline.options().require_src_dir()?;
            let spec = TocSpec::discover(src_dir, pipeline.options().toc_file.as_deref())?;
            print!("{}", spec.to_toml_string()?);
        }
        Command::Order { spec: false } => {
            let ordered = pipeline.order()?;
            for (i, fragment) in ordered.fragments.iter().enumerate() {
                println!("{:>3}. {}", i + 1, fragment.path().display());
            }
            for warning in &ordered.warnings {
                println!("warning: {warning}");
            }
        }
        Command::Assemble => {
            let ordered = pipeline.order()?;
            let report = pipeline.assemble(&ordered)?;
            println!(
                "{} parts merged, {} TOC entries, {} images inlined",
                report.compose.parts, report.toc_entries, report.images.inlined
            );
            println!("{}", pipeline.options().master_html().display());
        }
        Command::Translate => {
            let mut service = translation_service()?;
            let report = pipeline.translate(&mut service)?;
            println!("{report}");
        }
        Command::Render { chrome } => {
            let renderer = match chrome {
                Some(path) => ChromiumRenderer::with_executable(path),
                None => ChromiumRenderer::new(),
            };
            let pdf = pipeline.render(&renderer)?;
            println!("{}", pdf.display());
        }
        Command::Env | Command::InitConfig { .. } => {}
    }

    Ok(())
}
