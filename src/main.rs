use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};

use clinmark::report;
use clinmark::store::{self, FileStore, MemoryStore, RecordStore};
use clinmark::{Config, Renderer};

#[derive(Parser)]
#[command(name = "clinmark")]
#[command(about = "Render clinical report markup to HTML, Typst, PDF or JSON blocks")]
struct Cli {
    /// Config file (defaults to the built-in config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a report text file
    Render {
        /// Input report file
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Assemble and render a radiology report from a generation response
    Radiology {
        /// JSON response from the generation service
        response: PathBuf,

        #[arg(long, default_value = "P123")]
        patient: String,

        /// Directory of the record store (records are not kept if omitted)
        #[arg(long)]
        store: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Assemble and render a dermatology SOAP note from a generation response
    Derm {
        /// JSON response from the generation service
        response: PathBuf,

        #[arg(long, default_value = "P123")]
        patient: String,

        /// Reported symptom (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,

        /// Time since onset
        #[arg(long, default_value = "")]
        duration: String,

        #[arg(long)]
        store: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print a patient's stored clinical records as JSON
    History {
        patient: String,

        #[arg(long)]
        store: PathBuf,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Renderer profile (defaults depend on the command)
    #[arg(short, long)]
    profile: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Output file (stdout if omitted; PDF defaults to the input name with .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Typst,
    Pdf,
    Json,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::compiled_default(),
    };

    match cli.command {
        Command::Render { input, output } => {
            let text = read_input(&input)?;
            let renderer = Renderer::new(&config, output.profile.as_deref())?;
            emit(&renderer, &text, &input, &output)
        }
        Command::Radiology {
            response,
            patient,
            store,
            output,
        } => {
            let json = read_input(&response)?;
            let mut records = open_store(store);
            let text = report::radiology_report(&json, records.as_mut(), &patient);
            let profile = output.profile.as_deref().or(Some("radiology"));
            let renderer = Renderer::new(&config, profile)?;
            emit(&renderer, &text, &response, &output)
        }
        Command::Derm {
            response,
            patient,
            symptoms,
            duration,
            store,
            output,
        } => {
            let json = read_input(&response)?;
            let mut records = open_store(store);
            let text = report::derm_report(&json, records.as_mut(), &patient, &symptoms, &duration);
            let profile = output.profile.as_deref().or(Some("dermatology"));
            let renderer = Renderer::new(&config, profile)?;
            emit(&renderer, &text, &response, &output)
        }
        Command::History { patient, store } => {
            let mut records = FileStore::new(store);
            let history = store::history_or_empty(&mut records, &patient);
            println!("{}", serde_json::to_string_pretty(&history)?);
            Ok(())
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Error reading {}", path.display()))
}

fn open_store(dir: Option<PathBuf>) -> Box<dyn RecordStore> {
    match dir {
        Some(dir) => Box::new(FileStore::new(dir)),
        None => Box::new(MemoryStore::new()),
    }
}

fn emit(renderer: &Renderer, text: &str, input: &Path, args: &OutputArgs) -> Result<()> {
    let bytes = match args.format {
        Format::Html => renderer.to_html(text).into_bytes(),
        Format::Typst => renderer.to_typst(text).into_bytes(),
        Format::Json => serde_json::to_vec_pretty(&renderer.parse(text))?,
        Format::Pdf => renderer.to_pdf(text)?,
    };

    let output = match (&args.output, args.format) {
        (Some(path), _) => Some(path.clone()),
        (None, Format::Pdf) => Some(input.with_extension("pdf")),
        (None, _) => None,
    };

    match output {
        Some(path) => {
            if path == input {
                bail!("Refusing to overwrite input {}", path.display());
            }
            fs::write(&path, bytes).with_context(|| format!("Error writing {}", path.display()))?;
            eprintln!("Created {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
