//! # Atelier CLI
//!
//! Usage:
//!   atelier certificate request.json -o out.pdf
//!   echo '{ ... }' | atelier portfolio --config look.json
//!   atelier example certificate > request.json

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use atelier::{AtelierError, CertificateRequest, PortfolioRequest, RenderConfig};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "atelier", version, about = "Render Style Challenge certificates and portfolios to PDF")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Render a certificate request
    Certificate(RenderArgs),
    /// Render a portfolio request
    Portfolio(RenderArgs),
    /// Print a sample request as JSON
    Example {
        #[arg(value_enum)]
        kind: Kind,
    },
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Request JSON file; reads stdin when omitted
    input: Option<PathBuf>,
    /// Output path; defaults to the document's download name
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Render configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Certificate,
    Portfolio,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Cmd::Certificate(args) => render(&args, |json, config| {
            let request = CertificateRequest::from_json(json)?;
            Ok((request.fields.file_name(), request.render(config)?))
        }),
        Cmd::Portfolio(args) => render(&args, |json, config| {
            let request = PortfolioRequest::from_json(json)?;
            Ok((request.fields.file_name(), request.render(config)?))
        }),
        Cmd::Example { kind } => example(kind),
    };

    if let Err(e) = result {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn render<F>(args: &RenderArgs, run: F) -> Result<(), AtelierError>
where
    F: FnOnce(&str, &RenderConfig) -> Result<(String, Vec<u8>), AtelierError>,
{
    let config = match &args.config {
        Some(path) => RenderConfig::from_path(path)?,
        None => RenderConfig::default(),
    };
    let input = read_input(args.input.as_deref())?;
    let (file_name, pdf_bytes) = run(&input, &config)?;

    let output = args.output.clone().unwrap_or_else(|| PathBuf::from(file_name));
    fs::write(&output, &pdf_bytes)?;
    log::info!("wrote {} bytes to {}", pdf_bytes.len(), output.display());
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String, AtelierError> {
    match path {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn example(kind: Kind) -> Result<(), AtelierError> {
    let json = match kind {
        Kind::Certificate => serde_json::to_string_pretty(&CertificateRequest::example())?,
        Kind::Portfolio => serde_json::to_string_pretty(&PortfolioRequest::example())?,
    };
    println!("{}", json);
    Ok(())
}
