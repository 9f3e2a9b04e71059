use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use medreport::record::sample_record;
use medreport::{render_record, Config, Locale, RenderOptions, RenderedReport, ServiceRecord};

mod client;
mod logging;
mod prompt;
mod server;

use client::{ReportClient, SubmittedReport};
use logging::{init_logging, Verbosity};

/// Collects medical transport service records and renders them as PDF reports.
///
/// Fonts are looked up in `report.fonts_dir`, `MEDREPORT_FONTS_DIR` and
/// `assets/fonts`, falling back to common system families.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// TOML configuration file (defaults to `medreport.toml` if present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report language: `en` or `pt`.
    #[arg(long, global = true, value_parser = parse_locale)]
    locale: Option<Locale>,

    /// More log output; repeat for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a JSON service record to PDF.
    Render {
        /// JSON payload to render.
        #[arg(short, long)]
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fill in the form on the terminal.
    Collect {
        #[command(flatten)]
        output: OutputArgs,
        /// Send the record to the report server instead of rendering locally.
        #[arg(long)]
        submit: bool,
        /// Submit endpoint, overriding `client.endpoint`.
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Send a JSON service record to the report server.
    Submit {
        /// JSON payload to send.
        #[arg(short, long)]
        input: PathBuf,
        /// Submit endpoint, overriding `client.endpoint`.
        #[arg(long)]
        endpoint: Option<String>,
        /// Where to write the returned PDF.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Serve `POST /submit` over HTTP.
    Serve {
        /// Listen address, overriding `server.addr`.
        #[arg(long)]
        addr: Option<String>,
    },

    /// Render a built-in example record.
    Sample {
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Where to write the PDF (defaults to the report's suggested filename).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Add a document outline with one entry per section.
    #[arg(long)]
    bookmarks: bool,
}

fn parse_locale(value: &str) -> Result<Locale, String> {
    Locale::from_code(value).ok_or_else(|| format!("unknown locale `{value}`, expected `en` or `pt`"))
}

fn main() {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose));

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        print_error_sources(&*err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_from(cli.config.as_deref())?;
    if let Some(locale) = cli.locale {
        config.report.locale = locale;
    }

    match cli.command {
        Commands::Render { input, output } => {
            let record = read_record(&input)?;
            render_to_file(&record, &config, &output)
        }
        Commands::Sample { output } => render_to_file(&sample_record(), &config, &output),
        Commands::Collect {
            output,
            submit,
            endpoint,
        } => {
            let today = chrono::Local::now().date_naive();
            let record = prompt::collect(config.report.locale, today)?;
            if submit {
                submit_collected(&record, &config, endpoint, output.output)
            } else {
                render_to_file(&record, &config, &output)
            }
        }
        Commands::Submit {
            input,
            endpoint,
            output,
        } => {
            let payload =
                fs::read(&input).with_context(|| format!("failed to read {}", input.display()))?;
            let client = client(&config, endpoint)?;
            let report = client.submit_payload(payload).map_err(|err| {
                anyhow::Error::new(err).context(format!(
                    "submission to {} failed; resubmit once the server is reachable",
                    client.endpoint()
                ))
            })?;
            write_submitted(report, output)
        }
        Commands::Serve { addr } => {
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            tokio::runtime::Runtime::new()?.block_on(server::serve(config))
        }
    }
}

fn read_record(path: &Path) -> Result<ServiceRecord> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    ServiceRecord::from_json(&bytes).with_context(|| format!("invalid service record in {}", path.display()))
}

fn render_to_file(record: &ServiceRecord, config: &Config, output: &OutputArgs) -> Result<()> {
    let options = RenderOptions::from(&config.report);
    let report = render(record, &options, output.bookmarks)?;
    let path = output
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(report.filename));
    write_pdf(&path, &report.bytes)
}

#[cfg(feature = "bookmarks")]
fn render(record: &ServiceRecord, options: &RenderOptions, bookmarks: bool) -> Result<RenderedReport> {
    let report = if bookmarks {
        medreport::render_record_with_bookmarks(record, options)?
    } else {
        render_record(record, options)?
    };
    Ok(report)
}

#[cfg(not(feature = "bookmarks"))]
fn render(record: &ServiceRecord, options: &RenderOptions, bookmarks: bool) -> Result<RenderedReport> {
    if bookmarks {
        anyhow::bail!("this build has no outline support; rebuild with the `bookmarks` feature");
    }
    Ok(render_record(record, options)?)
}

fn client(config: &Config, endpoint: Option<String>) -> Result<ReportClient> {
    let mut client_config = config.client.clone();
    if let Some(endpoint) = endpoint {
        client_config.endpoint = endpoint;
    }
    Ok(ReportClient::new(&client_config, config.report.locale)?)
}

fn submit_collected(
    record: &ServiceRecord,
    config: &Config,
    endpoint: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let client = client(config, endpoint)?;
    match client.submit(record) {
        Ok(report) => write_submitted(report, output),
        Err(err) => {
            let saved = PathBuf::from("service_record.json");
            fs::write(&saved, serde_json::to_vec_pretty(record)?)
                .with_context(|| format!("failed to save {}", saved.display()))?;
            Err(anyhow::Error::new(err).context(format!(
                "submission to {} failed; the form was saved to {}, resubmit with `medreport submit --input {}`",
                client.endpoint(),
                saved.display(),
                saved.display()
            )))
        }
    }
}

fn write_submitted(report: SubmittedReport, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from(&report.filename));
    write_pdf(&path, &report.bytes)
}

fn write_pdf(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} ({} bytes)", path.display(), bytes.len());
    println!("{}", path.display());
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_the_subcommand() {
        let cli = Cli::try_parse_from(["medreport", "sample", "--locale", "pt", "-vv"]).unwrap();
        assert_eq!(cli.locale, Some(Locale::Portuguese));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Sample { .. }));
    }

    #[test]
    fn unknown_locale_is_rejected() {
        assert!(Cli::try_parse_from(["medreport", "sample", "--locale", "fr"]).is_err());
    }
}
