use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use request_extractor::{
    DirectorySource, DirectoryStore, Error, Result, collect, decode_lenient, decode_strict,
    extract, store::StoredRequests,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "Extract business HTTP requests from OTLP trace exports")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the requests of a single trace export document.
    Extract {
        /// Export document to read, `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,
        /// Where to write `{"data": [...]}`, `-` for stdout.
        #[arg(long, default_value = "-")]
        output: String,
        /// Fail on malformed values instead of dropping them.
        #[arg(long)]
        strict: bool,
    },
    /// Extract the requests of every trace in a directory of export documents.
    Collect {
        /// Directory holding `<trace_id>.json` export documents.
        #[arg(long, env = "REQUEST_EXTRACTOR_TRACES_DIR")]
        traces_dir: PathBuf,
        /// Directory receiving one `<trace_id>.json` per trace.
        #[arg(long, env = "REQUEST_EXTRACTOR_OUT_DIR")]
        out_dir: PathBuf,
        /// Traces to process; defaults to every document in `--traces-dir`.
        #[arg(long = "trace-id")]
        trace_ids: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_extractor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Extract {
            input,
            output,
            strict,
        } => run_extract(&input, &output, strict),
        Command::Collect {
            traces_dir,
            out_dir,
            trace_ids,
        } => run_collect(traces_dir, out_dir, trace_ids),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}

fn run_extract(input: &str, output: &str, strict: bool) -> Result<()> {
    let input_data = read_input(input)?;
    let document: serde_json::Value = serde_json::from_str(&input_data)?;

    let data = if strict {
        decode_strict(&document)?
    } else {
        let (data, report) = decode_lenient(&document)?;
        if !report.is_clean() {
            warn!(
                batches = report.batches,
                scope_spans = report.scope_spans,
                spans = report.spans,
                events = report.events,
                links = report.links,
                attributes = report.attributes,
                "dropped malformed units"
            );
        }
        data
    };

    let requests = extract(&data);
    info!(batches = data.batches.len(), requests = requests.len(), "extracted");

    let output_data = serde_json::to_string_pretty(&StoredRequests {
        data: requests.into(),
    })?;
    write_output(output, &format!("{output_data}\n"))
}

fn run_collect(traces_dir: PathBuf, out_dir: PathBuf, trace_ids: Vec<String>) -> Result<()> {
    let source = DirectorySource::new(traces_dir);
    let mut store = DirectoryStore::open(out_dir)?;

    let trace_ids = if trace_ids.is_empty() {
        source.trace_ids()?
    } else {
        trace_ids
    };
    if trace_ids.is_empty() {
        warn!(dir = %source.root().display(), "no trace documents found");
    }

    let summary = collect(&source, &mut store, &trace_ids);
    if !summary.failed.is_empty() {
        return Err(Error::TracesFailed {
            failed: summary.failed.len(),
            total: trace_ids.len(),
        });
    }
    Ok(())
}

fn read_input(input: &str) -> Result<String> {
    let io_error = |source: io::Error| Error::Io {
        path: PathBuf::from(input),
        source,
    };
    if input == "-" {
        let mut data = String::new();
        io::stdin().read_to_string(&mut data).map_err(io_error)?;
        return Ok(data);
    }
    fs::read_to_string(input).map_err(io_error)
}

fn write_output(output: &str, data: &str) -> Result<()> {
    let io_error = |source: io::Error| Error::Io {
        path: PathBuf::from(output),
        source,
    };
    if output == "-" {
        return io::stdout().write_all(data.as_bytes()).map_err(io_error);
    }
    fs::write(output, data).map_err(io_error)
}
