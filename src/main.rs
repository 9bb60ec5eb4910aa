use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use find_overlap::cli::Args;
use find_overlap::report::{create_report_metadata, render_console, save_json_report, OverlapReport};
use find_overlap::{gather_digests, locate_overlap, OverlapError, OverlapOutcome};

const EXIT_FAILURE: i32 = 1;
const EXIT_AMBIGUOUS: i32 = 2;

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("find-overlap: {e:#}");
            if let Some(OverlapError::Read { .. }) = e.downcast_ref::<OverlapError>() {
                eprintln!("The device has unreadable areas; image it with a rescue tool such as ddrescue and run again on the image.");
            }
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("Invalid arguments: {}", e);
        return Ok(EXIT_FAILURE);
    }

    init_logging(&args);

    let digests = gather_digests(&args).context("failed to collect block hashes")?;
    let total_blocks = digests.total_blocks();
    let outcome = locate_overlap(&digests.records, &args.locator_config());

    print!("{}", render_console(&outcome, total_blocks, digests.block_size));
    std::io::stdout().flush()?;

    if let Some(path) = &args.json_report {
        let metadata = create_report_metadata(args.device.as_deref(), args.read_hashes.as_deref());
        let report = OverlapReport::new(metadata, &outcome, total_blocks, digests.block_size);
        save_json_report(path, &report)
            .with_context(|| format!("failed to write JSON report {}", path.display()))?;
    }

    Ok(match outcome {
        OverlapOutcome::Ambiguous(_) => EXIT_AMBIGUOUS,
        OverlapOutcome::Found(_) | OverlapOutcome::NotFound => 0,
    })
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
