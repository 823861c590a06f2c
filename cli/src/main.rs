use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use clap::Parser;
use engine::backend::{ImageBackend, OpenAiImages};
use engine::batch::{LineRecord, dispatch, run_batch};
use engine::request::{JobSpec, RequestDefaults};

mod cli;
use cli::{Batch, Cli, Command, Generate};

const EXIT_CONFIG: u8 = 1;
const EXIT_PARTIAL_FAILURE: u8 = 2;
const EXIT_DISPATCH_FAILURE: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("{err}");
        return ExitCode::from(EXIT_CONFIG);
    }
    pretty_env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version print to stdout and exit cleanly;
            // everything else is a usage error.
            let code = if err.use_stderr() { EXIT_CONFIG } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let api_key = match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => {
            eprintln!("Missing OPENAI_API_KEY environment variable.");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let backend = OpenAiImages::new(api_key);

    let code = match cli.command {
        Command::Generate(args) => run_generate(args, &backend).await,
        Command::Batch(args) => run_batch_file(args, &backend).await,
    };
    ExitCode::from(code)
}

async fn run_generate(args: Generate, backend: &dyn ImageBackend) -> u8 {
    let defaults = RequestDefaults {
        model: args.shared.model,
        size: args.shared.size,
        quality: args.shared.quality,
        background: args.shared.background,
        out_dir: args.out_dir,
        out: args.out,
        name: args.name,
    };

    let job = JobSpec::prompt_only(args.prompt);
    let request = match job.resolve_request(&defaults) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("{err}");
            return EXIT_CONFIG;
        }
    };
    let out_path = job.resolve_output(&defaults);

    match dispatch(&request, &out_path, backend).await {
        Ok(()) => {
            println!("{}", out_path.display());
            0
        }
        Err(err) => {
            eprintln!("generation failed: {err}");
            EXIT_DISPATCH_FAILURE
        }
    }
}

async fn run_batch_file(args: Batch, backend: &dyn ImageBackend) -> u8 {
    let defaults = RequestDefaults {
        model: args.shared.model,
        size: args.shared.size,
        quality: args.shared.quality,
        background: args.shared.background,
        out_dir: args.out_dir,
        out: None,
        name: None,
    };

    let file = match File::open(&args.jsonl) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Cannot open batch file {}: {err}", args.jsonl.display());
            return EXIT_CONFIG;
        }
    };

    let summary = match run_batch(BufReader::new(file), &defaults, backend, print_record).await {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("batch aborted: {err}");
            return EXIT_CONFIG;
        }
    };

    println!(
        "batch complete: success={} failed={}",
        summary.success, summary.failed
    );
    if summary.failed == 0 { 0 } else { EXIT_PARTIAL_FAILURE }
}

fn print_record(record: &LineRecord) {
    match record {
        LineRecord::Saved { line, path } => println!("[line {line}] {}", path.display()),
        LineRecord::Failed { line, reason } => eprintln!("[line {line}] {reason}"),
    }
}
