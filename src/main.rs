use std::path::{Path, PathBuf};

use clap::Parser;
use franken_verdict::cli::{BatchArgs, Cli, Command, RunArgs, ShutdownController};
use franken_verdict::compare::FieldPolicy;
use franken_verdict::parser::discover_parsers;
use franken_verdict::pool::default_worker_count;
use franken_verdict::report::{self, TimingStats};
use franken_verdict::tester::{Tester, TesterConfig};
use franken_verdict::{FvError, FvResult};

fn main() {
    let cli = Cli::parse();
    franken_verdict::logging::init(verbosity(&cli.command));

    if let Err(e) = ShutdownController::install(None) {
        tracing::warn!("failed to install Ctrl+C handler: {e}");
    }

    match run(cli) {
        Ok(code) => {
            if ShutdownController::is_shutting_down() {
                std::process::exit(ShutdownController::signal_exit_code());
            }
            std::process::exit(code);
        }
        Err(error) => {
            if ShutdownController::is_shutting_down() {
                eprintln!("interrupted");
                std::process::exit(ShutdownController::signal_exit_code());
            }
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}

fn verbosity(command: &Command) -> u8 {
    match command {
        Command::Run(args) => args.verbose,
        Command::Add(args) | Command::Update(args) | Command::Delete(args) => args.verbose,
    }
}

fn run(cli: Cli) -> FvResult<i32> {
    match cli.command {
        Command::Run(args) => run_cases(&args),
        Command::Add(args) => mutate(&args, false),
        Command::Update(args) => mutate(&args, true),
        Command::Delete(args) => delete(&args),
    }
}

fn build_tester(
    parser_dir: &Path,
    store_dir: Option<PathBuf>,
    parser_filter: Option<String>,
    workers: Option<usize>,
    policy: FieldPolicy,
) -> FvResult<Tester> {
    let registry = discover_parsers(parser_dir)?;
    Tester::new(
        registry,
        TesterConfig {
            store_root: store_dir,
            parser_filter,
            workers: workers.unwrap_or_else(default_worker_count),
            policy,
        },
    )
}

fn run_cases(args: &RunArgs) -> FvResult<i32> {
    let filter = args.parser_filter()?;
    let tester = build_tester(
        &args.parser_dir,
        args.store_dir.clone(),
        filter,
        args.workers,
        args.policy(),
    )?;
    let total = tester.total();

    let mut results = Vec::with_capacity(total);
    let mut count = 0usize;
    let mut stream = tester.run();
    while let Some(verdict) = stream.next() {
        count += 1;
        if !args.silent && !args.json {
            println!("{}", report::progress_line(count, total, &verdict));
        }
        results.push(verdict);
        if ShutdownController::is_shutting_down() {
            tracing::info!("interrupted; cancelling remaining cases");
            break;
        }
    }
    // Dropping the stream releases the pool; in-flight cases finish on their
    // own and their verdicts are discarded.
    drop(stream);

    if args.json {
        println!("{}", report::render_json(&results)?);
    } else {
        if !args.silent {
            for verdict in results.iter().filter(|v| !args.failed_only || !v.passed) {
                println!("{}", report::detail_block(verdict));
            }
            if let Some(stats) = TimingStats::from_results(&results) {
                println!("{}", stats.render());
            }
        }
        let passed = results.iter().filter(|v| v.passed).count();
        println!("{}", report::summary_line(passed, results.len()));
    }

    Ok(if results.iter().all(|v| v.passed) { 0 } else { 1 })
}

fn mutate(args: &BatchArgs, replace: bool) -> FvResult<i32> {
    // `update` with no named inputs refreshes every stored case; `add` still
    // requires explicit files.
    let explicit = if replace && !args.has_inputs() {
        None
    } else {
        Some(args.collect_inputs()?)
    };
    let tester = build_tester(
        &args.parser_dir,
        args.store_dir.clone(),
        Some(args.parser.clone()),
        None,
        FieldPolicy::with_default_exclusions(),
    )?;
    let inputs = match explicit {
        Some(inputs) => inputs,
        // StoreMissing here means the parser has no recorded cases yet.
        None => tester.list_test_files(&args.parser)?,
    };

    let verb = if replace { "updated" } else { "added" };
    let mut failed = 0usize;
    for input in &inputs {
        if ShutdownController::is_shutting_down() {
            return Err(FvError::Cancelled(
                "interrupted before batch completed".to_owned(),
            ));
        }
        match tester.update_test_results(&args.parser, Path::new(input), replace) {
            Ok(true) => println!("{verb} {input}"),
            Ok(false) => println!("skipped {input} (entry exists)"),
            Err(error) => {
                eprintln!("error: {input}: {error}");
                failed += 1;
            }
        }
    }
    Ok(if failed == 0 { 0 } else { 1 })
}

fn delete(args: &BatchArgs) -> FvResult<i32> {
    let inputs = args.collect_inputs()?;
    let tester = build_tester(
        &args.parser_dir,
        args.store_dir.clone(),
        Some(args.parser.clone()),
        None,
        FieldPolicy::with_default_exclusions(),
    )?;

    let removed = tester.remove_test_results(&args.parser, &inputs)?;
    for filename in &removed {
        println!("removed {filename}");
    }
    Ok(0)
}
