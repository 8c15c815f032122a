//! # maxsat-ilp
//!
//! Solves a weighted partial MaxSAT instance by encoding it as a 0-1 integer linear program and
//! running the branch-and-bound backend on it. Output follows the MaxSAT evaluation format on
//! `stdout`; diagnostics go to `stderr`.
//!
//! Usage: maxsat-ilp [OPTIONS] <INSTANCE>
//!
//! Exit codes: `0` if the instance was solved to optimality or shown unsatisfiable, `1` for
//! `s UNKNOWN` and every error.

use std::{
    io,
    path::PathBuf,
    process,
    thread,
    time::Duration,
};

use anyhow::Context;
use clap::{error::ErrorKind, Parser};
use maxsat_ilp::{
    encoding::{EncodeOptions, IlpEncoder},
    fio::dimacs,
    output::{self, Outcome},
    reporter::{IncumbentReporter, SolveContext},
    solvers::{
        ForwardMessages, Interrupt, InterruptSolver, LimitNodes, LimitTime, Mip, ReportIncumbents,
        SolveStats,
    },
    timer::Timer,
};
use maxsat_ilp_bnb::Solver;
use maxsat_ilp_tools::{init_logging, log_level, write_message, write_stats};
use signal_hook::{
    consts::{SIGINT, SIGTERM, SIGXCPU},
    iterator::Signals,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The DIMACS CNF or WCNF instance to solve
    instance: PathBuf,
    /// Wall-clock limit for the search in seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// Limit on the number of branch-and-bound nodes
    #[arg(long)]
    node_limit: Option<u64>,
    /// Encode soft unit clauses with a constraint and a relaxation variable instead of folding
    /// them into the objective
    #[arg(long)]
    no_unit_folding: bool,
    /// Disable the diving heuristic
    #[arg(long)]
    no_heuristics: bool,
    /// Increase the log level on `stderr`, can be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Disable logging
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let timer = Timer::start();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) {
                err.exit()
            }
            eprintln!("{err}");
            process::exit(1)
        }
    };
    match run(&args, timer) {
        Ok(outcome) => process::exit(outcome.exit_code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1)
        }
    }
}

fn run(args: &Args, timer: Timer) -> anyhow::Result<Outcome> {
    init_logging(log_level(args.verbose, args.quiet))?;

    let parser = dimacs::Parser::open(&args.instance)?;
    let header = *parser.header();
    tracing::info!(
        vars = header.n_vars,
        clauses = header.n_clauses,
        weighted = header.is_weighted(),
        "parsed header"
    );

    let mut solver = Solver::default();
    solver.set_heuristics(!args.no_heuristics);
    let time_limit = args
        .time_limit
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid time limit")?;
    solver.limit_time(time_limit)?;
    solver.limit_nodes(args.node_limit)?;

    let opts = EncodeOptions {
        fold_soft_units: !args.no_unit_folding,
    };
    let mut encoder = IlpEncoder::new(&mut solver, &header, opts)?;
    encoder
        .encode(parser)
        .with_context(|| format!("failed to encode {}", args.instance.display()))?;
    let encoding = encoder.finish();
    tracing::info!(stats = ?encoding.stats(), "built model");

    println!("c {} {}", env!("CARGO_BIN_NAME"), env!("CARGO_PKG_VERSION"));
    println!("c solver: {}", solver.signature());

    let ctx = SolveContext {
        origin: solver.problem_id(),
        timer,
    };
    let mut reporter = IncumbentReporter::new(ctx, io::stdout());
    solver.attach_incumbent_reporter(move |event| {
        reporter.report(event);
    });
    solver.attach_messenger(|level, msg| {
        if let Err(err) = write_message(&mut io::stdout().lock(), level, msg) {
            tracing::warn!("failed to forward solver message: {err}");
        }
    });

    let interrupter = solver.interrupter();
    let mut signals = Signals::new([SIGTERM, SIGINT, SIGXCPU])?;
    thread::spawn(move || {
        for sig in signals.forever() {
            tracing::info!(sig, "received signal, interrupting solver");
            interrupter.interrupt();
        }
    });

    let status = solver.solve().context("solving failed")?;
    tracing::info!(%status, "solver returned");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = output::write_result(&mut out, &solver, &encoding)?;
    write_stats(&mut out, &solver.stats(), encoding.stats(), timer);
    Ok(outcome)
}
