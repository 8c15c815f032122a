//! # maxsat-ilp-tools - Command Line Interface for maxsat-ilp
//!
//! Helpers shared by the `maxsat-ilp` binary: logging setup, forwarded solver messages and
//! statistics rendered as comment lines.

use std::io::{self, Write};

use maxsat_ilp::{
    encoding::EncodingStats,
    solvers::{MessageLevel, SolverStats},
    timer::Timer,
};
use tracing::Level;

/// Maps the number of `-v` and `-q` flags to a log level. The default only shows warnings.
#[must_use]
pub fn log_level(verbose: u8, quiet: bool) -> Option<Level> {
    if quiet {
        return None;
    }
    Some(match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    })
}

/// Installs a log subscriber writing to `stderr`, since `stdout` carries the solver output
///
/// # Errors
///
/// If a global subscriber is already installed.
pub fn init_logging(level: Option<Level>) -> anyhow::Result<()> {
    let Some(level) = level else {
        return Ok(());
    };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Writes a solver message as `c` lines, prefixing warnings with `WARNING:`
///
/// # Errors
///
/// If writing fails.
pub fn write_message<W: Write>(writer: &mut W, level: MessageLevel, msg: &str) -> io::Result<()> {
    for line in msg.lines() {
        match level {
            MessageLevel::Info => writeln!(writer, "c {line}")?,
            MessageLevel::Warning => writeln!(writer, "c WARNING: {line}")?,
        }
    }
    writer.flush()
}

/// Writes encoding and solver statistics as `c` lines. These follow the status line, so a
/// failure to write them is only logged and does not change the outcome of the run.
pub fn write_stats<W: Write>(writer: &mut W, stats: &SolverStats, enc: &EncodingStats, timer: Timer) {
    if let Err(err) = try_write_stats(writer, stats, enc, timer) {
        tracing::warn!("failed to write statistics: {err}");
    }
}

fn try_write_stats<W: Write>(
    writer: &mut W,
    stats: &SolverStats,
    enc: &EncodingStats,
    timer: Timer,
) -> io::Result<()> {
    writeln!(
        writer,
        "c clauses: {} hard, {} soft, {} soft units folded",
        enc.n_hard, enc.n_soft, enc.n_folded_units
    )?;
    writeln!(
        writer,
        "c model: {} columns, {} rows, {} relaxation columns",
        stats.n_vars, stats.n_constraints, enc.n_relax_vars
    )?;
    writeln!(
        writer,
        "c search: {} nodes, {} incumbents, {:.6}s solve cpu time",
        stats.n_nodes,
        stats.n_incumbents,
        stats.cpu_solve_time.as_secs_f64()
    )?;
    writeln!(
        writer,
        "c total: wctime={:.6}s cputime={:.6}s",
        timer.wall_time().as_secs_f64(),
        timer.cpu_time().as_secs_f64()
    )?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use std::io;

    use maxsat_ilp::{
        encoding::EncodingStats,
        solvers::{MessageLevel, SolverStats},
        timer::Timer,
    };
    use tracing::Level;

    use super::{log_level, write_message, write_stats};

    #[test]
    fn levels() {
        assert_eq!(log_level(0, false), Some(Level::WARN));
        assert_eq!(log_level(2, false), Some(Level::DEBUG));
        assert_eq!(log_level(9, false), Some(Level::TRACE));
        assert_eq!(log_level(3, true), None);
    }

    #[test]
    fn message_lines() {
        let mut out = Vec::new();
        write_message(&mut out, MessageLevel::Info, "presolving\ndone\n").unwrap();
        write_message(&mut out, MessageLevel::Warning, "weak bound").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "c presolving\nc done\nc WARNING: weak bound\n"
        );
    }

    #[test]
    fn stats_lines() {
        let stats = SolverStats {
            n_nodes: 12,
            n_incumbents: 3,
            n_vars: 5,
            n_constraints: 4,
            ..SolverStats::default()
        };
        let enc = EncodingStats {
            n_hard: 2,
            n_soft: 3,
            n_folded_units: 1,
            n_relax_vars: 2,
            ..EncodingStats::default()
        };
        let mut out = Vec::new();
        write_stats(&mut out, &stats, &enc, Timer::start());
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|line| line.starts_with("c ")));
        assert_eq!(lines[0], "c clauses: 2 hard, 3 soft, 1 soft units folded");
        assert_eq!(lines[1], "c model: 5 columns, 4 rows, 2 relaxation columns");
        assert!(lines[2].starts_with("c search: 12 nodes, 3 incumbents"));
    }

    struct Closed;

    impl io::Write for Closed {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn stats_on_closed_output() {
        // returns normally, the outcome of the run stays untouched
        write_stats(
            &mut Closed,
            &SolverStats::default(),
            &EncodingStats::default(),
            Timer::start(),
        );
    }
}
