//! Logging setup for the command line front end

use std::io::{IsTerminal, Write};

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Initialize logging on stderr. `RUST_LOG` overrides the default level.
///
/// stdout carries response JSON, so nothing here ever writes to it.
pub fn init_logging(quiet: bool, debug: bool) {
    let default_level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let color = std::io::stderr().is_terminal();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    builder.target(env_logger::Target::Stderr);
    if color {
        builder.format(|buf, record| {
            let (pre, label, post) = level_style(record.level(), true);
            writeln!(
                buf,
                "{} [{pre}{label}{post}] {}",
                buf.timestamp_millis(),
                record.args()
            )
        });
    } else {
        // Non-TTY: no ANSI colors, the aggregator adds its own timestamps
        builder.format(|buf, record| {
            let (_, label, _) = level_style(record.level(), false);
            writeln!(buf, "[{label}] {}", record.args())
        });
    }
    // A second init (tests, embedding) keeps the first logger
    let _ = builder.try_init();
}
