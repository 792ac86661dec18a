use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::io::{self, Write};
use std::path::PathBuf;

use gloss::config::interleave_where;
use gloss::driver::default_logfiles;
use gloss::{assemble, logging, DriverRegistry, GlossConfig, LineScanner, QueryOptions};

#[derive(Parser, Debug)]
#[command(name = "gloss")]
#[command(about = "Grep Logs on Open Source Systems -- helps to gloss over logs")]
#[command(
    long_about = "Log files are long and detailed; this tool structures their contents into \
variables and selects entries on them. Each selected entry is printed as name=value lines \
followed by a blank line."
)]
#[command(version)]
#[command(disable_help_flag = true)]
struct Args {
    /// Print help (-h selects hostnames)
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Logfile to gloss over; repeatable, "-" reads stdin [default: the drivers'
    /// logfiles, else /var/log/syslog and /var/log/messages]
    #[arg(short = 'f', long = "logfile", value_name = "PATH", action = ArgAction::Append)]
    logfiles: Vec<PathBuf>,

    /// Pid, path to a file holding a pid, or program name to match; repeatable
    #[arg(short = 'p', long = "pid", visible_alias = "proc", value_name = "SPEC", action = ArgAction::Append)]
    pids: Vec<String>,

    /// Logging host name to match; repeatable, any one may match
    #[arg(short = 'h', long = "hostname", value_name = "NAME", action = ArgAction::Append)]
    hostnames: Vec<String>,

    /// Driver for a program's log format, applied in the order given
    #[arg(short = 'd', long = "driver", value_name = "NAME", action = ArgAction::Append)]
    drivers: Vec<String>,

    /// YAML file declaring additional drivers
    #[arg(long = "driver-file", value_name = "PATH")]
    driver_file: Option<PathBuf>,

    /// Variables to display, individually or separated by "=" [default: all]
    #[arg(short = 's', long = "select", value_name = "VARS", action = ArgAction::Append)]
    select: Vec<String>,

    /// Require VAR=VALUE, or VAR!=VALUE for a mismatch; repeated tests must all hold
    #[arg(
        short = 'w',
        long = "where",
        value_name = "VAR[!]=VALUE",
        action = ArgAction::Append,
        allow_hyphen_values = true
    )]
    where_clauses: Vec<String>,

    /// Separate where-clauses; a line already satisfying the tests before an
    /// --or is selected without looking further
    #[arg(
        short = 'o',
        long = "or",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "OR",
        value_parser = ["OR"],
        action = ArgAction::Append
    )]
    or_markers: Vec<String>,

    /// Regexp required in the free-form text; when repeated, ANY one of them
    /// suffices (they are alternatives, not additional requirements)
    #[arg(short = 'r', long = "regexp", value_name = "RE", action = ArgAction::Append)]
    regexps: Vec<String>,

    /// Report lines that do not match the log format (counts as a warning)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Show debug diagnostics on stderr
    #[arg(long)]
    debug: bool,
}

/// `--where` and `--or` in the order they appeared on the command line
fn where_tokens(matches: &ArgMatches) -> Vec<String> {
    let tokens = match (
        matches.indices_of("where_clauses"),
        matches.get_many::<String>("where_clauses"),
    ) {
        (Some(indices), Some(values)) => indices.zip(values.cloned()).collect(),
        _ => Vec::new(),
    };
    let or_positions = matches
        .indices_of("or_markers")
        .map(|indices| indices.collect())
        .unwrap_or_default();
    interleave_where(tokens, or_positions)
}

fn main() {
    let matches = Args::command().get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };
    logging::init(args.debug);

    let where_tokens = where_tokens(&matches);
    match run(args, where_tokens) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("gloss: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args, where_tokens: Vec<String>) -> anyhow::Result<i32> {
    let mut registry = DriverRegistry::with_builtins();
    if let Some(path) = &args.driver_file {
        registry.load_file(path)?;
    }
    let drivers = registry.select(&args.drivers)?;

    let config = GlossConfig::from_parts(QueryOptions {
        hostnames: args.hostnames,
        pid_specs: args.pids,
        regexps: args.regexps,
        where_tokens,
        select: args.select,
        verbose: args.verbose,
    })?;
    let pattern = assemble(&config, &drivers)?;

    let logfiles = if args.logfiles.is_empty() {
        default_logfiles(&drivers)
    } else {
        args.logfiles
    };

    let stdout = io::stdout();
    let mut output = io::BufWriter::new(stdout.lock());
    let mut scanner = LineScanner::new(&config, &pattern);
    for logfile in &logfiles {
        scanner.scan_source(logfile, &mut output)?;
    }
    output.flush()?;

    let stats = scanner.finish();
    tracing::debug!(
        sources = stats.sources_scanned,
        skipped = stats.sources_skipped,
        lines = stats.lines_read,
        matched = stats.lines_matched,
        selected = stats.entries_selected,
        warnings = stats.warnings,
        elapsed = ?stats.processing_time,
        "scan complete"
    );
    Ok(stats.exit_code())
}
