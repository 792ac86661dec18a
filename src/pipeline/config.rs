// src/pipeline/config.rs
use crate::error::ConfigError;
use crate::where_clause::{WhereClause, OR_TOKEN};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

static NUMERIC_PID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
static NETWORK_ENDPOINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:tcp|udp|sctp):[0-9]+").unwrap());

/// Raw query options as they come off the command line
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub hostnames: Vec<String>,
    pub pid_specs: Vec<String>,
    pub regexps: Vec<String>,
    pub where_tokens: Vec<String>,
    pub select: Vec<String>,
    pub verbose: u8,
}

/// Immutable configuration for one run, shared by the assembler and scanner
#[derive(Debug, Clone, Default)]
pub struct GlossConfig {
    /// Host allow-list; empty matches any host
    pub hostnames: Vec<String>,
    /// Process name allow-list; empty matches any process
    pub procs: Vec<String>,
    /// Numeric pid allow-list; empty makes the pid optional
    pub pids: Vec<String>,
    /// Free-text requirements, any one of which must occur
    pub regexps: Vec<String>,
    pub where_clause: WhereClause,
    /// Variables to print; `None` prints every key
    pub select: Option<Vec<String>>,
    pub verbose: u8,
}

impl GlossConfig {
    pub fn from_parts(options: QueryOptions) -> Result<Self, ConfigError> {
        let where_clause = WhereClause::parse(&options.where_tokens)?;
        let pids = PidSelection::classify(&options.pid_specs)?;
        Ok(GlossConfig {
            hostnames: options.hostnames,
            procs: pids.procs,
            pids: pids.pids,
            regexps: options.regexps,
            where_clause,
            select: parse_select(&options.select),
            verbose: options.verbose,
        })
    }
}

/// `--pid` values sorted into numeric pids and process names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidSelection {
    pub pids: Vec<String>,
    pub procs: Vec<String>,
}

impl PidSelection {
    /// A spec starting with `/` names a pid file, read once and trimmed.
    /// Only an all-digit value counts as a pid; anything else is a process name.
    /// `tcp:`, `udp:` and `sctp:` endpoints are refused.
    pub fn classify<S: AsRef<str>>(specs: &[S]) -> Result<Self, ConfigError> {
        let mut selection = PidSelection::default();
        for spec in specs {
            let spec = spec.as_ref();
            let value = if spec.starts_with('/') {
                std::fs::read_to_string(spec)
                    .map_err(|source| ConfigError::PidFile {
                        path: PathBuf::from(spec),
                        source,
                    })?
                    .trim()
                    .to_string()
            } else if NETWORK_ENDPOINT.is_match(spec) {
                return Err(ConfigError::UnsupportedPidEndpoint(spec.to_string()));
            } else {
                spec.to_string()
            };
            if NUMERIC_PID.is_match(&value) {
                selection.pids.push(value);
            } else {
                selection.procs.push(value);
            }
        }
        Ok(selection)
    }
}

/// Split `--select` values on `=`, dropping empty names.
/// Returns `None` when nothing was selected.
pub fn parse_select<S: AsRef<str>>(values: &[S]) -> Option<Vec<String>> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .flat_map(|value| value.as_ref().split('='))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Merge `--where` tokens and `--or` markers back into command-line order.
/// Both carry the argument index they were found at.
pub fn interleave_where(tokens: Vec<(usize, String)>, or_positions: Vec<usize>) -> Vec<String> {
    let mut merged: Vec<(usize, String)> = tokens;
    merged.extend(
        or_positions
            .into_iter()
            .map(|index| (index, OR_TOKEN.to_string())),
    );
    merged.sort_by_key(|(index, _)| *index);
    merged.into_iter().map(|(_, token)| token).collect()
}
