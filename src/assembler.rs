// src/assembler.rs
use crate::driver::Driver;
use crate::error::ConfigError;
use crate::fragment::{Fragment, Placement};
use crate::pipeline::config::GlossConfig;
use crate::variables::{bind, Key, ParsedLine, Scope};
use regex::{Captures, Regex};

const MONTHS: &[&str] = &[
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// `Oct 12 03:14:15` as month, day and time
pub fn timestamp_fragment() -> Fragment {
    Fragment::new(
        format!(
            r"({}) +([1-9]|[12][0-9]|3[01]) ((?:[01][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9])",
            MONTHS.join("|")
        ),
        ["month", "day", "time"],
    )
}

pub fn host_fragment(hostnames: &[String]) -> Fragment {
    let pattern = if hostnames.is_empty() {
        r"([^ ]+)".to_string()
    } else {
        literal_alternation(hostnames)
    };
    Fragment::new(pattern, ["host"])
}

pub fn proc_fragment(procs: &[String]) -> Fragment {
    let pattern = if procs.is_empty() {
        r"([^:]*[^:\]])".to_string()
    } else {
        literal_alternation(procs)
    };
    Fragment::new(pattern, ["proc"])
}

/// Without a pid list the bracketed pid may be missing altogether.
pub fn pid_fragment(pids: &[String]) -> Fragment {
    let pattern = if pids.is_empty() {
        r"(?:\[([0-9]+)\])?".to_string()
    } else {
        format!(r"\[{}\]", literal_alternation(pids))
    };
    Fragment::new(pattern, ["pid"])
}

/// Rest of the line. Several regexps form an alternation: a line
/// qualifies when any one of them occurs in its free text.
pub fn free_text_fragment(regexps: &[String]) -> Fragment {
    let pattern = if regexps.is_empty() {
        "(.*)".to_string()
    } else {
        format!("(.*{}.*)", regexps.join(".*|.*"))
    };
    Fragment::new(pattern, ["logentry"])
}

fn literal_alternation(names: &[String]) -> String {
    let escaped: Vec<String> = names.iter().map(|name| regex::escape(name)).collect();
    format!("({})", escaped.join("|"))
}

/// Builds a composite pattern one fragment at a time, keeping the key list
/// next to the regex source so group N always has key N-1.
#[derive(Debug, Default)]
pub struct CompositeBuilder {
    source: String,
    keys: Vec<Key>,
    drivers: Vec<String>,
    misaligned: Vec<String>,
}

impl CompositeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Precedence of drivers when choosing a line's active driver. Drivers
    /// only seen through their fragments rank after these, in key order.
    pub fn driver_order<I, S>(&mut self, drivers: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for driver in drivers {
            self.note_driver(driver.into());
        }
        self
    }

    fn note_driver(&mut self, driver: String) {
        if !self.drivers.contains(&driver) {
            self.drivers.push(driver);
        }
    }

    /// Append regex text that contributes no capture groups.
    pub fn separator(&mut self, literal: &str) -> &mut Self {
        self.source.push_str(literal);
        self
    }

    pub fn fragment(&mut self, fragment: &Fragment, scope: &Scope) -> Result<&mut Self, ConfigError> {
        if !fragment.is_aligned()? {
            tracing::warn!(
                pattern = fragment.pattern(),
                keys = ?fragment.keys(),
                "fragment capture groups do not match its keys; later variables will shift"
            );
            self.misaligned.push(fragment.pattern().to_string());
        }
        self.source.push_str("(?:");
        self.source.push_str(fragment.pattern());
        self.source.push(')');
        if let Scope::Driver(driver) = scope {
            self.note_driver(driver.clone());
        }
        self.keys.extend(fragment.keys().iter().map(|name| Key {
            name: name.clone(),
            scope: scope.clone(),
        }));
        Ok(self)
    }

    /// Anchor at both ends and compile.
    pub fn build(&self) -> Result<CompositePattern, ConfigError> {
        let regex = Regex::new(&format!("^{}$", self.source))?;
        Ok(CompositePattern {
            regex,
            keys: self.keys.clone(),
            drivers: self.drivers.clone(),
            misaligned: self.misaligned.clone(),
        })
    }
}

/// The single pattern every log line is matched against
#[derive(Debug, Clone)]
pub struct CompositePattern {
    regex: Regex,
    keys: Vec<Key>,
    drivers: Vec<String>,
    misaligned: Vec<String>,
}

impl CompositePattern {
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Drivers in precedence order
    pub fn drivers(&self) -> &[String] {
        &self.drivers
    }

    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// False when some fragment's groups and keys disagree in number
    pub fn is_aligned(&self) -> bool {
        self.misaligned.is_empty() && self.group_count() == self.keys.len()
    }

    pub fn captures<'t>(&self, line: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(line)
    }

    /// Bind a match's groups against the key list.
    pub fn bind(&self, caps: &Captures<'_>) -> ParsedLine {
        bind(
            caps.iter().skip(1).map(|m| m.map(|m| m.as_str())),
            &self.keys,
            &self.drivers,
        )
    }

    /// Every key in fragment order, driver keys qualified by their driver
    pub fn default_projection(&self) -> Vec<String> {
        self.keys.iter().map(Key::qualified_name).collect()
    }
}

/// Assemble `[before] TIMESTAMP HOST PROC[PID]: +[after]FREETEXT` from the
/// configuration and the enabled drivers.
pub fn assemble(config: &GlossConfig, drivers: &[&dyn Driver]) -> Result<CompositePattern, ConfigError> {
    let mut before = Vec::new();
    let mut after = Vec::new();
    for driver in drivers {
        let scope = Scope::Driver(driver.name().to_string());
        for fragment in driver.fragments() {
            match fragment.placement() {
                Placement::Before => before.push((fragment, scope.clone())),
                Placement::After => after.push((fragment, scope.clone())),
            }
        }
    }

    let mut builder = CompositeBuilder::new();
    builder.driver_order(drivers.iter().map(|driver| driver.name()));
    for (fragment, scope) in &before {
        builder.fragment(fragment, scope)?;
    }
    builder
        .fragment(&timestamp_fragment(), &Scope::Global)?
        .separator(" ")
        .fragment(&host_fragment(&config.hostnames), &Scope::Global)?
        .separator(" ")
        .fragment(&proc_fragment(&config.procs), &Scope::Global)?
        .fragment(&pid_fragment(&config.pids), &Scope::Global)?
        .separator(": +");
    for (fragment, scope) in &after {
        builder.fragment(fragment, scope)?;
    }
    builder.fragment(&free_text_fragment(&config.regexps), &Scope::Global)?;

    let pattern = builder.build()?;
    tracing::debug!(pattern = pattern.as_str(), keys = pattern.keys().len(), "assembled log line pattern");
    Ok(pattern)
}
