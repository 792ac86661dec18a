// src/variables.rs
use indexmap::IndexMap;
use std::fmt;

/// Namespace a captured variable is bound into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Variables of the log entry itself (timestamp, host, proc, ...)
    Global,
    /// Variables contributed by the named driver
    Driver(String),
}

/// One entry of the composite pattern's key list; position N names capture group N+1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub name: String,
    pub scope: Scope,
}

impl Key {
    pub fn global(name: impl Into<String>) -> Self {
        Key {
            name: name.into(),
            scope: Scope::Global,
        }
    }

    pub fn driver(driver: impl Into<String>, name: impl Into<String>) -> Self {
        Key {
            name: name.into(),
            scope: Scope::Driver(driver.into()),
        }
    }

    /// Name under which the key is projected by default: drivers' keys are qualified.
    pub fn qualified_name(&self) -> String {
        match &self.scope {
            Scope::Global => self.name.clone(),
            Scope::Driver(driver) => format!("{}.{}", driver, self.name),
        }
    }
}

/// A variable reference as written in `--where` or `--select`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarRef<'a> {
    pub driver: Option<&'a str>,
    pub name: &'a str,
}

impl<'a> VarRef<'a> {
    /// `driver.name` is qualified; anything without a dot is bare.
    pub fn parse(reference: &'a str) -> Self {
        match reference.split_once('.') {
            Some((driver, name)) => VarRef {
                driver: Some(driver),
                name,
            },
            None => VarRef {
                driver: None,
                name: reference,
            },
        }
    }
}

impl fmt::Display for VarRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.driver {
            Some(driver) => write!(f, "{}.{}", driver, self.name),
            None => f.write_str(self.name),
        }
    }
}

/// Variables bound from one matched log line.
///
/// A `None` value marks an optional group that did not take part in the match.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    global: IndexMap<String, Option<String>>,
    drivers: IndexMap<String, IndexMap<String, Option<String>>>,
    active_driver: Option<String>,
}

impl ParsedLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` in `scope`; a later binding of the same name replaces the earlier one.
    pub fn insert(&mut self, scope: &Scope, name: impl Into<String>, value: Option<String>) {
        match scope {
            Scope::Global => {
                self.global.insert(name.into(), value);
            }
            Scope::Driver(driver) => {
                self.drivers
                    .entry(driver.clone())
                    .or_default()
                    .insert(name.into(), value);
            }
        }
    }

    pub fn set_active_driver(&mut self, driver: Option<String>) {
        self.active_driver = driver;
    }

    pub fn active_driver(&self) -> Option<&str> {
        self.active_driver.as_deref()
    }

    pub fn global(&self, name: &str) -> Option<&str> {
        self.global.get(name).and_then(|v| v.as_deref())
    }

    pub fn in_driver(&self, driver: &str, name: &str) -> Option<&str> {
        self.drivers
            .get(driver)
            .and_then(|vars| vars.get(name))
            .and_then(|v| v.as_deref())
    }

    /// Find the binding a reference names: explicit driver scope, then the
    /// active driver, then global.
    ///
    /// An explicit scope only counts when it names the active driver. The outer
    /// `None` means unresolved; `Some(None)` is a bound name whose group did not
    /// take part in the match.
    pub fn binding(&self, reference: &VarRef<'_>) -> Option<Option<&str>> {
        let active = self.active_driver.as_deref();
        if let Some(driver) = reference.driver {
            if Some(driver) != active {
                return None;
            }
            return self
                .drivers
                .get(driver)?
                .get(reference.name)
                .map(|v| v.as_deref());
        }
        let in_active = active
            .and_then(|driver| self.drivers.get(driver))
            .and_then(|vars| vars.get(reference.name));
        if let Some(value) = in_active {
            return Some(value.as_deref());
        }
        self.global.get(reference.name).map(|v| v.as_deref())
    }

    /// The value a reference names; unresolved and absent are both `None`.
    pub fn resolve(&self, reference: &VarRef<'_>) -> Option<&str> {
        self.binding(reference).flatten()
    }

    pub fn lookup(&self, reference: &str) -> Option<&str> {
        self.resolve(&VarRef::parse(reference))
    }
}

/// Zip captured groups against the key list, position by position.
///
/// Extra groups or extra keys are dropped silently, so a fragment whose group
/// count disagrees with its key count shifts every binding that follows it.
/// The active driver is the first of `drivers` with a present value.
pub fn bind<'t, I>(groups: I, keys: &[Key], drivers: &[String]) -> ParsedLine
where
    I: IntoIterator<Item = Option<&'t str>>,
{
    let mut line = ParsedLine::new();
    for (key, group) in keys.iter().zip(groups) {
        line.insert(&key.scope, key.name.as_str(), group.map(str::to_string));
    }
    let active = drivers
        .iter()
        .find(|driver| {
            line.drivers
                .get(driver.as_str())
                .is_some_and(|vars| vars.values().any(Option::is_some))
        })
        .cloned();
    line.set_active_driver(active);
    line
}
