// src/driver.rs
//
// Drivers describe how one log producer (postfix, sshd, ...) writes its
// messages. They contribute fragments to the composite pattern and get a
// variable scope of their own, named after the driver.

use crate::error::ConfigError;
use crate::fragment::{Fragment, Placement};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Logfiles scanned when neither `--logfile` nor any driver names one
pub const FALLBACK_LOGFILES: &[&str] = &["/var/log/syslog", "/var/log/messages"];

pub trait Driver {
    fn name(&self) -> &str;

    fn fragments(&self) -> Vec<Fragment>;

    /// Logfiles this producer usually writes to
    fn default_logfiles(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Postfix MTA: picks the queue id off the front of the message.
pub struct PostfixDriver;

impl Driver for PostfixDriver {
    fn name(&self) -> &str {
        "postfix"
    }

    fn fragments(&self) -> Vec<Fragment> {
        vec![Fragment::new(r"(?:([0-9A-F]{6,}|NOQUEUE): +)?", ["queueid"])
            .with_placement(Placement::After)]
    }

    fn default_logfiles(&self) -> Vec<PathBuf> {
        vec![PathBuf::from("/var/log/mail.log")]
    }
}

#[derive(Debug, Deserialize)]
struct DriverFile {
    #[serde(default)]
    drivers: Vec<DeclaredDriver>,
}

#[derive(Debug, Deserialize)]
struct FragmentDecl {
    pattern: String,
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    placement: Placement,
}

/// A driver declared in a YAML driver file
#[derive(Debug, Deserialize)]
pub struct DeclaredDriver {
    name: String,
    #[serde(default)]
    logfiles: Vec<PathBuf>,
    #[serde(default)]
    fragments: Vec<FragmentDecl>,
}

impl Driver for DeclaredDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn fragments(&self) -> Vec<Fragment> {
        self.fragments
            .iter()
            .map(|decl| {
                Fragment::new(decl.pattern.clone(), decl.keys.iter().cloned())
                    .with_placement(decl.placement)
            })
            .collect()
    }

    fn default_logfiles(&self) -> Vec<PathBuf> {
        self.logfiles.clone()
    }
}

/// All drivers known to this run, in registration order
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<Box<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        DriverRegistry {
            drivers: vec![Box::new(PostfixDriver)],
        }
    }

    pub fn register(&mut self, driver: Box<dyn Driver>) -> Result<(), ConfigError> {
        if self.get(driver.name()).is_some() {
            return Err(ConfigError::DuplicateDriver(driver.name().to_string()));
        }
        tracing::debug!(driver = driver.name(), "registered driver");
        self.drivers.push(driver);
        Ok(())
    }

    /// Register every driver declared in a YAML document.
    /// `path` is only used for error messages.
    pub fn load_yaml(&mut self, path: &Path, content: &str) -> Result<(), ConfigError> {
        let file: DriverFile =
            serde_yaml::from_str(content).map_err(|e| ConfigError::DriverFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        for driver in file.drivers {
            if driver.name.is_empty() || driver.name.contains('.') {
                return Err(ConfigError::DriverFile {
                    path: path.to_path_buf(),
                    message: format!("invalid driver name '{}'", driver.name),
                });
            }
            for fragment in driver.fragments() {
                if !fragment.is_aligned()? {
                    tracing::warn!(
                        driver = %driver.name,
                        pattern = fragment.pattern(),
                        keys = ?fragment.keys(),
                        "fragment capture groups do not match its keys"
                    );
                }
            }
            self.register(Box::new(driver))?;
        }
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DriverFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.load_yaml(path, &content)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Driver> {
        self.drivers
            .iter()
            .find(|driver| driver.name() == name)
            .map(|driver| &**driver)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.iter().map(|driver| driver.name())
    }

    /// Look up the drivers enabled with `--driver`, keeping their order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&dyn Driver>, ConfigError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .ok_or_else(|| ConfigError::UnknownDriver(name.to_string()))
            })
            .collect()
    }
}

/// Logfiles to scan when none were given: the drivers' defaults, or the
/// system logs when the drivers name none.
pub fn default_logfiles(drivers: &[&dyn Driver]) -> Vec<PathBuf> {
    let mut logfiles: Vec<PathBuf> = Vec::new();
    for path in drivers.iter().flat_map(|driver| driver.default_logfiles()) {
        if !logfiles.contains(&path) {
            logfiles.push(path);
        }
    }
    if logfiles.is_empty() {
        logfiles = FALLBACK_LOGFILES.iter().map(PathBuf::from).collect();
    }
    logfiles
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSHD_YAML: &str = r#"
drivers:
  - name: sshd
    logfiles: [/var/log/auth.log]
    fragments:
      - pattern: '(?:(Accepted|Failed) \S+ for (\S+) from )?'
        keys: [outcome, user]
  - name: prefix
    fragments:
      - pattern: '<([0-9]+)>'
        keys: [priority]
        placement: before
"#;

    #[test]
    fn test_builtin_postfix() {
        let registry = DriverRegistry::with_builtins();
        let postfix = registry.get("postfix").unwrap();
        let fragments = postfix.fragments();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].keys(), ["queueid"]);
        assert!(fragments[0].is_aligned().unwrap());
    }

    #[test]
    fn test_load_yaml_drivers() {
        let mut registry = DriverRegistry::with_builtins();
        registry
            .load_yaml(Path::new("drivers.yaml"), SSHD_YAML)
            .unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["postfix", "sshd", "prefix"]
        );

        let sshd = registry.get("sshd").unwrap();
        assert_eq!(sshd.fragments()[0].keys(), ["outcome", "user"]);
        assert_eq!(sshd.fragments()[0].placement(), Placement::After);
        assert_eq!(sshd.default_logfiles(), vec![PathBuf::from("/var/log/auth.log")]);

        let prefix = registry.get("prefix").unwrap();
        assert_eq!(prefix.fragments()[0].placement(), Placement::Before);
    }

    #[test]
    fn test_load_yaml_rejects_bad_pattern() {
        let mut registry = DriverRegistry::new();
        let yaml = "drivers:\n  - name: broken\n    fragments:\n      - pattern: '(oops'\n        keys: [x]\n";
        assert!(matches!(
            registry.load_yaml(Path::new("d.yaml"), yaml),
            Err(ConfigError::FragmentPattern { .. })
        ));
    }

    #[test]
    fn test_load_yaml_rejects_malformed_document() {
        let mut registry = DriverRegistry::new();
        assert!(matches!(
            registry.load_yaml(Path::new("d.yaml"), "drivers: [name: 1"),
            Err(ConfigError::DriverFile { .. })
        ));
    }

    #[test]
    fn test_duplicate_driver_names() {
        let mut registry = DriverRegistry::with_builtins();
        let yaml = "drivers:\n  - name: postfix\n";
        assert!(matches!(
            registry.load_yaml(Path::new("d.yaml"), yaml),
            Err(ConfigError::DuplicateDriver(name)) if name == "postfix"
        ));
    }

    #[test]
    fn test_dotted_driver_name_rejected() {
        let mut registry = DriverRegistry::new();
        let yaml = "drivers:\n  - name: a.b\n";
        assert!(registry.load_yaml(Path::new("d.yaml"), yaml).is_err());
    }

    #[test]
    fn test_select_keeps_order_and_rejects_unknown() {
        let mut registry = DriverRegistry::with_builtins();
        registry
            .load_yaml(Path::new("drivers.yaml"), SSHD_YAML)
            .unwrap();
        let selected = registry.select(&["sshd", "postfix"]).unwrap();
        let names: Vec<&str> = selected.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["sshd", "postfix"]);

        assert!(matches!(
            registry.select(&["nosuch"]),
            Err(ConfigError::UnknownDriver(name)) if name == "nosuch"
        ));
    }

    #[test]
    fn test_default_logfiles() {
        assert_eq!(
            default_logfiles(&[]),
            vec![
                PathBuf::from("/var/log/syslog"),
                PathBuf::from("/var/log/messages")
            ]
        );

        let postfix = PostfixDriver;
        let drivers = vec![&postfix as &dyn Driver, &postfix];
        assert_eq!(
            default_logfiles(&drivers),
            vec![PathBuf::from("/var/log/mail.log")]
        );
    }
}
