//! Active policy set and atomic reload

use crate::rule::PolicyRule;
use execgate_config::PolicyConfig;
use execgate_errors::{ConfigError, Error};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Immutable, compiled policy
#[derive(Debug, Default)]
pub struct PolicySet {
    generation: u64,
    allowed_roots: Vec<PathBuf>,
    rules: Vec<Arc<PolicyRule>>,
}

impl PolicySet {
    /// Compile a raw policy section
    ///
    /// The whole set is rejected if any rule or root is invalid.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRule` or `ConfigError::InvalidRoot`.
    pub fn compile(config: &PolicyConfig) -> Result<Self, Error> {
        let mut allowed_roots = Vec::with_capacity(config.allowed_roots.len());
        for root in &config.allowed_roots {
            let relative_or_dotted = !root.is_absolute()
                || root
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::CurDir));
            if relative_or_dotted {
                return Err(ConfigError::InvalidRoot {
                    root: root.display().to_string(),
                    message: "must be an absolute path without '.' or '..'".to_string(),
                }
                .into());
            }
            allowed_roots.push(root.clone());
        }

        let rules = config
            .rules
            .iter()
            .enumerate()
            .map(|(index, raw)| PolicyRule::compile(index, raw).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            generation: 0,
            allowed_roots,
            rules,
        })
    }

    /// Rules whose program pattern matches `program`, in file order
    #[must_use]
    pub fn lookup(&self, program: &str) -> Vec<Arc<PolicyRule>> {
        self.rules
            .iter()
            .filter(|rule| rule.program.matches(program))
            .cloned()
            .collect()
    }

    /// Whether `path` lies under an allowed root (always true with no roots configured)
    #[must_use]
    pub fn within_allowed_roots(&self, path: &Path) -> bool {
        self.allowed_roots.is_empty() || self.allowed_roots.iter().any(|root| path.starts_with(root))
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn rules(&self) -> &[Arc<PolicyRule>] {
        &self.rules
    }

    #[must_use]
    pub fn allowed_roots(&self) -> &[PathBuf] {
        &self.allowed_roots
    }
}

/// Holder of the active [`PolicySet`]
///
/// Readers clone the inner `Arc` and never observe a half-applied reload.
/// A reload compiles the new set off to the side and swaps the pointer; in-flight
/// validations keep the snapshot they started with.
#[derive(Debug)]
pub struct PolicyStore {
    active: RwLock<Arc<PolicySet>>,
}

impl PolicyStore {
    /// Compile `config` as generation 1
    ///
    /// # Errors
    ///
    /// Returns an error if the policy does not compile.
    pub fn new(config: &PolicyConfig) -> Result<Self, Error> {
        let mut set = PolicySet::compile(config)?;
        set.generation = 1;
        Ok(Self {
            active: RwLock::new(Arc::new(set)),
        })
    }

    /// Current policy set
    #[must_use]
    pub fn snapshot(&self) -> Arc<PolicySet> {
        // The guarded value is a single pointer; a poisoned lock still holds a valid one.
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Rules for `program` in the active set
    #[must_use]
    pub fn lookup(&self, program: &str) -> Vec<Arc<PolicyRule>> {
        self.snapshot().lookup(program)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// Replace the active set with a freshly compiled one
    ///
    /// Returns the new generation. Reloading identical contents yields
    /// identical lookup results.
    ///
    /// # Errors
    ///
    /// Returns the compile error and leaves the active set untouched.
    pub fn reload(&self, config: &PolicyConfig) -> Result<u64, Error> {
        let mut set = PolicySet::compile(config)?;
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        set.generation = active.generation + 1;
        let generation = set.generation;
        *active = Arc::new(set);
        drop(active);

        tracing::debug!(generation, "policy swapped");
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execgate_config::{ArgSpec, RuleConfig};

    fn config(programs: &[&str]) -> PolicyConfig {
        PolicyConfig {
            allowed_roots: vec![PathBuf::from("/bin"), PathBuf::from("/usr/bin")],
            rules: programs
                .iter()
                .map(|p| RuleConfig {
                    program: (*p).to_string(),
                    args: vec![ArgSpec::Literal("**".into())],
                    timeout_ceiling_secs: None,
                    description: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_lookup_preserves_file_order() {
        let store = PolicyStore::new(&config(&["/usr/bin/git*", "/usr/bin/git"])).unwrap();
        let rules = store.lookup("/usr/bin/git");
        assert_eq!(rules.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1]);
        assert!(store.lookup("/bin/rm").is_empty());
    }

    #[test]
    fn test_failed_reload_keeps_active_set() {
        let store = PolicyStore::new(&config(&["/bin/echo"])).unwrap();
        let err = store.reload(&config(&["relative/echo"])).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidRule { .. })));
        assert_eq!(store.generation(), 1);
        assert_eq!(store.lookup("/bin/echo").len(), 1);
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let store = PolicyStore::new(&config(&["/bin/echo"])).unwrap();
        let before = store.snapshot();
        assert_eq!(store.reload(&config(&[])).unwrap(), 2);
        assert_eq!(before.lookup("/bin/echo").len(), 1);
        assert!(store.lookup("/bin/echo").is_empty());
    }

    #[test]
    fn test_roots_compare_by_component() {
        let set = PolicySet::compile(&config(&[])).unwrap();
        assert!(set.within_allowed_roots(Path::new("/usr/bin/env")));
        assert!(!set.within_allowed_roots(Path::new("/usr/binx/env")));
        assert!(!set.within_allowed_roots(Path::new("/sbin/reboot")));
    }

    #[test]
    fn test_relative_root_rejected() {
        let mut cfg = config(&[]);
        cfg.allowed_roots.push(PathBuf::from("opt/bin"));
        let err = PolicySet::compile(&cfg).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidRoot { .. })));
    }
}
