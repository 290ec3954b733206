//! Request validation against the active policy

use crate::rule::PolicyRule;
use crate::store::{PolicySet, PolicyStore};
use execgate_types::{CommandRequest, DenyReason};
use std::path::Path;
use std::sync::Arc;

/// Result of validating one request
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Allowed {
        rule: Arc<PolicyRule>,
        /// Policy generation the decision was made against
        generation: u64,
    },
    Denied(DenyReason),
}

impl ValidationOutcome {
    #[must_use]
    pub fn denial(&self) -> Option<&DenyReason> {
        match self {
            Self::Allowed { .. } => None,
            Self::Denied(reason) => Some(reason),
        }
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Checks requests in a fixed order; the first failing check wins:
///
/// 1. program path traversal (relative, `.`/`..` segment, NUL)
/// 2. program outside the allowed roots
/// 3. working directory traversal
/// 4. unknown program
/// 5. argument mismatch
#[derive(Debug, Clone)]
pub struct CommandValidator {
    store: Arc<PolicyStore>,
}

impl CommandValidator {
    #[must_use]
    pub fn new(store: Arc<PolicyStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<PolicyStore> {
        &self.store
    }

    /// Validate against the current policy snapshot
    #[must_use]
    pub fn validate(&self, request: &CommandRequest) -> ValidationOutcome {
        validate_against(&self.store.snapshot(), request)
    }
}

/// Validate `request` against a specific policy set
#[must_use]
pub fn validate_against(policy: &PolicySet, request: &CommandRequest) -> ValidationOutcome {
    let program = request.program();

    if let Err(reason) = check_path(program) {
        return ValidationOutcome::Denied(reason);
    }
    if !policy.within_allowed_roots(Path::new(program)) {
        return ValidationOutcome::Denied(DenyReason::OutsideAllowedRoot {
            path: program.to_string(),
        });
    }
    if let Some(cwd) = request.cwd() {
        if let Err(reason) = check_path(&cwd.to_string_lossy()) {
            return ValidationOutcome::Denied(reason);
        }
    }

    let candidates = policy.lookup(program);
    let Some(first) = candidates.first() else {
        return ValidationOutcome::Denied(DenyReason::UnknownProgram {
            program: program.to_string(),
        });
    };

    let mut first_mismatch = None;
    for rule in &candidates {
        match rule.check_args(request.args()) {
            Ok(()) => {
                return ValidationOutcome::Allowed {
                    rule: Arc::clone(rule),
                    generation: policy.generation(),
                }
            }
            Err(mismatch) => {
                first_mismatch.get_or_insert(mismatch);
            }
        }
    }

    let (position, detail) = first_mismatch
        .map(|m| (m.position, m.detail))
        .unwrap_or_default();
    ValidationOutcome::Denied(DenyReason::ArgumentMismatch {
        rule: first.index,
        position,
        detail,
    })
}

/// Lexical traversal check; no filesystem access
fn check_path(path: &str) -> Result<(), DenyReason> {
    let traversal = path.is_empty()
        || !path.starts_with('/')
        || path.contains('\0')
        || path.split('/').any(|segment| segment == ".." || segment == ".");
    if traversal {
        Err(DenyReason::PathTraversal {
            path: path.to_string(),
        })
    } else {
        Ok(())
    }
}
