//! Command request type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Identifier shared by the decision and completion records of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A program path plus argument vector submitted on behalf of a requester.
///
/// The argument vector is handed to process creation verbatim; nothing in the
/// broker ever joins it back into a string for a shell. Fields are private so a
/// request cannot change between validation and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    id: RequestId,
    requester: String,
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandRequest {
    /// Create a request with a fresh [`RequestId`]
    pub fn new<I, S>(requester: impl Into<String>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: RequestId::new(),
            requester: requester.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            timeout: None,
        }
    }

    /// Set the working directory the program should start in
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Request a timeout; policy ceilings still apply
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    #[must_use]
    pub fn requester(&self) -> &str {
        &self.requester
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let a = CommandRequest::new("alice", "/bin/echo", ["hi"]);
        let b = CommandRequest::new("alice", "/bin/echo", ["hi"]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_builder_keeps_argv_verbatim() {
        let req = CommandRequest::new("svc", "/bin/echo", ["a b", "$(id)", "`x`"])
            .with_cwd("/tmp")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(req.args(), ["a b", "$(id)", "`x`"]);
        assert_eq!(req.cwd(), Some(Path::new("/tmp")));
        assert_eq!(req.timeout(), Some(Duration::from_secs(3)));
        assert_eq!(req.requester(), "svc");
    }
}
