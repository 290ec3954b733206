//! Command-line splitting
//!
//! Quotes and backslashes group words the way a POSIX shell would; nothing
//! is expanded. `;`, `|`, `&`, `$()`, backticks and redirections stay literal
//! characters inside the word they appear in.

use execgate_types::{CommandRequest, DenyReason};

/// Split `line` into a request; the first word is the program path
///
/// # Errors
///
/// Returns `DenyReason::MalformedCommandLine` for unbalanced quotes, a
/// trailing escape, or a line with no words.
pub fn parse_command_line(
    line: &str,
    requester: impl Into<String>,
) -> Result<CommandRequest, DenyReason> {
    let mut words = shell_words::split(line)
        .map_err(|e| DenyReason::MalformedCommandLine {
            message: e.to_string(),
        })?
        .into_iter();

    let program = words
        .next()
        .ok_or_else(|| DenyReason::MalformedCommandLine {
            message: "empty command line".to_string(),
        })?;

    Ok(CommandRequest::new(requester, program, words))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_metacharacters_stay_in_one_word() {
        let req = parse_command_line(r#"/bin/echo "hello;rm -rf /""#, "svc").unwrap();
        assert_eq!(req.program(), "/bin/echo");
        assert_eq!(req.args(), ["hello;rm -rf /"]);
        assert_eq!(req.requester(), "svc");
    }

    #[test]
    fn test_unquoted_operators_are_plain_words() {
        let req = parse_command_line("/bin/echo a | /bin/cat && $(id)", "svc").unwrap();
        assert_eq!(req.args(), ["a", "|", "/bin/cat", "&&", "$(id)"]);
    }

    #[test]
    fn test_malformed() {
        let err = parse_command_line("/bin/echo 'unterminated", "svc").unwrap_err();
        assert_eq!(err.category(), "malformed command line");
        let err = parse_command_line("   ", "svc").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
