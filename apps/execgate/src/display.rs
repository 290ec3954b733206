//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use execgate_policy::{PolicySet, ValidationOutcome};
use execgate_types::{AuditRecord, Decision, Outcome};
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};
use std::time::Duration;

/// Serializable view of one request's outcome
#[derive(Debug, Serialize)]
pub struct OutcomeReport<'a> {
    pub status: i32,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub timed_out: bool,
    pub truncated: bool,
}

impl<'a> OutcomeReport<'a> {
    pub fn new(outcome: &'a Outcome) -> Self {
        let mut report = Self {
            status: outcome.status_code(),
            outcome: outcome_name(outcome),
            exit_code: None,
            signal: None,
            reason: None,
            message: None,
            stdout: None,
            stderr: None,
            duration_ms: None,
            timed_out: false,
            truncated: false,
        };

        match outcome {
            Outcome::Completed(result) | Outcome::TimedOut(result) => {
                report.exit_code = Some(result.exit_code);
                report.signal = result.signal;
                report.stdout = Some(result.stdout_lossy());
                report.stderr = Some(result.stderr_lossy());
                report.duration_ms = Some(result.duration_ms());
                report.timed_out = result.timed_out;
                report.truncated = result.truncated();
            }
            Outcome::Denied(reason) => {
                report.reason = Some(reason.category());
                report.message = Some(reason.to_string());
            }
            Outcome::SpawnFailed { message } | Outcome::AuditUnavailable { message } => {
                report.message = Some(message.clone());
            }
        }
        report
    }
}

fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Completed(_) => "completed",
        Outcome::TimedOut(_) => "timed_out",
        Outcome::Denied(_) => "denied",
        Outcome::SpawnFailed { .. } => "spawn_failed",
        Outcome::AuditUnavailable { .. } => "audit_unavailable",
    }
}

/// Serializable view of a dry-run validation
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub allowed: bool,
    pub program: String,
    pub policy_generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckReport {
    pub fn new(
        program: &str,
        validation: &ValidationOutcome,
        timeout: Option<Duration>,
        policy_generation: u64,
    ) -> Self {
        let mut report = Self {
            allowed: validation.is_allowed(),
            program: program.to_string(),
            policy_generation,
            rule: None,
            timeout_ms: timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
            reason: None,
            message: None,
        };
        match validation {
            ValidationOutcome::Allowed { rule, .. } => report.rule = Some(rule.index),
            ValidationOutcome::Denied(reason) => {
                report.reason = Some(reason.category());
                report.message = Some(reason.to_string());
            }
        }
        report
    }
}

#[derive(Debug, Serialize)]
struct PolicyView<'a> {
    generation: u64,
    allowed_roots: Vec<Cow<'a, str>>,
    rules: Vec<RuleView<'a>>,
}

#[derive(Debug, Serialize)]
struct RuleView<'a> {
    index: usize,
    program: &'a str,
    args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ceiling_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> PolicyView<'a> {
    fn new(policy: &'a PolicySet) -> Self {
        Self {
            generation: policy.generation(),
            allowed_roots: policy
                .allowed_roots()
                .iter()
                .map(|root| root.to_string_lossy())
                .collect(),
            rules: policy
                .rules()
                .iter()
                .map(|rule| RuleView {
                    index: rule.index,
                    program: rule.program.as_str(),
                    args: rule.args.iter().map(ToString::to_string).collect(),
                    timeout_ceiling_secs: rule.timeout_ceiling.map(|d| d.as_secs()),
                    description: rule.description.as_deref(),
                })
                .collect(),
        }
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            term: Term::stdout(),
        }
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string(value).map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    /// Render the outcome of `run`: captured output verbatim, then a status line on stderr
    pub fn render_outcome(&self, outcome: &Outcome) -> io::Result<()> {
        if self.json_output {
            return Self::print_json(&OutcomeReport::new(outcome));
        }

        if let Some(result) = outcome.result() {
            io::stdout().write_all(&result.stdout)?;
            io::stdout().flush()?;
            io::stderr().write_all(&result.stderr)?;
        }

        let red = Style::new().red().bold();
        let yellow = Style::new().yellow();
        let stderr = Term::stderr();
        match outcome {
            Outcome::Completed(result) => {
                if result.truncated() {
                    stderr.write_line(&format!(
                        "{} output exceeded the capture limit and was truncated",
                        yellow.apply_to("warning:")
                    ))?;
                }
            }
            Outcome::TimedOut(result) => stderr.write_line(&format!(
                "{} killed after {} ms",
                red.apply_to("timed out:"),
                result.duration_ms()
            ))?,
            Outcome::Denied(reason) => {
                stderr.write_line(&format!("{} {reason}", red.apply_to("denied:")))?;
            }
            Outcome::SpawnFailed { message } => {
                stderr.write_line(&format!("{} {message}", red.apply_to("spawn failed:")))?;
            }
            Outcome::AuditUnavailable { message } => stderr.write_line(&format!(
                "{} {message}",
                red.apply_to("audit unavailable:")
            ))?,
        }
        Ok(())
    }

    /// Render a dry-run validation
    pub fn render_check(&self, report: &CheckReport) -> io::Result<()> {
        if self.json_output {
            return Self::print_json(report);
        }

        if report.allowed {
            let green = Style::new().green().bold();
            let timeout = report
                .timeout_ms
                .map(|ms| format!(", timeout {ms} ms"))
                .unwrap_or_default();
            self.term.write_line(&format!(
                "{} {} (rule #{}{timeout})",
                green.apply_to("allowed:"),
                report.program,
                report.rule.unwrap_or_default()
            ))
        } else {
            let red = Style::new().red().bold();
            self.term.write_line(&format!(
                "{} {}",
                red.apply_to("denied:"),
                report.message.as_deref().unwrap_or_default()
            ))
        }
    }

    /// Render the compiled policy
    pub fn render_policy(&self, policy: &PolicySet) -> io::Result<()> {
        if self.json_output {
            return Self::print_json(&PolicyView::new(policy));
        }

        let roots = if policy.allowed_roots().is_empty() {
            "(any)".to_string()
        } else {
            policy
                .allowed_roots()
                .iter()
                .map(|root| root.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        self.term.write_line(&format!("Allowed roots: {roots}"))?;

        if policy.rules().is_empty() {
            self.term
                .write_line("No rules defined; every request will be denied.")?;
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("#").add_attribute(Attribute::Bold),
                Cell::new("Program").add_attribute(Attribute::Bold),
                Cell::new("Arguments").add_attribute(Attribute::Bold),
                Cell::new("Ceiling").add_attribute(Attribute::Bold),
                Cell::new("Description").add_attribute(Attribute::Bold),
            ]);

        for rule in policy.rules() {
            let args = if rule.args.is_empty() {
                "(none)".to_string()
            } else {
                rule.args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            let ceiling = rule
                .timeout_ceiling
                .map_or_else(|| "-".to_string(), |d| format!("{}s", d.as_secs()));
            table.add_row(vec![
                Cell::new(rule.index),
                Cell::new(rule.program.as_str()).fg(Color::Cyan),
                Cell::new(args),
                Cell::new(ceiling),
                Cell::new(rule.description.as_deref().unwrap_or("")),
            ]);
        }

        println!("{table}");
        Ok(())
    }

    /// Render audit query results
    pub fn render_audit(&self, records: &[AuditRecord]) -> io::Result<()> {
        if self.json_output {
            for record in records {
                Self::print_json(record)?;
            }
            return Ok(());
        }

        if records.is_empty() {
            self.term.write_line("No audit records match.")?;
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Time").add_attribute(Attribute::Bold),
                Cell::new("Request").add_attribute(Attribute::Bold),
                Cell::new("Requester").add_attribute(Attribute::Bold),
                Cell::new("Phase").add_attribute(Attribute::Bold),
                Cell::new("Command").add_attribute(Attribute::Bold),
                Cell::new("Result").add_attribute(Attribute::Bold),
            ]);

        for record in records {
            let id = record.request_id.to_string();
            let short_id = id.get(..8).unwrap_or(&id).to_string();
            let command = if record.program.is_empty() {
                record.argv.join(" ")
            } else {
                shell_words::join(std::iter::once(&record.program).chain(&record.argv))
            };
            table.add_row(vec![
                Cell::new(record.timestamp.format("%Y-%m-%d %H:%M:%S")),
                Cell::new(short_id),
                Cell::new(&record.requester),
                Cell::new(format!("{:?}", record.phase).to_lowercase()),
                Cell::new(command),
                result_cell(record),
            ]);
        }

        println!("{table}");
        Ok(())
    }
}

fn result_cell(record: &AuditRecord) -> Cell {
    if record.decision == Decision::Denied {
        let reason = record.reason.as_deref().unwrap_or("denied");
        return Cell::new(format!("denied: {reason}")).fg(Color::Red);
    }
    if let Some(error) = &record.error {
        return Cell::new(format!("error: {error}")).fg(Color::Red);
    }
    if record.timed_out {
        return Cell::new("timed out").fg(Color::Yellow);
    }
    match record.exit_code {
        Some(0) => Cell::new("exit 0").fg(Color::Green),
        Some(code) => Cell::new(format!("exit {code}")).fg(Color::Yellow),
        None => Cell::new("allowed"),
    }
}
