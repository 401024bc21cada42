//! `oracle sign`: sign documents, store the artifact, and commit it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use clap::Args;
use oracle_core::{
    FormatKind, GitCliAnchor, MAX_VALIDITY_DAYS, ProvenanceAnchor, SignRequest,
    SpecificationContext, sign_and_anchor,
};

use super::{print_json, report_error};
use crate::exit_codes::{self, codes};
use crate::settings::{Settings, SignerFlags};

/// Arguments for `oracle sign`.
#[derive(Debug, Args)]
pub struct SignArgs {
    /// Documents to sign.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Signer email.
    #[arg(long)]
    pub email: Option<String>,

    /// Signer role.
    #[arg(long)]
    pub role: Option<String>,

    /// Reason for signing.
    #[arg(long)]
    pub reason: Option<String>,

    /// Additional paragraph for the commit message.
    #[arg(short = 'm', long = "message")]
    pub message: Option<String>,

    /// Signature format (defaults to the configured format).
    #[arg(long)]
    pub format: Option<FormatKind>,

    /// Validity window in days (defaults to the configured window).
    #[arg(
        long,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_VALIDITY_DAYS)),
    )]
    pub validity_days: Option<u32>,

    /// Specification version (defaults to the document's `version` key).
    #[arg(long)]
    pub spec_version: Option<String>,

    /// Specification status (defaults to the document's `status` key).
    #[arg(long)]
    pub spec_status: Option<String>,

    /// Related approval identifier (repeatable).
    #[arg(long = "approval")]
    pub approvals: Vec<String>,

    /// Write the artifact without committing it.
    #[arg(long)]
    pub no_commit: bool,

    /// Output JSON.
    #[arg(long)]
    pub json: bool,
}

/// Runs `oracle sign` and returns the exit code.
pub fn run_sign(args: &SignArgs, settings: &Settings) -> u8 {
    let json_output = args.json;

    let key = match settings.signing_key() {
        Ok(key) => key,
        Err(err) => return report_error(json_output, &format!("{err:#}"), codes::VALIDATION_ERROR),
    };
    let signer = match settings.resolve_signer(&SignerFlags {
        email: args.email.clone(),
        role: args.role.clone(),
        reason: args.reason.clone(),
    }) {
        Ok(signer) => signer,
        Err(err) => return report_error(json_output, &format!("{err:#}"), codes::VALIDATION_ERROR),
    };

    let documents: Vec<PathBuf> = args.paths.iter().map(|p| Settings::absolutize(p)).collect();
    let signing = &settings.config.signing;
    let validity_days = args.validity_days.unwrap_or(signing.validity_days);
    let context = documents
        .first()
        .map_or_else(SpecificationContext::default, |document| {
            specification_context(args, document)
        });

    let request = SignRequest {
        project_root: settings.project_root.clone(),
        documents,
        context,
        format: args.format.unwrap_or(signing.format),
        signer,
        validity: Duration::days(i64::from(validity_days)),
        message: args.message.clone(),
    };

    let anchor = GitCliAnchor::new(&settings.project_root);
    let anchor: Option<&dyn ProvenanceAnchor> = if args.no_commit { None } else { Some(&anchor) };

    match sign_and_anchor(&request, &key, anchor, Utc::now()) {
        Ok(outcome) => {
            if json_output {
                print_json(&outcome);
            } else if let Some(commit) = &outcome.commit {
                println!("{commit}");
            } else {
                println!("{}", outcome.signature_id);
            }
            codes::SUCCESS
        },
        Err(err) => {
            let code = exit_codes::for_workflow_error(&err);
            report_error(json_output, &err.to_string(), code)
        },
    }
}

/// Builds the specification context from flags, falling back to the
/// document's top-level YAML `version` and `status` keys.
fn specification_context(args: &SignArgs, document: &Path) -> SpecificationContext {
    let metadata = fs::read_to_string(document)
        .ok()
        .and_then(|text| serde_yaml::from_str::<serde_yaml::Value>(&text).ok());
    let field = |key: &str| -> Option<String> {
        let value = metadata.as_ref()?.as_mapping()?.get(key)?;
        match value {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    let defaults = SpecificationContext::default();
    SpecificationContext {
        version: args
            .spec_version
            .clone()
            .or_else(|| field("version"))
            .unwrap_or(defaults.version),
        status_at_signing: args
            .spec_status
            .clone()
            .or_else(|| field("status"))
            .unwrap_or(defaults.status_at_signing),
        related_approvals: args.approvals.clone(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: SignArgs,
    }

    #[test]
    fn test_validity_days_bounds() {
        for rejected in ["0", "36501", "4294967295"] {
            let result = TestCli::try_parse_from(["sign", "spec.md", "--validity-days", rejected]);
            assert!(result.is_err(), "{rejected} should be rejected");
        }

        let cli = TestCli::parse_from(["sign", "spec.md", "--validity-days", "36500"]);
        assert_eq!(cli.args.validity_days, Some(MAX_VALIDITY_DAYS));
    }

    #[test]
    fn test_context_from_yaml_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("spec.yaml");
        fs::write(&doc, "title: Auth\nversion: 1.2\nstatus: approved\n").unwrap();

        let cli = TestCli::parse_from(["sign", "spec.yaml", "--approval", "APR-7"]);
        let context = specification_context(&cli.args, &doc);
        assert_eq!(context.version, "1.2");
        assert_eq!(context.status_at_signing, "approved");
        assert_eq!(context.related_approvals, vec!["APR-7".to_string()]);
    }

    #[test]
    fn test_context_flags_win_and_markdown_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("spec.md");
        fs::write(&doc, "# Title\n\nSome text.\n").unwrap();

        let cli = TestCli::parse_from(["sign", "spec.md"]);
        let context = specification_context(&cli.args, &doc);
        assert_eq!(context, SpecificationContext::default());

        let cli = TestCli::parse_from(["sign", "spec.md", "--spec-version", "2.0.0"]);
        assert_eq!(specification_context(&cli.args, &doc).version, "2.0.0");
    }

    #[test]
    fn test_format_flag_parses() {
        let cli = TestCli::parse_from(["sign", "a.md", "b.md", "--format", "claim-bundle"]);
        assert_eq!(cli.args.format, Some(FormatKind::ClaimBundle));
        assert_eq!(cli.args.paths.len(), 2);
    }

    #[test]
    fn test_zero_validity_rejected() {
        assert!(TestCli::try_parse_from(["sign", "a.md", "--validity-days", "0"]).is_err());
    }
}
