//! `oracle verify`: check a document against its stored signature.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use oracle_core::{FormatKind, SignatureStatus, VerificationOutcome, verify_document};
use serde::Serialize;

use super::{print_json, report_error};
use crate::exit_codes::{self, codes};
use crate::settings::Settings;

/// Arguments for `oracle verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Document to verify.
    pub path: PathBuf,

    /// Output JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    document: String,
    valid: bool,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    status: SignatureStatus,
    signature_id: String,
    format: FormatKind,
    signer_email: String,
    signer_role: String,
    signing_reason: String,
    expires_at: DateTime<Utc>,
}

/// Runs `oracle verify` and returns the exit code.
pub fn run_verify(args: &VerifyArgs, settings: &Settings) -> u8 {
    let json_output = args.json;
    let key = match settings.signing_key() {
        Ok(key) => key,
        Err(err) => return report_error(json_output, &format!("{err:#}"), codes::VALIDATION_ERROR),
    };
    let document = Settings::absolutize(&args.path);
    let policy = settings.config.signing.expiration_policy();

    let now = Utc::now();
    let report = match verify_document(&settings.project_root, &document, &key, &policy, now) {
        Ok(report) => report,
        Err(err) => {
            let code = exit_codes::for_workflow_error(&err);
            return report_error(json_output, &err.to_string(), code);
        },
    };

    let (outcome, detail) = describe(&report.outcome);
    let valid = report.is_valid();
    if json_output {
        print_json(&VerifyResponse {
            document: args.path.display().to_string(),
            valid,
            outcome,
            detail,
            status: report.status,
            signature_id: report.signature_id.clone(),
            format: report.format,
            signer_email: report.signer.email.clone(),
            signer_role: report.signer.role.clone(),
            signing_reason: report.signer.signing_reason.clone(),
            expires_at: report.expires_at,
        });
    } else {
        let verdict = if valid { "valid" } else { "invalid" };
        println!("{verdict} ({})", report.status);
        println!("  Signature ID: {}", report.signature_id);
        println!("  Signer:       {} ({})", report.signer.email, report.signer.role);
        println!("  Reason:       {}", report.signer.signing_reason);
        println!("  Expires:      {}", report.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
        if let Some(detail) = &detail {
            println!("  Detail:       {detail}");
        }
    }

    match (valid, report.status) {
        (false, _) => codes::SIGNATURE_INVALID,
        (true, SignatureStatus::Expired) => codes::SIGNATURE_EXPIRED,
        (true, _) => codes::SUCCESS,
    }
}

fn describe(outcome: &VerificationOutcome) -> (&'static str, Option<String>) {
    match outcome {
        VerificationOutcome::Valid => ("valid", None),
        VerificationOutcome::MacMismatch => (
            "mac_mismatch",
            Some("signature does not match its claims under this key".to_string()),
        ),
        VerificationOutcome::ContentMismatch { path, .. } => (
            "content_mismatch",
            Some(format!("{path} changed since it was signed")),
        ),
        VerificationOutcome::NotCovered { path } => (
            "not_covered",
            Some(format!("{path} is not covered by the stored signature")),
        ),
    }
}
