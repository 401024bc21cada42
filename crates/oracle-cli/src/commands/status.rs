//! `oracle status`: show the expiration status of a stored signature.
//!
//! Content is not checked and no key is needed.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use oracle_core::{SignatureStatus, SignatureStore, WorkflowError};
use serde::Serialize;

use super::{print_json, report_error};
use crate::exit_codes::{self, codes};
use crate::settings::Settings;

/// Arguments for `oracle status`.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Signed document.
    pub path: PathBuf,

    /// Output JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    document: String,
    status: SignatureStatus,
    signature_id: String,
    signer_email: String,
    expires_at: DateTime<Utc>,
    days_remaining: i64,
}

/// Runs `oracle status` and returns the exit code.
pub fn run_status(args: &StatusArgs, settings: &Settings) -> u8 {
    let json_output = args.json;
    let document = Settings::absolutize(&args.path);

    let signature = match SignatureStore::new(&settings.project_root).load(&document) {
        Ok(signature) => signature,
        Err(err) => {
            let err = WorkflowError::from(err);
            let code = exit_codes::for_workflow_error(&err);
            return report_error(json_output, &err.to_string(), code);
        },
    };

    let now = Utc::now();
    let status = settings
        .config
        .signing
        .expiration_policy()
        .classify_signature(&signature, now);
    let expires_at = signature.expires_at();

    if json_output {
        print_json(&StatusResponse {
            document: args.path.display().to_string(),
            status,
            signature_id: signature.signature_id(),
            signer_email: signature.signer().email,
            expires_at,
            days_remaining: (expires_at - now).num_days(),
        });
    } else {
        println!("{status}");
        println!("  Signature ID: {}", signature.signature_id());
        println!("  Expires:      {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if status == SignatureStatus::Expired {
        codes::SIGNATURE_EXPIRED
    } else {
        codes::SUCCESS
    }
}
