//! CLI command implementations.

pub mod sign;
pub mod status;
pub mod verify;

use serde::Serialize;

use crate::exit_codes::exit_code_label;

/// Error payload for `--json` output.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

/// Reports an error in the appropriate format and returns `exit_code`.
pub fn report_error(json_output: bool, message: &str, exit_code: u8) -> u8 {
    if json_output {
        let error = ErrorResponse {
            code: exit_code_label(exit_code).to_string(),
            message: message.to_string(),
        };
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&error).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        eprintln!("Error: {message}");
    }
    exit_code
}

/// Print a serializable value as pretty JSON.
fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}
