use std::fmt::Write;

use facturo_client::ClientError;

/// Human-readable failure layout shared by every command: what failed, why,
/// and the concrete steps that fix it.
pub fn render_error(error: &ClientError) -> String {
    let mut out = String::from("Something went wrong, but it's easy to fix.\n\n");
    let _ = writeln!(out, "  Error:    {}", error.code);
    let _ = writeln!(out, "  Details:  {}", error.message);
    out.push_str("\nWhat to do next:");

    if error.recovery_steps.is_empty() {
        out.push_str("\n  1. Retry the command.");
    } else {
        for (index, step) in error.recovery_steps.iter().enumerate() {
            let _ = write!(out, "\n  {}. {step}", index + 1);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use facturo_client::ClientError;

    use super::render_error;

    #[test]
    fn renders_standard_error_layout() {
        let error = ClientError::invalid_argument_with_recovery(
            "bad input",
            vec!["run facturo --help".to_string()],
        );

        let rendered = render_error(&error);
        assert!(rendered.starts_with("Something went wrong, but it's easy to fix."));
        assert!(rendered.contains("  Error:    invalid_argument"));
        assert!(rendered.contains("  Details:  bad input"));
        assert!(rendered.contains("What to do next:"));
        assert!(rendered.contains("  1. run facturo --help"));
    }

    #[test]
    fn missing_recovery_steps_fall_back_to_retry() {
        let error = ClientError::internal_serialization("boom");
        let rendered = render_error(&error);
        assert!(rendered.contains("  1. Retry the command."));
    }
}
