use pgbootstrap_core::{Error, MigrationOutcome};

use std::error::Error as _;

/// The line printed after a clean run.
pub fn success_line(database: &str, applied: usize) -> String {
    format!(
        "{} database {} is ready ({applied} migrations applied)",
        console::style(MigrationOutcome::Success).green().bold(),
        console::style(database).cyan(),
    )
}

/// The line printed after a failed run: the outcome, the error and each
/// underlying cause.
pub fn failure_line(err: &Error) -> String {
    let outcome = MigrationOutcome::from(err);
    let mut line = format!(
        "{} (exit code {}): {err}",
        console::style(outcome).red().bold(),
        outcome.exit_code(),
    );

    let mut source = err.source().and_then(|e| e.source());
    while let Some(cause) = source {
        line.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgbootstrap_core::Operation;
    use std::fmt;

    #[derive(Debug)]
    struct Refused;

    impl fmt::Display for Refused {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("password authentication failed for user \"postgres\"")
        }
    }

    impl std::error::Error for Refused {}

    #[derive(Debug)]
    struct Driver(Refused);

    impl fmt::Display for Driver {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("error returned from database")
        }
    }

    impl std::error::Error for Driver {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn success_names_the_database() {
        console::set_colors_enabled(false);
        assert_eq!(
            success_line("orders", 3),
            "success database orders is ready (3 migrations applied)"
        );
    }

    #[test]
    fn failure_carries_the_exit_code() {
        console::set_colors_enabled(false);
        let err = Error::Provisioning {
            operation: Operation::CreateDatabase,
            database: "orders".into(),
            source: Error::message("permission denied to create database"),
        };
        let line = failure_line(&err);
        assert!(line.starts_with("provisioning failure (exit code 2): create database failed"));
        assert!(line.contains("permission denied"));
    }

    #[test]
    fn each_cause_is_printed_once() {
        console::set_colors_enabled(false);
        let err = Error::Authentication(Box::new(Driver(Refused)));
        let line = failure_line(&err);

        assert_eq!(line.matches("error returned from database").count(), 1);
        assert_eq!(line.matches("password authentication failed").count(), 1);
        assert!(line.ends_with("\n  caused by: password authentication failed for user \"postgres\""));
    }
}
