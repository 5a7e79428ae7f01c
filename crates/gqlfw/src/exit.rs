use std::process::ExitCode;

/// Outcome of a command: a status plus an optional summary line printed to
/// stderr.
#[derive(Debug)]
pub struct Exit {
    code: u8,
    message: Option<String>,
}

impl Exit {
    pub fn success() -> Self {
        Self {
            code: 0,
            message: None,
        }
    }

    pub fn error() -> Self {
        Self {
            code: 1,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn process(self, quiet: bool) -> ExitCode {
        if let Some(message) = self.message {
            if !quiet {
                eprintln!("{message}");
            }
        }
        ExitCode::from(self.code)
    }
}
