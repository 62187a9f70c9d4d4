use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocxlabError {
    // Container / XML errors
    #[error("TEMPLATE_PARSE: {0}")]
    TemplateParse(String),

    // Command errors
    #[error("COMMAND_SYNTAX: {0}")]
    CommandSyntax(String),

    #[error("INVALID_COMMAND: {message}: {command}")]
    InvalidCommand { message: String, command: String },

    // Walk termination errors
    #[error("INCOMPLETE_CONDITIONAL: IF and END-IF commands do not match")]
    IncompleteConditional,

    #[error("UNTERMINATED_LOOP: FOR loop '{0}' has no matching END-FOR")]
    UnterminatedLoop(String),

    #[error("WALK_DEPTH_EXCEEDED: gave up after {0} iterations; infinite loop or massive dataset")]
    WalkDepthExceeded(usize),

    // User-supplied function failures
    #[error("USER_FUNCTION: '{name}' failed: {reason}")]
    UserFunction { name: String, reason: String },

    // Non-fail-fast renders collect per-command errors and report them together
    #[error("MULTIPLE_ERRORS: {}", join_errors(.0))]
    Multiple(Vec<DocxlabError>),

    // IO errors
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),
}

fn join_errors(errors: &[DocxlabError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DocxlabError {
    pub fn invalid_command(message: impl Into<String>, command: impl Into<String>) -> Self {
        DocxlabError::InvalidCommand {
            message: message.into(),
            command: command.into(),
        }
    }

    /// Fold a list of collected errors into a single error value.
    pub fn combined(mut errors: Vec<DocxlabError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            DocxlabError::Multiple(errors)
        }
    }
}

impl From<zip::result::ZipError> for DocxlabError {
    fn from(err: zip::result::ZipError) -> Self {
        DocxlabError::TemplateParse(format!("archive error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, DocxlabError>;
