use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("browser initialization failed: {0}")]
    BrowserInit(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timed out waiting for {0}")]
    WaitTimeout(String),

    #[error("page not ready after challenge resolution: {0}")]
    ChallengeVerificationFailed(String),

    #[error("challenge resolution signal failed: {0}")]
    ChallengeUnresolved(String),

    #[error("script evaluation failed: {0}")]
    JavaScript(String),

    #[error("invalid selector rule `{rule}`: {message}")]
    InvalidSelector { rule: String, message: String },

    #[error("failed to write records: {0}")]
    SinkWrite(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("file operation failed: {0}")]
    FileIO(#[from] std::io::Error),
}

/// Why a single match fragment produced no record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("no team rule matched exactly two elements ({rules_tried} rules tried)")]
    TeamsNotFound { rules_tried: usize },

    #[error("blank team name (home='{home}', away='{away}')")]
    BlankTeamName { home: String, away: String },
}

impl ScraperError {
    /// Timeouts raised while preparing a single section are absorbed by the walker.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScraperError::WaitTimeout(_))
    }
}

impl From<csv::Error> for ScraperError {
    fn from(e: csv::Error) -> Self {
        ScraperError::SinkWrite(e.to_string())
    }
}
