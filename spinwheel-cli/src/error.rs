/// Request failures that are reported back to the user. None of them
/// touches the ledger.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SpinError {
    #[error("Error: Spin session timed out or invalid data. Use spin to start again.")]
    SessionExpiredOrInvalid,

    #[error("⚠️ Missing arguments. Usage: {usage}")]
    MissingArguments { usage: &'static str },
}
