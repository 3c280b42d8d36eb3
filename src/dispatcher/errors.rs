use thiserror::Error;

/// Failure of a single computation. Rendered into `{success: false, error}`.
#[derive(Error, Debug)]
pub enum ComputationError {
    /// No computation registered under the requested `type`
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Options object could not be decoded or failed validation
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Candle data was decoded but cannot be processed
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The computation panicked inside the worker
    #[error("computation panicked: {0}")]
    Panicked(String),

    /// Result could not be encoded as JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Caller-side transport failure talking to the worker.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The computation actor has stopped
    #[error("computation worker is not running: {0}")]
    WorkerStopped(String),

    /// Response stream closed before a reply arrived
    #[error("response channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_message() {
        let err = ComputationError::UnknownType("sma".to_string());
        assert_eq!(err.to_string(), "unknown type: sma");
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: ComputationError = parse.unwrap_err().into();
        assert!(matches!(err, ComputationError::Serialization(_)));
    }
}
