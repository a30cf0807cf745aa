//! Error taxonomy.
//!
//! Only `BadRequest` and `Precondition` are fatal to a call. The other
//! variants describe per-substance faults, which the model and the
//! validators turn into warnings on the affected prediction.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Descriptor calculation failed for '{substance}': {reason}")]
    Descriptor { substance: String, reason: String },

    #[error("Local model failed: {0}")]
    Trainer(String),

    #[error("Similarity of two empty inputs is undefined")]
    EmptyInput,

    #[error("Inputs have no overlapping values")]
    NoOverlap,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        Error::BadRequest(msg.into())
    }

    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Error::Precondition(msg.into())
    }

    pub fn descriptor<S: Into<String>, R: Into<String>>(substance: S, reason: R) -> Self {
        Error::Descriptor {
            substance: substance.into(),
            reason: reason.into(),
        }
    }

    pub fn trainer<S: Into<String>>(msg: S) -> Self {
        Error::Trainer(msg.into())
    }

    /// True for errors that abort a whole call rather than a
    /// single substance.
    pub fn is_fatal(&self) -> bool {
        match *self {
            Error::BadRequest(_) | Error::Precondition(_) => true,
            Error::Csv(_) | Error::Io(_) | Error::Serialization(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors() {
        assert!(Error::bad_request("no query").is_fatal());
        assert!(Error::precondition("leaky").is_fatal());
        assert!(!Error::descriptor("c1", "empty fingerprint").is_fatal());
        assert!(!Error::trainer("singular").is_fatal());
        assert!(!Error::NoOverlap.is_fatal());
    }

    #[test]
    fn descriptor_message() {
        let e = Error::descriptor("c1", "empty fingerprint");
        assert!(e.to_string() == "Descriptor calculation failed for 'c1': empty fingerprint");
    }
}
