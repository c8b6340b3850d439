use thiserror::Error;

#[derive(Debug, Error)]
pub enum QimbError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("message handler failed: {0}")]
    Callback(String),
    #[error("unable to publish message: {reason}")]
    Publish {
        reason: String,
        #[source]
        source: Option<Box<QimbError>>,
    },
    #[error("unable to subscribe: {reason}")]
    Subscribe {
        reason: String,
        #[source]
        source: Option<Box<QimbError>>,
    },
    #[error("unable to receive messages: {reason}")]
    Receive {
        reason: String,
        #[source]
        source: Option<Box<QimbError>>,
    },
    #[error("unable to acknowledge message: {reason}")]
    Ack {
        reason: String,
        #[source]
        source: Option<Box<QimbError>>,
    },
}

impl QimbError {
    pub fn publish(reason: impl Into<String>, source: Option<QimbError>) -> Self {
        Self::Publish {
            reason: reason.into(),
            source: source.map(Box::new),
        }
    }

    pub fn subscribe(reason: impl Into<String>, source: Option<QimbError>) -> Self {
        Self::Subscribe {
            reason: reason.into(),
            source: source.map(Box::new),
        }
    }

    pub fn receive(reason: impl Into<String>, source: Option<QimbError>) -> Self {
        Self::Receive {
            reason: reason.into(),
            source: source.map(Box::new),
        }
    }

    pub fn ack(reason: impl Into<String>, source: Option<QimbError>) -> Self {
        Self::Ack {
            reason: reason.into(),
            source: source.map(Box::new),
        }
    }

    pub fn is_publish(&self) -> bool {
        matches!(self, Self::Publish { .. })
    }

    pub fn is_subscribe(&self) -> bool {
        matches!(self, Self::Subscribe { .. })
    }

    pub fn is_receive(&self) -> bool {
        matches!(self, Self::Receive { .. })
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack { .. })
    }
}

pub type Result<T> = std::result::Result<T, QimbError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn taxonomy_display_and_source_chain() {
        let err = QimbError::receive(
            "unexpected status 503",
            Some(QimbError::Http("connection reset".to_string())),
        );
        assert!(err.is_receive());
        assert!(format!("{err}").contains("unable to receive messages"));
        let source = err.source().unwrap();
        assert!(source.to_string().contains("connection reset"));

        let err = QimbError::ack("missing receipt handle", None);
        assert!(err.is_ack());
        assert!(err.source().is_none());

        let err = QimbError::Config("x".to_string());
        assert!(format!("{err}").contains("configuration error"));
        assert!(!err.is_publish());
    }
}
