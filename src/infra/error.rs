use thiserror::Error;

/// Failures raised while bringing up the runtime adapters: the Postgres
/// pool, the media directory, telemetry, and the listener.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection failed: {0}")]
    Connect(String),
    #[error("database migration failed: {0}")]
    Migration(String),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl InfraError {
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
