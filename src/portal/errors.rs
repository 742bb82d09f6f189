//! Error types for the portal automation client.

/// Segment-scoped failures raised while driving the portal or decoding its
/// export. The driver never retries internally; retry policy lives in the
/// pipeline, which retries only [`PortalError::ExportTimeout`].
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("failed to start automation session: {0}")]
    SessionStart(String),
    #[error("portal rejected the query: {0}")]
    QueryRejected(String),
    #[error("report form is missing an expected control: {0}")]
    FormLayout(String),
    #[error("export did not materialize within {attempts} poll attempts")]
    ExportTimeout { attempts: u32 },
    #[error("export artifact is not well-formed XML: {0}")]
    MalformedExport(String),
    #[error("portal interaction failed: {0}")]
    Interaction(#[from] thirtyfour::error::WebDriverError),
    #[error("export file handling failed: {0}")]
    Io(#[from] std::io::Error),
}
