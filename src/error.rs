#[derive(Debug, thiserror::Error)]
pub enum FramewatchError {
    #[error("{0}")]
    InsufficientPermission(String),
    #[error("capture device error: {0}")]
    CaptureDevice(String),
    #[error("interface enumeration error: {0}")]
    Interface(#[source] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[source] std::io::Error),
    #[error("fatal: {0}")]
    Fatal(String),
}
