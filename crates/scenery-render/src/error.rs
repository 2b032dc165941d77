/// Errors raised by render backends.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A render target could not be created.
    #[error("failed to allocate {label}: {reason}")]
    ResourceAllocation { label: String, reason: String },

    /// The device lacks a feature the pass needs.
    #[error("unsupported hardware: {0}")]
    UnsupportedHardware(String),

    /// A pass targeted the screen before one was bound.
    #[error("no screen target bound")]
    NoScreen,

    /// No usable device could be opened.
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}
