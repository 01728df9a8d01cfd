use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Buffer too short: need {need} bytes, got {got}")]
    ShortBuffer { need: usize, got: usize },

    #[error("Frame too short: {0} bytes")]
    ShortFrame(usize),

    #[error("Unsupported ethertype 0x{0:04x}")]
    EtherType(u16),

    #[error("Unexpected IP protocol {0}")]
    Protocol(u8),

    #[error("Invalid header geometry")]
    InvalidGeometry,

    #[error("Socket is closed")]
    Closed,

    #[error("Socket on port {0} already has a packet pending")]
    Busy(u16),

    #[error("Frame for port {got} delivered to socket on port {want}")]
    PortMismatch { want: u16, got: u16 },

    #[error("Session rejected segment: {0}")]
    Session(String),

    #[error("{0} not implemented")]
    Unsupported(&'static str),

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}
