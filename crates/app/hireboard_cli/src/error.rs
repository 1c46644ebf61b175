use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("Json: {}", .0)]
    Json(#[from] serde_json::Error),

    #[error("{}", .0)]
    Session(#[from] hireboard_core::session::SessionError),

    #[error("{}", .0)]
    Gateway(#[from] hireboard_core::gateway::GatewayError),

    #[error("{}", .0)]
    Store(#[from] hireboard_core::store::StoreError),
}
