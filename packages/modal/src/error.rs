use thiserror::Error;

/// Errors surfaced by the modal controller and its host documents.
#[derive(Debug, Error)]
pub enum ModalError {
    /// The `container` selector matched nothing in the host document.
    #[error("no element matches container selector `{selector}`")]
    ContainerNotFound { selector: String },

    /// The controller was driven after `teardown`.
    #[error("modal has already been torn down")]
    TornDown,

    /// The host document rejected an operation.
    #[error("host document error: {0}")]
    Dom(String),

    #[error("invalid modal options: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T, E = ModalError> = std::result::Result<T, E>;
