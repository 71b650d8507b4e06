use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] sv_supervisor::SupervisorError),

    #[error("Failed to bind control API on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Control API failed: {source}")]
    Serve {
        #[source]
        source: std::io::Error,
    },

    #[error("Logger error: {message}")]
    Logger { message: String },
}

pub type Result<T> = std::result::Result<T, ServerError>;
