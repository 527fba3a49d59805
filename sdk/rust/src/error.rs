use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("server replied {got} during {stage}, expected {expected}")]
    UnexpectedReply {
        stage: &'static str,
        expected: u8,
        got: u8,
    },

    #[error("batch has {got} values, stream negotiated {expected}")]
    BatchSize { expected: usize, got: usize },

    #[error("{operation} is not available to a {role} client")]
    WrongRole {
        operation: &'static str,
        role: &'static str,
    },

    #[error("server closed the connection")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
