/// Errors raised while setting up or tearing down the simulation
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Reading or writing a host file failed.
    #[error("simulation I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage file does not fit the requested capacity.
    #[error("storage file holds {found} bytes, expected at most {capacity}")]
    StorageSize { found: usize, capacity: usize },

    /// The dispatcher thread panicked.
    #[error("interrupt dispatcher thread panicked")]
    Dispatcher,
}

pub type SimResult<T> = std::result::Result<T, SimError>;
