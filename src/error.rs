use thiserror::Error;

/// The error type returned by the fallible container operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A strict lookup (`at`) did not find the key
    #[error("no entry found for key")]
    KeyNotFound,

    /// Growing the container would exceed the number of nodes the allocator can address
    #[error("length exceeded: requested {requested} elements, maximum is {max}")]
    LengthExceeded { requested: usize, max: usize },

    /// The allocator could not provide storage for a node
    #[error("memory allocation of {size} bytes (align {align}) failed")]
    AllocFailed { size: usize, align: usize },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Turns a failed infallible-style call into the same abort/panic the std
/// collections use.
pub(crate) fn raise(err: Error) -> ! {
    match err {
        Error::AllocFailed { size, align } => match core::alloc::Layout::from_size_align(size, align) {
            Ok(layout) => std::alloc::handle_alloc_error(layout),
            Err(_) => panic!("{err}"),
        },
        Error::LengthExceeded { .. } => panic!("capacity overflow"),
        Error::KeyNotFound => panic!("{err}"),
    }
}
