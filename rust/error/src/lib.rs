// Standard error codes modeled on the gRPC status codes. Custom errors map
// themselves onto one of these so callers can handle failures generically
// without matching on every concrete error type in the workspace.
use std::error::Error;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum ErrorCodes {
    // "Success" since Ok is a keyword in Rust.
    Success = 0,
    Cancelled = 1,
    Unknown = 2,
    // Client specified an invalid argument.
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    // A requested entity was not found.
    NotFound = 5,
    // An entity we attempted to create already exists.
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    // The system is not in a state required for the operation's execution.
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    // Unrecoverable data loss or corruption.
    DataLoss = 15,
    Unauthenticated = 16,
}

impl ErrorCodes {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCodes::InvalidArgument => "InvalidArgumentError",
            ErrorCodes::NotFound => "NotFoundError",
            ErrorCodes::FailedPrecondition => "FailedPreconditionError",
            ErrorCodes::DataLoss => "DataLossError",
            ErrorCodes::Internal => "InternalError",
            _ => "PivotspaceError",
        }
    }
}

pub trait PivotspaceError: Error + Send {
    fn code(&self) -> ErrorCodes;
    fn boxed(self) -> Box<dyn PivotspaceError>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl Error for Box<dyn PivotspaceError> {}

impl PivotspaceError for Box<dyn PivotspaceError> {
    fn code(&self) -> ErrorCodes {
        self.as_ref().code()
    }
}

impl PivotspaceError for std::io::Error {
    fn code(&self) -> ErrorCodes {
        ErrorCodes::Unknown
    }
}
