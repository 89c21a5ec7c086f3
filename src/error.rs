//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use num_enum::TryFromPrimitive;

include!(concat!(env!("OUT_DIR"), "/version.rs"));

pub(crate) fn client_version() -> &'static str {
    CLIENT_VERSION
}

pub(crate) fn client_description() -> &'static str {
    CLIENT_DESCRIPTION
}

/// One entry of an error's cause stack.
///
/// Index 0 of a stack is the outermost error; higher indexes are the nested
/// causes reported by the request layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorFrame {
    pub code: i32,
    pub message: String,
    pub location: String,
}

/// Failure reported by the underlying client request layer.
///
/// This is what every [`GridClient`](crate::GridClient) method returns on
/// failure. It is converted into a [`GridError`] with code
/// [`GridErrorCode::Protocol`] before it reaches applications, or with
/// [`GridErrorCode::RequestTimeout`] or [`GridErrorCode::ResourceExhausted`]
/// when the layer flags the failure as a timeout or an allocation failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestError {
    pub code: i32,
    pub message: String,
    pub location: String,
    pub timeout: bool,
    pub exhausted: bool,
    pub causes: Vec<ErrorFrame>,
}

impl RequestError {
    pub fn new(code: i32, message: &str) -> RequestError {
        RequestError {
            code,
            message: message.to_string(),
            ..Default::default()
        }
    }

    pub fn timeout(code: i32, message: &str) -> RequestError {
        RequestError {
            code,
            message: message.to_string(),
            timeout: true,
            ..Default::default()
        }
    }

    /// A failure to allocate a row, type vector or other resource.
    pub fn allocation(code: i32, message: &str) -> RequestError {
        RequestError {
            code,
            message: message.to_string(),
            exhausted: true,
            ..Default::default()
        }
    }

    pub fn at(mut self, location: &str) -> RequestError {
        self.location = location.to_string();
        self
    }

    pub fn caused_by(mut self, frame: ErrorFrame) -> RequestError {
        self.causes.push(frame);
        self
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RequestError {}

/// Error returned by every fallible operation of this library.
#[derive(Debug, Clone)]
pub struct GridError {
    pub code: GridErrorCode,
    pub message: String,
    pub(crate) stack: Vec<ErrorFrame>,
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        return write!(f, "code={:?} message=\"{}\"", self.code, self.message);
    }
}

impl GridError {
    pub fn new(code: GridErrorCode, msg: &str) -> GridError {
        GridError {
            code,
            message: msg.to_string(),
            stack: Vec::new(),
        }
    }

    pub fn from_int(icode: i32, msg: &str) -> GridError {
        if let Ok(code) = GridErrorCode::try_from(icode) {
            return GridError::new(code, msg);
        }
        GridError::new(
            GridErrorCode::UnknownError,
            &format!("Invalid integer error code {}", icode),
        )
    }

    /// The classification of this error.
    pub fn code(&self) -> GridErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the request layer reported this failure as a timeout.
    pub fn is_timeout(&self) -> bool {
        self.code == GridErrorCode::RequestTimeout
    }

    /// Number of entries in the request layer's cause stack. This is zero
    /// for errors detected locally, such as schema mismatches.
    pub fn error_stack_size(&self) -> usize {
        self.stack.len()
    }

    /// The request layer's numeric code at `index` in the cause stack.
    pub fn error_code(&self, index: usize) -> Option<i32> {
        self.stack.get(index).map(|f| f.code)
    }

    pub fn message_at(&self, index: usize) -> Option<&str> {
        self.stack.get(index).map(|f| f.message.as_str())
    }

    pub fn location(&self, index: usize) -> Option<&str> {
        self.stack.get(index).map(|f| f.location.as_str())
    }
}

macro_rules! ia_error {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        GridError::new(
            crate::error::GridErrorCode::IllegalArgument,
            &format!("{} ({})", m, crate::error::client_version()),
        )
    }};
}

pub(crate) use ia_error;

macro_rules! ia_err {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        Err(GridError::new(
            crate::error::GridErrorCode::IllegalArgument,
            &format!("{} ({})", m, crate::error::client_version()),
        ))
    }};
}

pub(crate) use ia_err;

// Same as ia_err, for other error codes
macro_rules! grid_err {
    ($code:expr, $($t:tt)*) => {{
        let m = format!($($t)*);
        Err(GridError::new(
            $code,
            &format!("{} ({})", m, crate::error::client_version()),
        ))
    }};
}

pub(crate) use grid_err;

impl From<RequestError> for GridError {
    fn from(e: RequestError) -> Self {
        let code = if e.timeout {
            GridErrorCode::RequestTimeout
        } else if e.exhausted {
            GridErrorCode::ResourceExhausted
        } else {
            GridErrorCode::Protocol
        };
        let mut stack = Vec::with_capacity(e.causes.len() + 1);
        stack.push(ErrorFrame {
            code: e.code,
            message: e.message.clone(),
            location: e.location,
        });
        stack.extend(e.causes);
        GridError {
            code,
            message: format!("[{}] {} ({})", e.code, e.message, client_version()),
            stack,
        }
    }
}

impl From<std::collections::TryReserveError> for GridError {
    fn from(e: std::collections::TryReserveError) -> Self {
        GridError::new(
            GridErrorCode::ResourceExhausted,
            &format!("memory allocation error: {} ({})", e, client_version()),
        )
    }
}

impl From<chrono::ParseError> for GridError {
    fn from(e: chrono::ParseError) -> Self {
        ia_error!("invalid datetime value: {}", e.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        ia_error!("invalid json: {}", e.to_string())
    }
}

impl From<ini::Error> for GridError {
    fn from(e: ini::Error) -> Self {
        ia_error!("error reading config file: {}", e.to_string())
    }
}

impl From<std::io::Error> for GridError {
    fn from(e: std::io::Error) -> Self {
        ia_error!("i/o error: {}", e.to_string())
    }
}

// GridErrorCode represents the error code.
// Error codes are divided into categories as follows:
//
// 1. Errors detected locally by this library, range from 1 to 50(exclusive).
// These include illegal arguments, schema mismatches, misuse of closed
// resources, etc. No request is sent to the store when one of these occurs.
//
// 2. Errors reported by the request layer, from 100. The request layer's
// own numeric code and cause stack are available from the error stack.
//
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(i32)]
pub enum GridErrorCode {
    /// NoError represents there is no error.
    NoError = 0,

    /// IllegalArgument error represents the application provided an illegal
    /// argument for the operation.
    IllegalArgument = 1,

    /// IncorrectColumnType error represents a field whose type cannot be
    /// written into (or read from) the declared type of its column.
    IncorrectColumnType = 2,

    /// ColumnCountMismatch error represents a row whose field count differs
    /// from the column count of the schema it is bound to.
    ColumnCountMismatch = 3,

    /// WrongRowKeyType error represents a row key field whose type is not
    /// accepted for the declared type of the container's row key column.
    WrongRowKeyType = 4,

    /// ContainerNotFound error represents an operation that names a container
    /// that does not exist.
    ContainerNotFound = 5,

    /// IllegalState error represents an operation on a closed resource, or an
    /// operation that is not valid for the current state of a row set.
    IllegalState = 6,

    /// ResourceExhausted error represents a failure to allocate memory or a
    /// request layer resource while building a request.
    ResourceExhausted = 7,

    /// Unsupported error represents a value or option this library does not
    /// handle, such as an aggregation result requested as a string.
    Unsupported = 8,

    /// Protocol error represents a failure reported by the request layer.
    /// See [`GridError::error_code()`] for the request layer's own code.
    Protocol = 100,

    /// RequestTimeout error represents a request that the request layer
    /// abandoned after its configured timeout.
    RequestTimeout = 101,

    /// BadProtocolMessage error represents a response from the request layer
    /// that does not match the schema it was requested with.
    BadProtocolMessage = 102,

    /// UnknownError represents an unknown error has occurred.
    UnknownError = 125,
}
