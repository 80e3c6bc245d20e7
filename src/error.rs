//! Error taxonomy for the channel and serializer subsystems.

use thiserror::Error;

/// Errors surfaced by [`crate::iochannel::IoChannel`] and its drivers.
///
/// One variant per entry of the channel-level error taxonomy; variants that
/// originate from the OS carry the `errno`-equivalent value for diagnostics,
/// mirroring the sticky `errnoValue` field of the original design.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IoChannelError {
    #[error("operation not permitted for this channel's access mode")]
    BadAccess,
    #[error("bad format specifier used in printf/scanf")]
    BadFormatSpecifier,
    #[error("bad internal buffer size (must be > 0)")]
    BadInternalBuffer,
    #[error("bad or undefined open-string")]
    BadOpenString,
    #[error("seek is not supported on this channel")]
    BadSeek,
    #[error("bad size argument")]
    BadSize,
    #[error("invalid memory pointer for Mem:// channel")]
    BadMemPointer,
    #[error("bad size for a memory-mapped channel")]
    BadMemMapSize,
    #[error("bad seek whence")]
    BadSeekWhence,
    #[error("seeking from the end is not supported on memory streams")]
    NoEndSeekOnMemory,
    #[error("I/O attempted on a closed channel")]
    IoOnClosedChannel,
    #[error("bad delimiters in open-string")]
    BadDelimiters,
    #[error("bad mode bits")]
    BadMode,
    #[error("bad close flags")]
    BadCloseFlags,
    #[error("POSIX shared-memory names must start with '/'")]
    BadShmName,
    #[error("low-level socket read failed")]
    SocketRead,
    #[error("low-level socket write failed")]
    SocketWrite,
    #[error("error not defined")]
    NotDefined,
    #[error("low-level write transferred fewer bytes than requested")]
    LowLevelShortWrite,
    #[error("StdIn can only be opened read-only")]
    BadStdInMode,
    #[error("StdOut can only be opened write-only")]
    BadStdOutMode,
    #[error("bad access flags")]
    BadFlags,
    #[error("bad open argument")]
    BadOpenArg,
    #[error("bad memory flags")]
    BadMemFlags,
    #[error("unable to connect to {host}:{port}")]
    UnableToConnect { host: String, port: u16 },
    #[error("socket operation timed out")]
    SocketTimeout,
    #[error("printf callback returned an error")]
    CallbackWrite,
    #[error("scanf callback returned an error")]
    CallbackRead,
    #[error("path already exists")]
    Exists,
    #[error("path is a directory")]
    IsDir,
    #[error("access denied")]
    Access,
    #[error("path name too long")]
    NameTooLong,
    #[error("no such file or directory")]
    NoEnt,
    #[error("not a directory")]
    NotDir,
    #[error("no such device")]
    NoDev,
    #[error("special file has no corresponding device")]
    NoDevice,
    #[error("read-only filesystem")]
    ReadOnlyFs,
    #[error("text file busy")]
    TextBusy,
    #[error("bad address")]
    Fault,
    #[error("too many levels of symbolic links")]
    Loop,
    #[error("no space left on device")]
    NoSpc,
    #[error("out of memory")]
    NoMem,
    #[error("too many open files (process limit)")]
    MaxFiles,
    #[error("too many open files (system limit)")]
    NFile,
    #[error("call interrupted by a signal")]
    Interrupted,
    #[error("resource temporarily unavailable")]
    Again,
    #[error("I/O error")]
    IO,
    #[error("bad file descriptor")]
    BadFd,
    #[error("invalid argument")]
    Invalid,
    #[error("file too big")]
    FileTooBig,
    #[error("broken pipe")]
    Pipe,
    #[error("fd is a pipe or socket, seek not allowed")]
    SPipe,
    #[error("resulting size overflows")]
    Overflow,
    #[error("too many bytes unget past the buffer's capacity")]
    TooUnget,
    #[error("requested functionality is not supported by this driver")]
    NotSupported,
}

impl IoChannelError {
    /// A stable numeric code per variant, standing in for the original's
    /// sticky `errnoValue` field — callers that want an integer rather than
    /// matching on the enum (e.g. to compare against a log record) get one
    /// without this crate adopting actual platform errno numbering, which
    /// would tie the taxonomy to one OS's constant set.
    pub fn error_number(&self) -> i32 {
        match self {
            IoChannelError::BadAccess => 1,
            IoChannelError::BadFormatSpecifier => 2,
            IoChannelError::BadInternalBuffer => 3,
            IoChannelError::BadOpenString => 4,
            IoChannelError::BadSeek => 5,
            IoChannelError::BadSize => 6,
            IoChannelError::BadMemPointer => 7,
            IoChannelError::BadMemMapSize => 8,
            IoChannelError::BadSeekWhence => 9,
            IoChannelError::NoEndSeekOnMemory => 10,
            IoChannelError::IoOnClosedChannel => 11,
            IoChannelError::BadDelimiters => 12,
            IoChannelError::BadMode => 13,
            IoChannelError::BadCloseFlags => 14,
            IoChannelError::BadShmName => 15,
            IoChannelError::SocketRead => 16,
            IoChannelError::SocketWrite => 17,
            IoChannelError::NotDefined => 18,
            IoChannelError::LowLevelShortWrite => 19,
            IoChannelError::BadStdInMode => 20,
            IoChannelError::BadStdOutMode => 21,
            IoChannelError::BadFlags => 22,
            IoChannelError::BadOpenArg => 23,
            IoChannelError::BadMemFlags => 24,
            IoChannelError::UnableToConnect { .. } => 25,
            IoChannelError::SocketTimeout => 26,
            IoChannelError::CallbackWrite => 27,
            IoChannelError::CallbackRead => 28,
            IoChannelError::Exists => 29,
            IoChannelError::IsDir => 30,
            IoChannelError::Access => 31,
            IoChannelError::NameTooLong => 32,
            IoChannelError::NoEnt => 33,
            IoChannelError::NotDir => 34,
            IoChannelError::NoDev => 35,
            IoChannelError::NoDevice => 36,
            IoChannelError::ReadOnlyFs => 37,
            IoChannelError::TextBusy => 38,
            IoChannelError::Fault => 39,
            IoChannelError::Loop => 40,
            IoChannelError::NoSpc => 41,
            IoChannelError::NoMem => 42,
            IoChannelError::MaxFiles => 43,
            IoChannelError::NFile => 44,
            IoChannelError::Interrupted => 45,
            IoChannelError::Again => 46,
            IoChannelError::IO => 47,
            IoChannelError::BadFd => 48,
            IoChannelError::Invalid => 49,
            IoChannelError::FileTooBig => 50,
            IoChannelError::Pipe => 51,
            IoChannelError::SPipe => 52,
            IoChannelError::Overflow => 53,
            IoChannelError::TooUnget => 54,
            IoChannelError::NotSupported => 55,
        }
    }

    /// Maps a [`std::io::Error`] raised by a driver onto the taxonomy.
    pub fn from_io_error(err: &std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => IoChannelError::NoEnt,
            PermissionDenied => IoChannelError::Access,
            AlreadyExists => IoChannelError::Exists,
            InvalidInput | InvalidData => IoChannelError::Invalid,
            TimedOut => IoChannelError::SocketTimeout,
            WriteZero => IoChannelError::LowLevelShortWrite,
            Interrupted => IoChannelError::Interrupted,
            WouldBlock => IoChannelError::Again,
            BrokenPipe => IoChannelError::Pipe,
            UnexpectedEof => IoChannelError::IO,
            _ => IoChannelError::IO,
        }
    }
}

impl From<std::io::Error> for IoChannelError {
    fn from(err: std::io::Error) -> Self {
        IoChannelError::from_io_error(&err)
    }
}

/// Errors surfaced by [`crate::serializer::Serializer`].
///
/// Channel errors observed while driving the stream are preserved verbatim
/// via the `Channel` variant so callers retain the original diagnostic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializeError {
    #[error(transparent)]
    Channel(#[from] IoChannelError),
    #[error("no direction bit (Read/Write/Calc) was set")]
    BadMode,
    #[error("unrecognised wire format {0:?}")]
    BadFormat(String),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("begin/end nesting is imbalanced")]
    NestingImbalance,
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("mode may only be reconfigured at nesting depth 0")]
    ModeChangeWhileNested,
    #[error("malformed header frame: {0}")]
    BadHeader(String),
    #[error("value {0} exceeds the configured maximum string length")]
    StringTooLong(usize),
    #[error("no serialize function registered for type {0:?}")]
    UnknownType(String),
}

impl SerializeError {
    /// Numeric code for this error, delegating to the wrapped channel
    /// error's own code when this is a pass-through `Channel` variant.
    pub fn error_number(&self) -> i32 {
        match self {
            SerializeError::Channel(e) => e.error_number(),
            SerializeError::BadMode => 1000,
            SerializeError::BadFormat(_) => 1001,
            SerializeError::TypeMismatch { .. } => 1002,
            SerializeError::NestingImbalance => 1003,
            SerializeError::LengthMismatch { .. } => 1004,
            SerializeError::ModeChangeWhileNested => 1005,
            SerializeError::BadHeader(_) => 1006,
            SerializeError::StringTooLong(_) => 1007,
            SerializeError::UnknownType(_) => 1008,
        }
    }
}
