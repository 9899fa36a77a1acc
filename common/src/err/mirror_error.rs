use std::fmt::Display;
use std::num::ParseIntError;
use std::str::Utf8Error;
use std::string::FromUtf8Error;
use std::{fmt, io};

#[derive(Debug)]
pub enum MirrorError {
    //////////////////////
    // Connectivity
    //////////////////////
    ConnectionError(String),
    /// Server replied with an ERR packet.
    ProtocolError(String),

    //////////////////////
    // Binlog
    //////////////////////
    /// Event payload could not be deserialized.
    DecodeError(String),

    //////////////////////
    // SQL
    //////////////////////
    QueryError(String),
    ApplyError(String),
    MetadataError(String),

    //////////////////////
    // Durable stores
    //////////////////////
    /// Progress/checkpoint write failed. Fatal: a later resume would be wrong.
    DurabilityError(String),

    ConfigError(String),

    //////////////////////
    // IO
    //////////////////////
    IoError(io::Error),
    Utf8Error(Utf8Error),
    FromUtf8Error(FromUtf8Error),
    ParseIntError(ParseIntError),
    String(String),
}

impl Display for MirrorError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> fmt::Result {
        match self {
            MirrorError::ConnectionError(s)
            | MirrorError::ProtocolError(s)
            | MirrorError::DecodeError(s)
            | MirrorError::QueryError(s)
            | MirrorError::ApplyError(s)
            | MirrorError::MetadataError(s)
            | MirrorError::DurabilityError(s)
            | MirrorError::ConfigError(s)
            | MirrorError::String(s) => {
                write!(f, "{}", s)
            }
            MirrorError::IoError(err) => {
                write!(f, "{}", err)
            }
            MirrorError::Utf8Error(err) => {
                write!(f, "{}", err)
            }
            MirrorError::FromUtf8Error(err) => {
                write!(f, "{}", err)
            }
            MirrorError::ParseIntError(err) => {
                write!(f, "{}", err)
            }
        }
    }
}

impl std::error::Error for MirrorError {}

impl From<io::Error> for MirrorError {
    fn from(error: io::Error) -> Self {
        MirrorError::IoError(error)
    }
}

impl From<Utf8Error> for MirrorError {
    fn from(error: Utf8Error) -> Self {
        MirrorError::Utf8Error(error)
    }
}

impl From<FromUtf8Error> for MirrorError {
    fn from(error: FromUtf8Error) -> Self {
        MirrorError::FromUtf8Error(error)
    }
}

impl From<ParseIntError> for MirrorError {
    fn from(error: ParseIntError) -> Self {
        MirrorError::ParseIntError(error)
    }
}

#[cfg(test)]
mod test {
    use super::MirrorError;

    #[test]
    fn test_display() {
        let err = MirrorError::ConfigError("missing [source] section".to_string());
        assert_eq!(err.to_string(), "missing [source] section");
    }
}
