use thiserror::Error;

#[derive(Error, Debug)]
pub enum XephError {
    #[error("Invalid time point: {0}")]
    InvalidTimePoint(String),

    #[error("Time point out of range: {time} is outside [{start}, {end}]")]
    TimeOutOfRange {
        time: String,
        start: String,
        end: String,
    },

    #[error("Unavailable object '{object}' with origin '{origin}'")]
    UnknownObject { object: String, origin: String },

    #[error("Undefined ephemeris constant '{0}'")]
    UnknownConstant(String),

    #[error("Invalid call: the ephemeris file is not open")]
    ClosedFile,

    #[error("Invalid call: this ephemeris file has {0} active child handle(s)")]
    ActiveHandles(usize),

    #[error("Not an XEPH file: {0}")]
    InvalidSignature(String),

    #[error("Not an XEPH version 1.0 file: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid or corrupted XEPH header: {0}")]
    InvalidHeader(String),

    #[error("Invalid expansion index: {0}")]
    InvalidIndex(String),

    #[error("Invalid ephemeris serialization data: {0}")]
    InvalidSerializationData(String),

    #[error("Invalid Chebyshev expansion: {0}")]
    InvalidExpansion(String),

    #[error("XML header parsing error: {0}")]
    XmlParse(String),

    #[error("XML header generation error: {0}")]
    XmlSerialize(String),

    #[error("Error during the nom parsing: {0}")]
    NomParsingError(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("The {0} file has not been defined")]
    DatasetNotDefined(String),

    #[error("The {dataset} file does not exist: {path}")]
    DatasetFileNotFound { dataset: String, path: String },

    #[error("Loading {dataset} file: {source}")]
    DatasetLoad {
        dataset: String,
        #[source]
        source: Box<XephError>,
    },
}

impl PartialEq for XephError {
    fn eq(&self, other: &Self) -> bool {
        use XephError::*;
        match (self, other) {
            (InvalidTimePoint(a), InvalidTimePoint(b)) => a == b,
            (
                TimeOutOfRange {
                    time: t1,
                    start: s1,
                    end: e1,
                },
                TimeOutOfRange {
                    time: t2,
                    start: s2,
                    end: e2,
                },
            ) => t1 == t2 && s1 == s2 && e1 == e2,
            (
                UnknownObject {
                    object: o1,
                    origin: r1,
                },
                UnknownObject {
                    object: o2,
                    origin: r2,
                },
            ) => o1 == o2 && r1 == r2,
            (UnknownConstant(a), UnknownConstant(b)) => a == b,
            (ActiveHandles(a), ActiveHandles(b)) => a == b,
            (InvalidSignature(a), InvalidSignature(b)) => a == b,
            (UnsupportedVersion(a), UnsupportedVersion(b)) => a == b,
            (InvalidHeader(a), InvalidHeader(b)) => a == b,
            (InvalidIndex(a), InvalidIndex(b)) => a == b,
            (InvalidSerializationData(a), InvalidSerializationData(b)) => a == b,
            (InvalidExpansion(a), InvalidExpansion(b)) => a == b,
            (XmlParse(a), XmlParse(b)) => a == b,
            (XmlSerialize(a), XmlSerialize(b)) => a == b,
            (NomParsingError(a), NomParsingError(b)) => a == b,
            (DatasetNotDefined(a), DatasetNotDefined(b)) => a == b,
            (
                DatasetFileNotFound {
                    dataset: d1,
                    path: p1,
                },
                DatasetFileNotFound {
                    dataset: d2,
                    path: p2,
                },
            ) => d1 == d2 && p1 == p2,
            (
                DatasetLoad {
                    dataset: d1,
                    source: s1,
                },
                DatasetLoad {
                    dataset: d2,
                    source: s2,
                },
            ) => d1 == d2 && s1 == s2,

            // I/O errors are not comparable: equal when both are I/O errors
            (IoError(_), IoError(_)) => true,

            (ClosedFile, ClosedFile) => true,

            _ => false,
        }
    }
}
