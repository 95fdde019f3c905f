use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error at position {position}: {source}")]
    Xml {
        source: quick_xml::Error,
        position: usize,
    },

    #[error("Unexpected end of document inside <{element}>")]
    UnexpectedEof { element: String },

    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },

    #[error("Unknown mutation status '{0}'")]
    UnknownMutationStatus(String),

    #[error("No {format} information found in the report")]
    NoData { format: &'static str },

    #[error("Cannot combine incompatible values {left} and {right}")]
    IncompatibleValues { left: String, right: String },

    #[error("Invalid value '{0}'")]
    InvalidValue(String),

    #[error("Unknown coverage format")]
    UnknownFormat,
}

pub type Result<T> = std::result::Result<T, CoverageError>;
