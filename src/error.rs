//! Error taxonomy for the holdings core.

/// Errors returned by normalization, conversion, aggregation and planning.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A single raw line (or account field) could not be read as expected.
    ///
    /// The normalizer absorbs this per line and skips the offending line.
    #[error("cannot parse {field} from {value:?}: {reason}")]
    Parse {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The payload does not match any known broker field-alias table.
    #[error("unknown broker format: {0}")]
    UnknownFormat(String),

    /// Invalid exchange rate, divisor or target table.
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
