use std::collections::TryReserveError;
use std::io;

use crate::filter::TableId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("interface {name} not found")]
    InterfaceNotFound { name: String },

    #[error("failed to allocate table {name}: {source}")]
    TableAlloc {
        name: String,
        #[source]
        source: TryReserveError,
    },

    #[error("duplicate table: {0}")]
    DuplicateTable(String),

    #[error("no table registered with id {id}")]
    UnknownTable { id: TableId },

    #[error("table {table} does not match held identity {held}")]
    IdentityMismatch { held: TableId, table: TableId },

    #[error("cannot write the filter configuration from inside a read section")]
    ReadInProgress,
}

pub type Result<T> = std::result::Result<T, Error>;
