//! Command implementations.

pub mod decode;
pub mod mock_idp;
pub mod request;
pub mod resolve;
pub mod validate;

pub use decode::run_decode_request;
pub use mock_idp::run_mock_idp;
pub use request::run_request;
pub use resolve::run_resolve;
pub use validate::run_validate;

use std::path::Path;

/// Reads a file, naming it in the error.
pub(crate) fn read_file(path: &Path) -> crate::CliResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        crate::CliError::InvalidArgument(format!("cannot read {}: {e}", path.display()))
    })
}
