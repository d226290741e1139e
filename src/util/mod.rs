//! Small helpers shared by the command handlers.
//!
//! - [`validate_url`] - refuse feed URLs that point at non-HTTP schemes or internal hosts
//! - [`strip_markup`] - flatten an HTML description to one line of plain text
//! - [`strip_control_chars`] - drop terminal escape sequences from feed-supplied text

mod text;
mod url_validator;

pub use text::{strip_control_chars, strip_markup};
pub use url_validator::{validate_url, UrlValidationError};
