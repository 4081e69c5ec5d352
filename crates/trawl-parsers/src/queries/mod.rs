use crate::detect::Format;
use crate::ParseError;

pub const TYPESCRIPT_QUERIES: &str = include_str!("typescript.scm");
pub const PYTHON_QUERIES: &str = include_str!("python.scm");

/// Returns the reference query source for the given code format.
pub fn query_for_format(format: Format) -> Result<&'static str, ParseError> {
    match format {
        Format::TypeScript | Format::JavaScript => Ok(TYPESCRIPT_QUERIES),
        Format::Python => Ok(PYTHON_QUERIES),
        other => Err(ParseError::UnsupportedFormat(other.as_str().to_string())),
    }
}
