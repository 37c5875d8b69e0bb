// URL handling utilities
pub mod url_encoding;
pub mod url_parser;
pub mod url_builder;

// Parsing utilities
pub mod parse_flag;

// JSON utilities
pub mod json_converter;

pub use url_encoding::parse_urlencoded_body;
pub use url_parser::hostname_from_url;
pub use url_builder::absolute_url;
pub use parse_flag::parse_flag;
pub use json_converter::value_to_short_string;
