//! # Parsers
//!
//! Everything that turns a response body into something the resolver can
//! work on and back:
//!
//! - `html` - HTML documents and fragments, selector-driven attribute rewriting
//! - `json` - ajax command envelopes carrying HTML under `data` keys
//! - `css` - stylesheet `url()` references

pub mod css;
pub mod html;
pub mod json;

// Re-export commonly used items for convenience
pub use css::rewrite_css;
pub use html::{rewrite_markup, walk};
pub use json::rewrite_ajax_json;
