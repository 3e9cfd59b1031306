// Template store - named SQL text loaded once and read-only afterwards
//
// - identifier: `namespace.id` parsing and validation
// - store: parsing of `--`-delimited sources and lookups

pub mod identifier;
pub mod store;

pub use identifier::{QueryIds, TemplateId};
pub use store::{TEMPLATE_MARKER, TemplateStore};
