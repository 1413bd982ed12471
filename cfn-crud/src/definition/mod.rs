//! Definition documents and the file locations they reference.

mod document;
mod location;

pub use document::{DefinitionDocument, ParameterFileSource, ParameterSources, StackDefinition};
pub use location::resolve_location;
