pub mod catalog;
pub mod constituency;
pub mod document;
pub mod loaders;
pub mod metadata;
pub mod option;

pub use catalog::{BilingualText, QuestionCatalog};
pub use constituency::ConstituencyKey;
pub use document::{CompiledDocument, CompiledSection, DocumentItem, PositionedItem, SectionName};
pub use loaders::{load_catalog, load_settings};
pub use metadata::{FormMetadata, SectionMapping};
pub use option::{CategoryOptions, OptionCategory, OptionList};
