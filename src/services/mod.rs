pub mod document_compiler;
pub mod key_resolver;
pub mod mutation_executor;
pub mod option_extractor;

pub use document_compiler::DocumentCompiler;
pub use key_resolver::KeyResolver;
pub use mutation_executor::{MutationExecutor, RetryPolicy};
pub use option_extractor::OptionExtractor;
