pub mod section_ctx;
pub mod section_flow;

pub use section_ctx::SectionCtx;
pub use section_flow::{SectionFlow, SectionResult};
