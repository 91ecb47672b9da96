pub mod context;

// Re-export the context helpers for external use
pub use context::{
    ContentCategory, ContextBuilder, ContextEntry, InquiryKind, NO_CONTEXT_MESSAGE, build_context,
    classify_inquiry,
};
