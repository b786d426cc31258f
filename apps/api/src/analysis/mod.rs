// Document risk analysis: prompt rendering, the generate-then-repair pipeline,
// and the HTTP handler that fronts it.
// All LLM calls go through llm_client — no direct provider calls here.

pub mod handlers;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod quotes;
