// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file only holds cross-cutting pieces.

/// Closing instruction that enforces bare-JSON output.
pub const JSON_ONLY_INSTRUCTION: &str = "Respond ONLY with the JSON object. \
    Do not include any other text or markdown formatting.";
