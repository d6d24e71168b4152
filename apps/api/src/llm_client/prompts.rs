// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "\
    Respond ONLY with valid JSON. \
    Do NOT include any text outside the JSON object. \
    Do NOT include explanations or apologies.";

/// Instruction against fabricating content that is not in the source document.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Do NOT invent information. Extract only what is present in the text. \
    If a section does not exist in the document, do not create it empty.";
