// Shared prompt fragments.
// Each feature that calls the LLM keeps its own prompts.rs alongside it;
// this file only holds cross-cutting instructions.

/// Instruction appended to prompts whose answer is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "Return ONLY valid JSON, no additional text. \
    Do NOT wrap the JSON in markdown code fences.";

/// Anti-hallucination rules shared by every place-recommending prompt.
pub const FACTUALITY_INSTRUCTION: &str = "\
    You MUST use ONLY REAL, EXISTING places. Do NOT invent, guess, or create fictional places, \
    hotels, or restaurants. Use the EXACT official names as they appear in travel guides, \
    official websites, or Google Maps. Use ONLY real coordinates, never approximated ones. \
    When in doubt, EXCLUDE: it is better to return fewer results than incorrect ones.";
