// Structuring LLM prompt templates.
// All prompts for the structuring module are defined here.

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};

pub fn structuring_system_prompt() -> String {
    format!("You are a CV analysis expert. {JSON_ONLY_SYSTEM}")
}

pub const CV_STRUCTURE_PROMPT: &str = r#"Extract and structure ALL information from this CV in a flexible way.

RULES:
1. {no_invention}
2. Adapt to the real structure of the document - do not force a standard layout.
3. Keep all information, even unusual sections.
4. Detect the real section taxonomy the document uses and keep it.

CV TEXT:

{raw_text}

TASK:
Extract and structure this CV as JSON:

1. candidate_info: full_name, email, phone, location, linkedin_url, summary (omit unknown keys)
2. sections: every section in document order, each with section_type, section_title, content (flexible), order, confidence
   Types: experience, formation, compétences, projets, langues, certifications, etc.
   Experience content goes under "experiences", education under "education", skills under "skills".
3. career_summary: years_of_experience, seniority_level, primary_expertise

FORMAT:
{
  "candidate_info": { "full_name": "...", "email": "...", "phone": "...", "location": "...", "summary": "..." },
  "sections": [
    {
      "section_type": "experience",
      "section_title": "Experience",
      "order": 1,
      "content": {
        "experiences": [
          { "job_title": "...", "company": "...", "start_date": "...", "end_date": "...", "description": "..." }
        ]
      },
      "confidence": 0.95
    }
  ],
  "career_summary": { "years_of_experience": 5, "seniority_level": "senior", "primary_expertise": ["..."] }
}"#;

pub fn build_structure_prompt(raw_text: &str) -> String {
    CV_STRUCTURE_PROMPT
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION.trim())
        .replace("{raw_text}", raw_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_text_and_rules() {
        let prompt = build_structure_prompt("Jane Roe\njane@x.com");
        assert!(prompt.contains("Jane Roe\njane@x.com"));
        assert!(prompt.contains("Do NOT invent information"));
        assert!(!prompt.contains("{raw_text}"));
        assert!(!prompt.contains("{no_invention}"));
    }

    #[test]
    fn test_system_prompt_demands_json() {
        assert!(structuring_system_prompt().contains("valid JSON"));
    }
}
