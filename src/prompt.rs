//! Prompt construction for the generation, repair, completion, exercise,
//! and grading calls.
//!
//! Every prompt demands JSON-only output; the recovery pipeline assumes
//! the model will violate that anyway.

use crate::lesson::{GrammarSection, Lesson};

/// System prompt for the main generation call.
pub const LESSON_SYSTEM: &str = "You are an expert English grammar teacher creating \
structured lessons for Vietnamese learners. You always respond with a single valid \
JSON object and nothing else: no markdown fences, no commentary.";

/// Build the main lesson-generation prompt for a topic.
pub fn build_lesson_prompt(topic: &str) -> String {
    format!(
        r#"Create a complete English grammar lesson about: {topic}

Return ONLY a JSON object with exactly this structure:
{{
  "title": "lesson title",
  "level": "one of: A1/Beginner, A2/Elementary, B1/Pre-Intermediate, B2/Intermediate, C1/Upper-Intermediate, C2/Advanced",
  "objectives": ["3-5 learning objectives"],
  "prerequisites": ["prior knowledge needed, may be empty"],
  "grammar": [
    {{
      "title": "section title",
      "summary": "short explanation of the rule",
      "points": ["key points"],
      "patterns": ["sentence patterns, e.g. S + have/has + V3"],
      "notes": ["extra notes"],
      "time_markers": ["typical time expressions"],
      "usage_contexts": ["when this form is used"],
      "common_mistakes": ["typical learner errors"]
    }}
  ],
  "examples": [
    {{
      "title": "example group title",
      "items": [{{"en": "English sentence", "vi": "Vietnamese translation", "explain": "why this form"}}]
    }}
  ],
  "exercises": {{
    "recognition": [5 items: {{"id": "r1", "prompt": "question", "choices": ["a","b","c","d"], "answer": 0, "explain": "why"}}],
    "gap_fill": [5 items: {{"id": "g1", "sentence": "sentence with ___", "blank": "___", "options": ["choices"], "answer": "correct fill", "explain": "why"}}],
    "transformation": [5 items: {{"id": "t1", "source": "original sentence", "instruction": "how to transform", "answer": "transformed sentence", "explain": "why"}}],
    "error_correction": [5 items: {{"id": "e1", "sentence": "sentence with an error", "error_hint": "what kind of error", "answer": "corrected sentence", "explain": "why"}}],
    "free_production": [2-3 items: {{"id": "f1", "task": "writing task", "sample": "sample answer"}}]
  }}
}}

Use straight double quotes, separate every array element and object member with a comma, and do not add trailing commas."#
    )
}

/// Build the model-assisted repair prompt for text that would not parse.
pub fn build_repair_prompt(raw: &str) -> String {
    format!(
        "The following text is supposed to be a single JSON object but it is \
invalid. Fix the JSON syntax without changing any content: add missing commas, \
close unclosed brackets and strings, remove anything that is not JSON. Return \
ONLY the corrected JSON object.\n\n{raw}"
    )
}

/// Build the completion prompt for a lesson missing required fields.
///
/// The existing content must survive unchanged; only the named gaps are
/// to be filled.
pub fn build_completion_prompt(lesson: &Lesson) -> String {
    let serialized =
        serde_json::to_string_pretty(lesson).unwrap_or_else(|_| "{}".to_string());
    let missing = missing_fields(lesson).join(", ");
    format!(
        "This English grammar lesson JSON is incomplete. The following parts are \
missing or empty: {missing}. Fill in ONLY the missing parts, keeping every \
existing field exactly as it is. Return the complete lesson as a single JSON \
object and nothing else.\n\n{serialized}"
    )
}

fn missing_fields(lesson: &Lesson) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if lesson.title.trim().is_empty() {
        missing.push("title");
    }
    if lesson.level.trim().is_empty() {
        missing.push("level");
    }
    if lesson.objectives.is_empty() {
        missing.push("objectives");
    }
    if lesson.grammar.is_empty() {
        missing.push("grammar");
    }
    if lesson.examples.is_empty() {
        missing.push("examples");
    }
    if !lesson.exercises.has_any() {
        missing.push("exercises");
    }
    missing
}

/// Build the prompt for regenerating a lesson's exercise set.
///
/// Carries a digest of the grammar content so the new exercises match the
/// lesson without resending the whole object.
pub fn build_exercises_prompt(title: &str, grammar: &[GrammarSection]) -> String {
    let digest = grammar_digest(grammar);
    format!(
        r#"Create a fresh set of exercises for the English grammar lesson "{title}".

The lesson covers:
{digest}

Return ONLY a JSON object with exactly these keys:
{{
  "recognition": [5 multiple-choice items: {{"id", "prompt", "choices", "answer" (index), "explain"}}],
  "gap_fill": [5 items: {{"id", "sentence", "blank", "options", "answer", "explain"}}],
  "transformation": [5 items: {{"id", "source", "instruction", "answer", "explain"}}],
  "error_correction": [5 items: {{"id", "sentence", "error_hint", "answer", "explain"}}],
  "free_production": [2-3 items: {{"id", "task", "sample"}}]
}}"#
    )
}

fn grammar_digest(grammar: &[GrammarSection]) -> String {
    grammar
        .iter()
        .map(|section| {
            let patterns = section
                .patterns
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ");
            let points = section
                .points
                .iter()
                .take(5)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ");
            format!("- {}: patterns: {} | points: {}", section.title, patterns, points)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the prompt for grading a learner sentence against the lesson's
/// grammar content.
pub fn build_grading_prompt(lesson: &Lesson, sentence: &str) -> String {
    let grammar = serde_json::to_string(&lesson.grammar).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"A learner studying the English grammar lesson "{title}" wrote this sentence:

"{sentence}"

The lesson's grammar content: {grammar}

Judge whether the sentence uses the lesson's grammar correctly. Return ONLY a JSON object:
{{"ok": true or false, "feedback": "short explanation in plain English", "corrections": ["corrected versions, empty if the sentence is fine"]}}"#,
        title = lesson.title,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::Exercises;

    #[test]
    fn lesson_prompt_names_topic_and_schema() {
        let prompt = build_lesson_prompt("present perfect");
        assert!(prompt.contains("present perfect"));
        assert!(prompt.contains("\"recognition\""));
        assert!(prompt.contains("\"free_production\""));
        assert!(prompt.contains("B1/Pre-Intermediate"));
    }

    #[test]
    fn repair_prompt_embeds_raw_text() {
        let prompt = build_repair_prompt("{\"broken\": ");
        assert!(prompt.contains("{\"broken\": "));
        assert!(prompt.contains("Fix the JSON"));
    }

    #[test]
    fn completion_prompt_names_the_gaps() {
        let lesson = Lesson {
            title: "Past Simple".into(),
            level: "A2".into(),
            ..Default::default()
        };
        let prompt = build_completion_prompt(&lesson);
        assert!(prompt.contains("objectives"));
        assert!(prompt.contains("exercises"));
        assert!(!prompt.contains("missing or empty: title"));
        assert!(prompt.contains("Past Simple"));
    }

    #[test]
    fn exercises_prompt_digests_grammar() {
        let grammar = vec![GrammarSection {
            title: "Form".into(),
            patterns: vec!["S + V2".into(), "S + did not + V".into()],
            points: vec!["regular -ed".into()],
            ..Default::default()
        }];
        let prompt = build_exercises_prompt("Past Simple", &grammar);
        assert!(prompt.contains("S + V2"));
        assert!(prompt.contains("regular -ed"));
        assert!(prompt.contains("Past Simple"));
    }

    #[test]
    fn grading_prompt_quotes_the_sentence() {
        let lesson = Lesson {
            title: "Present Perfect".into(),
            level: "B1".into(),
            exercises: Exercises::empty(),
            ..Default::default()
        };
        let prompt = build_grading_prompt(&lesson, "I have eat breakfast.");
        assert!(prompt.contains("I have eat breakfast."));
        assert!(prompt.contains("\"ok\""));
    }
}
