// Interview LLM prompt templates.
// All prompts for the interview module are defined here.

pub const QUESTION_SYSTEM: &str = "\
You are a senior technical interviewer running a structured, spoken interview. \
Ask exactly one question at a time, phrased so it can be read aloud. \
Ground every question in the candidate's resume and the job description. \
You MUST respond with valid JSON only, without markdown fences or explanations.";

pub const QUESTION_PROMPT: &str = r#"Generate the next interview question for stage {stage} of 2.
Stage 1 is a screening round on fundamentals and resume claims.
Stage 2 is a final round on depth, trade-offs and role-specific scenarios.

CANDIDATE RESUME:
{resume_text}

JOB DESCRIPTION:
{job_description}

QUESTIONS ALREADY ASKED (do NOT repeat or paraphrase any of these):
{asked_questions}

OUTPUT SCHEMA (return exactly this structure):
{
  "question": "string",
  "expectedKeywords": ["string"]
}

"expectedKeywords" lists 3-8 concepts a strong answer would mention."#;

pub const EVALUATION_SYSTEM: &str = "\
You are a fair, calibrated interview assessor. \
Score answers strictly on substance relative to the question and the role. \
Do not reward length or confidence without content. \
You MUST respond with valid JSON only, without markdown fences or explanations.";

pub const EVALUATION_PROMPT: &str = r#"Evaluate the candidate's answer.

QUESTION:
{question}

ANSWER:
{answer}

ROLE CONTEXT (job description excerpt):
{job_description_excerpt}

OUTPUT SCHEMA (return exactly this structure):
{
  "score": number,            // 0-100
  "rating": "poor" | "fair" | "good" | "excellent",
  "feedback": "string",       // 1-3 sentences addressed to the recruiter
  "confidenceHint": number    // 0-100, how confident the candidate sounded
}

Rating bands: poor < 40, fair 40-59, good 60-79, excellent >= 80."#;

/// Longest job description excerpt sent with an answer evaluation, in chars.
pub const JOB_DESCRIPTION_EXCERPT_CHARS: usize = 1500;

pub fn render_question_prompt(
    stage: u8,
    resume_text: &str,
    job_description: &str,
    asked_questions: &[String],
) -> String {
    let asked = if asked_questions.is_empty() {
        "(none)".to_string()
    } else {
        asked_questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n")
    };
    fill(
        QUESTION_PROMPT,
        &[
            ("stage", stage.to_string().as_str()),
            ("resume_text", resume_text),
            ("job_description", job_description),
            ("asked_questions", asked.as_str()),
        ],
    )
}

pub fn render_evaluation_prompt(question: &str, answer: &str, job_description: &str) -> String {
    fill(
        EVALUATION_PROMPT,
        &[
            ("question", question),
            ("answer", answer),
            (
                "job_description_excerpt",
                excerpt(job_description, JOB_DESCRIPTION_EXCERPT_CHARS),
            ),
        ],
    )
}

/// Substitutes `{name}` placeholders in one pass over the template, so text
/// that was substituted in is never scanned for placeholders again. Braces that
/// do not name a known placeholder (the JSON schemas) are kept as written.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let placeholder = values.iter().find(|(name, _)| {
            tail.starts_with(name) && tail[name.len()..].starts_with('}')
        });
        match placeholder {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
