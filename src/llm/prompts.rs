//! Prompt templates.

use crate::analysis::TextCorpus;
use crate::config::AnalysisConfig;

/// System prompt for the corpus analysis.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a professional survey data analyst.
You read free-text survey answers and report on them as structured JSON.
Only output JSON that matches the requested schema, with no explanations or markdown."#;

/// System prompt for summary revisions.
pub const REVISION_SYSTEM_PROMPT: &str = r#"You are an experienced analytical editor.
You rewrite survey summaries according to the operator's instructions.
Return only the revised summary text."#;

/// System prompt for question suggestions.
pub const SUGGESTION_SYSTEM_PROMPT: &str = r#"You are an expert in designing effective surveys.
Only output JSON that matches the requested schema."#;

/// Build the analysis prompt for a corpus.
pub fn analysis_prompt(corpus: &TextCorpus, budget: &AnalysisConfig) -> String {
    let mut prompt = String::new();

    prompt.push_str("Analyze the following array of free-text survey answers.\n\n");
    prompt.push_str("Answers (JSON array): ");
    prompt.push_str(&corpus.to_json());
    prompt.push_str("\n\nProduce a JSON object with:\n");
    prompt.push_str(
        "1. sentiment: the share of positive, neutral and negative answers as percentages that add up to 100.\n",
    );
    prompt.push_str(&format!(
        "2. keyThemes: {} to {} key themes raised in the answers, each with a short description.\n",
        budget.min_themes, budget.max_themes
    ));
    prompt.push_str(
        "3. summary: a concise summary (1-2 paragraphs) of the main findings, problems and suggestions.\n",
    );
    prompt.push_str(&format!(
        "4. quotes: for each key theme, {} to {} vivid verbatim quotes from the answers that illustrate it. \
         Use exactly the same theme labels as in keyThemes.\n",
        budget.min_quotes, budget.max_quotes
    ));

    prompt
}

/// Build the revision prompt. All inputs are passed verbatim.
pub fn revision_prompt(
    summary: &str,
    instruction: &str,
    corpus: &TextCorpus,
    use_search: bool,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are given the current survey summary, the answers for context and an editing instruction.\n\n",
    );
    prompt.push_str("**Current summary:**\n");
    prompt.push_str(summary);
    prompt.push_str("\n\n**Context (respondent answers):**\n");
    prompt.push_str(&corpus.to_json());
    prompt.push_str("\n\n**Editing instruction:**\n\"");
    prompt.push_str(instruction);
    prompt.push_str("\"\n\nRewrite the summary according to the instruction.");
    if use_search {
        prompt.push_str(
            " Use web search to enrich the answer with current information where relevant \
             (for example market benchmarks or statistics).",
        );
    }
    prompt.push_str("\nReturn only the revised summary text. Be concise and professional.");

    prompt
}

/// Build the question suggestion prompt.
pub fn suggestion_prompt(topic: &str) -> String {
    format!(
        "Suggest 3-5 relevant questions for a survey about \"{}\". \
         Use different question types: single choice (radio), multiple choice (checkbox), \
         scale (scale) and open text answer (text). \
         For radio and checkbox questions add 3-4 answer options in the 'options' field. \
         For scale and text questions leave 'options' empty.",
        topic
    )
}
