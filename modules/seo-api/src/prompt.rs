use ai_client::Message;
use serp_client::ResultRecord;

use crate::analysis::AnalysisQuery;

const SYSTEM_PROMPT: &str = "You are a senior SEO strategist. Given live Google organic results for a \
keyword and the domain a client wants to rank, explain who currently ranks and why, where the client's \
domain stands, and give concrete, prioritized recommendations for content, on-page optimization and \
links. Be specific to the results provided. Do not invent rankings that are not in the data.";

pub fn analysis_messages(query: &AnalysisQuery, sample: &[ResultRecord]) -> Vec<Message> {
    vec![Message::system(SYSTEM_PROMPT), Message::user(user_prompt(query, sample))]
}

fn user_prompt(query: &AnalysisQuery, sample: &[ResultRecord]) -> String {
    let results = if sample.is_empty() {
        "No organic results were returned for this keyword.".to_string()
    } else {
        serde_json::to_string_pretty(sample).unwrap_or_else(|_| "[]".to_string())
    };

    format!(
        "Keyword: {keyword}\n\
         Target domain: {domain}\n\
         Location code: {location}\n\
         Language: {language}\n\
         Device: {device}\n\n\
         Top organic results ({count}):\n{results}",
        keyword = query.keyword,
        domain = query.domain,
        location = query.location_code,
        language = query.language_code,
        device = query.device,
        count = sample.len(),
    )
}
