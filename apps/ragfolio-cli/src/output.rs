use serde_json::json;

use ragfolio_core::RetrievalPolicy;
use ragfolio_retrieval::{ContextOutcome, FallbackReason};

fn reason_str(reason: &FallbackReason) -> String {
    match reason {
        FallbackReason::NoRelevantResults => "no_relevant_results".to_string(),
        FallbackReason::TimedOut => "timed_out".to_string(),
        FallbackReason::RetrievalFailed(e) => format!("retrieval_failed: {}", e),
    }
}

pub fn outcome_json(query: &str, outcome: &ContextOutcome) -> anyhow::Result<String> {
    let value = match outcome {
        ContextOutcome::Retrieved(ctx) => json!({ "query": query, "outcome": "retrieved", "context": ctx }),
        ContextOutcome::Fallback { text, reason } => {
            json!({ "query": query, "outcome": "fallback", "reason": reason_str(reason), "text": text })
        }
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn outcome_human(outcome: &ContextOutcome) -> String {
    match outcome {
        ContextOutcome::Retrieved(ctx) => {
            let category = ctx.category.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string());
            let mut out = format!(
                "category: {}  path: {}  sources: {}{}\n\n",
                category,
                ctx.path.as_str(),
                ctx.sources.len(),
                if ctx.unfiltered_fallback { "  (unfiltered fallback)" } else { "" }
            );
            out.push_str(&ctx.text);
            out
        }
        ContextOutcome::Fallback { text, reason } => {
            format!("static knowledge base ({})\n\n{}", reason_str(reason), text)
        }
    }
}

pub fn policy_human(policy: &RetrievalPolicy) -> String {
    let max_tokens = policy.max_tokens.map(|t| t.to_string()).unwrap_or_else(|| "unlimited".to_string());
    format!(
        "min_score: {}\nscore_threshold: {}\nmax_chunks: {}\nmin_chunks: {}\nmax_tokens: {}",
        policy.min_score, policy.score_threshold, policy.max_chunks, policy.min_chunks, max_tokens
    )
}
