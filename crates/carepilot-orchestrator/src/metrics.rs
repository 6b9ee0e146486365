use carepilot_core::{AgentType, CollaborationMessage, SuccessMetrics};
use std::collections::HashSet;
use std::time::Duration;

/// Words shorter than this are ignored when scoring decision coverage.
const CONTENT_WORD_MIN_LEN: usize = 4;

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Score a finished exchange.
///
/// `provider_calls` counts planning, every contribution and synthesis.
pub fn compute_success_metrics(
    participants: &[AgentType],
    messages: &[CollaborationMessage],
    final_decision: &str,
    provider_calls: usize,
    elapsed: Duration,
) -> SuccessMetrics {
    let contributors: HashSet<&str> = messages
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| m.agent_id.as_str())
        .collect();
    let participation_rate = if participants.is_empty() {
        0.0
    } else {
        contributors.len() as f64 / participants.len() as f64
    };

    let word_sets: Vec<HashSet<String>> = messages.iter().map(|m| words(&m.content)).collect();
    let consensus_level = match word_sets.len() {
        0 => 0.0,
        1 => 1.0,
        n => {
            let mut total = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    total += jaccard(&word_sets[i], &word_sets[j]);
                }
            }
            total / (n * (n - 1) / 2) as f64
        }
    };

    let decision_words = words(final_decision);
    let decision_quality = if decision_words.is_empty() {
        0.0
    } else if word_sets.is_empty() {
        0.5
    } else {
        let reflected = word_sets
            .iter()
            .filter(|set| {
                set.iter()
                    .any(|w| w.chars().count() >= CONTENT_WORD_MIN_LEN && decision_words.contains(w))
            })
            .count();
        (1.0 + reflected as f64 / word_sets.len() as f64) / 2.0
    };

    let efficiency = if provider_calls == 0 {
        0.0
    } else {
        messages.len() as f64 / provider_calls as f64
    };

    SuccessMetrics {
        participation_rate,
        consensus_level,
        decision_quality,
        efficiency,
        duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    }
}
