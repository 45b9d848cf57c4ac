//! Continuation/escalation/skip predicates and the keyword-confidence
//! scoring table used to route a turn without invoking the LLM
//! classifier.

use crate::agent::RoutingAgent;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

const AFFIRMATIONS: &[&str] = &["yes", "yeah", "yep", "ok", "confirm", "create", "proceed", "sure"];

/// Step 2: short-affirmation continuation check, only meaningful when the
/// session already has an `active_agent`.
pub fn is_continuation(message: &str) -> bool {
    let lower = message.trim().to_ascii_lowercase();
    AFFIRMATIONS.iter().any(|word| lower.contains(word))
}

const ESCALATION_PHRASES: &[&str] = &[
    "speak to someone",
    "talk to human",
    "human agent",
    "support ticket",
    "escalate",
    "complaint",
    "i want to speak",
    "file complaint",
];

/// Step 3: escalation fast-path.
pub fn is_escalation_fast_path(query: &str) -> bool {
    let lower = query.to_ascii_lowercase();
    ESCALATION_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

const FINANCIAL_ADVICE_KEYWORDS: &[&str] = &[
    "financial", "financially", "budget", "save money", "debt", "avalanche", "snowball", "invest",
    "investment", "retirement", "financial security", "financial advice", "money management",
    "spending habits", "financial goal", "how to be",
];

const PRODUCT_INFO_KEYWORDS: &[&str] = &[
    "interest rate", "savings account", "loan", "credit card", "fixed deposit", "td bonus",
    "account type", "eligibility", "fees", "charges", "product", "what is", "what are", "explain",
    "tell me about",
];

const TRANSACTION_KEYWORDS: &[&str] =
    &["transaction", "history", "spent", "spending", "purchase", "payment history"];

const PAYMENT_KEYWORDS: &[&str] = &["pay", "send money", "beneficiary", "recipient", "payment", "remit"];

const ACCOUNT_KEYWORDS: &[&str] = &["balance", "account", "detail", "information"];

const ESCALATION_KEYWORDS: &[&str] = &["ticket", "escalate", "complaint", "issue", "problem", "help", "support"];

const ESCALATION_BOOST_PHRASES: &[&str] = &["create ticket", "open ticket", "need help", "file complaint"];

const TRANSFER_MISSPELLINGS: &[&str] = &["trnasfer", "trasfer", "tranfer", "transfe", "transfr"];

const WRITE_INTENT_KEYWORDS: &[&str] = &["pay", "transfer", "send money", "create", "add"];

static CURRENCY_TO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\s*(thb|baht|\x{0e3f}|\$|usd)\s+to\s+\w+").expect("valid regex"));

fn count_matches(lower: &str, keywords: &[&str]) -> i32 {
    keywords.iter().filter(|kw| lower.contains(*kw)).count() as i32
}

/// Step 6: scores each candidate agent. Returns the raw table so callers
/// can inspect ties; `select_high_confidence` applies the `max_score >= 2`
/// and unique-argmax rule.
pub fn score_agents(query: &str) -> HashMap<RoutingAgent, i32> {
    let lower = query.to_ascii_lowercase();
    let mut scores = HashMap::new();

    scores.insert(RoutingAgent::AiMoneyCoach, count_matches(&lower, FINANCIAL_ADVICE_KEYWORDS));
    scores.insert(RoutingAgent::ProductInfo, count_matches(&lower, PRODUCT_INFO_KEYWORDS));
    scores.insert(RoutingAgent::Transaction, count_matches(&lower, TRANSACTION_KEYWORDS));
    scores.insert(RoutingAgent::Account, count_matches(&lower, ACCOUNT_KEYWORDS));

    let mut payment_score = count_matches(&lower, PAYMENT_KEYWORDS);
    if TRANSFER_MISSPELLINGS.iter().any(|kw| lower.contains(kw)) {
        payment_score += 2;
    }
    if CURRENCY_TO_REGEX.is_match(&lower) {
        payment_score += 3;
    }
    scores.insert(RoutingAgent::Payment, payment_score);

    let mut escalation_score = count_matches(&lower, ESCALATION_KEYWORDS);
    if ESCALATION_BOOST_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        escalation_score += 3;
    }
    scores.insert(RoutingAgent::Escalation, escalation_score);

    scores
}

/// `max_score >= 2` and a unique argmax selects that agent with high
/// confidence; otherwise the caller must fall through to the LLM routing
/// classifier.
pub fn select_high_confidence(scores: &HashMap<RoutingAgent, i32>) -> Option<RoutingAgent> {
    let max_score = *scores.values().max().unwrap_or(&0);
    if max_score < 2 {
        return None;
    }
    let mut leaders = scores.iter().filter(|(_, score)| **score == max_score);
    let (agent, _) = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }
    Some(*agent)
}

/// Step 5 skip-cache predicates: knowledge-only paths and write-intent
/// queries should never consult the cache classifier.
pub fn is_write_intent(query: &str) -> bool {
    let lower = query.to_ascii_lowercase();
    WRITE_INTENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub fn is_financial_advice(query: &str) -> bool {
    let lower = query.to_ascii_lowercase();
    FINANCIAL_ADVICE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub fn is_product_info(query: &str) -> bool {
    let lower = query.to_ascii_lowercase();
    PRODUCT_INFO_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_matches_short_affirmations_only() {
        assert!(is_continuation("Yes please"));
        assert!(is_continuation("ok"));
        assert!(!is_continuation("what is my balance"));
    }

    #[test]
    fn escalation_fast_path_matches_known_phrases() {
        assert!(is_escalation_fast_path("I want to speak to someone"));
        assert!(!is_escalation_fast_path("what is my balance"));
    }

    #[test]
    fn payment_score_boosted_by_fuzzy_transfer_and_currency_pattern() {
        let scores = score_agents("can you trnasfer 100 thb to john");
        assert!(scores[&RoutingAgent::Payment] >= 2 + 3);
    }

    #[test]
    fn high_confidence_requires_unique_argmax_at_or_above_two() {
        let mut scores = HashMap::new();
        scores.insert(RoutingAgent::Account, 2);
        scores.insert(RoutingAgent::Payment, 2);
        assert_eq!(select_high_confidence(&scores), None);

        let mut scores = HashMap::new();
        scores.insert(RoutingAgent::Account, 1);
        scores.insert(RoutingAgent::Payment, 0);
        assert_eq!(select_high_confidence(&scores), None);

        let mut scores = HashMap::new();
        scores.insert(RoutingAgent::Account, 3);
        scores.insert(RoutingAgent::Payment, 1);
        assert_eq!(select_high_confidence(&scores), Some(RoutingAgent::Account));
    }

    #[test]
    fn write_intent_detects_transfer_and_payment_verbs() {
        assert!(is_write_intent("please transfer 50 to mary"));
        assert!(!is_write_intent("what is my balance"));
    }
}
