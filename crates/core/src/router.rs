use crate::classifier::{Classification, Complexity};
use crate::retriever::RetrievalResult;
use providers::ModelTier;
use serde::Serialize;

/// Provenance entry: which article backed an answer and how similar it was
/// to the query. Callers surface these so an answer can always be traced
/// back to the rules that justify it.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleRef {
    pub number: u32,
    pub title: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutedAnswer {
    pub answer: String,
    pub model_used: String,
    pub tier: ModelTier,
    pub articles_used: Vec<ArticleRef>,
    pub classification: Option<Classification>,
}

/// Pick the answering tier. A forced override always wins, including when
/// classification fell back; otherwise only a `complex` label upgrades the
/// query to the deep backend.
pub fn select_tier(force_deep: bool, classification: Option<&Classification>) -> ModelTier {
    if force_deep {
        return ModelTier::Deep;
    }
    match classification.map(|c| c.complexity) {
        Some(Complexity::Complex) => ModelTier::Deep,
        _ => ModelTier::Fast,
    }
}

/// Assemble the grounding prompt for the selected tier.
///
/// The fast tier gets the top three articles with bodies truncated, for a
/// brief answer; the deep tier gets every retrieved article in full. Both
/// instruct the backend to answer only from the provided material.
pub fn build_prompt(tier: ModelTier, query: &str, results: &[RetrievalResult]) -> String {
    match tier {
        ModelTier::Fast => {
            let articles = results
                .iter()
                .take(3)
                .map(|r| {
                    format!(
                        "Article {}: {}\n{}...",
                        r.article.number,
                        r.article.title,
                        truncate_chars(&r.article.body, 500)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            format!(
                "Based on these arbitration rules, answer briefly and only from the \
                 provided articles:\n\n{articles}\n\nQuestion: {query}\n\nAnswer concisely:"
            )
        }
        ModelTier::Deep => {
            let articles = results
                .iter()
                .map(|r| {
                    format!(
                        "Article {}: {}\n{}",
                        r.article.number, r.article.title, r.article.body
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            format!(
                "You are an expert in institutional arbitration rules. Answer this \
                 question using only the provided articles:\n\nRelevant articles:\n\
                 {articles}\n\nQuestion: {query}\n\n\
                 Provide a detailed, accurate answer based on the rules:"
            )
        }
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier;
    use crate::extractor::Article;

    fn result(number: u32, body: &str) -> RetrievalResult {
        RetrievalResult {
            article: Article {
                number,
                title: format!("Title {number}"),
                body: body.to_string(),
                categories: vec!["general".into()],
            },
            similarity: 0.5,
        }
    }

    #[test]
    fn force_deep_always_wins() {
        assert_eq!(select_tier(true, None), ModelTier::Deep);
        let simple = Classification {
            topic: "cost".into(),
            keywords: vec![],
            complexity: Complexity::Simple,
        };
        assert_eq!(select_tier(true, Some(&simple)), ModelTier::Deep);
        // Including when classification degraded to the fallback.
        let fb = classifier::fallback("some query");
        assert_eq!(select_tier(true, Some(&fb)), ModelTier::Deep);
    }

    #[test]
    fn complex_classification_routes_deep() {
        let complex = Classification {
            topic: "award".into(),
            keywords: vec![],
            complexity: Complexity::Complex,
        };
        assert_eq!(select_tier(false, Some(&complex)), ModelTier::Deep);
    }

    #[test]
    fn default_route_is_fast() {
        assert_eq!(select_tier(false, None), ModelTier::Fast);
        let fb = classifier::fallback("q");
        assert_eq!(select_tier(false, Some(&fb)), ModelTier::Fast);
    }

    #[test]
    fn fast_prompt_takes_top_three_truncated() {
        let long_body = "x".repeat(600);
        let results = vec![
            result(1, &long_body),
            result(2, "short"),
            result(3, "short"),
            result(4, "should not appear"),
        ];
        let prompt = build_prompt(ModelTier::Fast, "what?", &results);
        assert!(prompt.contains("Article 1"));
        assert!(prompt.contains("Article 3"));
        assert!(!prompt.contains("Article 4"));
        assert!(!prompt.contains(&long_body));
        assert!(prompt.contains(&"x".repeat(500)));
    }

    #[test]
    fn deep_prompt_uses_all_articles_in_full() {
        let long_body = "y".repeat(600);
        let results = vec![result(1, &long_body), result(4, "tail article")];
        let prompt = build_prompt(ModelTier::Deep, "what?", &results);
        assert!(prompt.contains(&long_body));
        assert!(prompt.contains("Article 4"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "ä".repeat(510);
        assert_eq!(truncate_chars(&s, 500).chars().count(), 500);
        assert_eq!(truncate_chars("short", 500), "short");
    }
}
