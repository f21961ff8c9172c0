use providers::GenerativeProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Advisory routing signal produced fresh per query; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub complexity: Complexity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

fn default_topic() -> String {
    "general".to_string()
}

/// The designed degradation path when the backend is unavailable or its
/// output is unusable. Deterministic, and never an error.
pub fn fallback(query: &str) -> Classification {
    Classification {
        topic: "general".to_string(),
        keywords: query.split_whitespace().map(str::to_string).collect(),
        complexity: Complexity::Medium,
    }
}

fn classification_prompt(query: &str) -> String {
    format!(
        "Analyze this arbitration question and extract:\n\
         1. Main topic (deadline, cost, tribunal, procedure, award, general)\n\
         2. Keywords\n\
         3. Complexity (simple/medium/complex)\n\
         \n\
         Question: {query}\n\
         \n\
         Respond ONLY with valid JSON in this exact format:\n\
         {{\"topic\": \"deadline\", \"keywords\": [\"challenge\", \"arbitrator\"], \"complexity\": \"simple\"}}"
    )
}

/// Locate the first balanced `{...}` span in free-form model output.
///
/// Skips anything before the opening brace, so code fences and prose
/// wrapping fall away without a separate stripping pass. String literals
/// are tracked so braces inside them don't unbalance the scan.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn parse_classification(raw: &str) -> Option<Classification> {
    let span = extract_json_object(raw)?;
    serde_json::from_str(span).ok()
}

/// Ask the fast backend to label the query. Backend and parse failures
/// both degrade to [`fallback`]; this function cannot fail, and its
/// failures are never conflated with retrieval or generation errors.
pub async fn classify(
    query: &str,
    provider: &dyn GenerativeProvider,
    model: &str,
) -> Classification {
    let prompt = classification_prompt(query);
    match provider.generate(&prompt, model).await {
        Ok(raw) => parse_classification(&raw).unwrap_or_else(|| {
            debug!("classifier output unparsable, using fallback");
            fallback(query)
        }),
        Err(e) => {
            debug!(error = %e, "classifier backend failed, using fallback");
            fallback(query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str =
        r#"{"topic": "cost", "keywords": ["registration", "fee"], "complexity": "simple"}"#;

    #[test]
    fn parses_plain_json() {
        let c = parse_classification(PLAIN).unwrap();
        assert_eq!(c.topic, "cost");
        assert_eq!(c.keywords, vec!["registration", "fee"]);
        assert_eq!(c.complexity, Complexity::Simple);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{PLAIN}\n```");
        assert_eq!(parse_classification(&fenced), parse_classification(PLAIN));
    }

    #[test]
    fn parses_json_buried_in_prose() {
        let wrapped = format!("Sure, here is the classification:\n{PLAIN}\nHope that helps!");
        assert_eq!(parse_classification(&wrapped), parse_classification(PLAIN));
    }

    #[test]
    fn braces_inside_strings_do_not_unbalance() {
        let tricky = r#"{"topic": "gen{eral}", "keywords": [], "complexity": "medium"}"#;
        let c = parse_classification(tricky).unwrap();
        assert_eq!(c.topic, "gen{eral}");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c = parse_classification(r#"{"topic": "award"}"#).unwrap();
        assert!(c.keywords.is_empty());
        assert_eq!(c.complexity, Complexity::Medium);
    }

    #[test]
    fn malformed_output_yields_none() {
        assert!(parse_classification("no json here").is_none());
        assert!(parse_classification("{ truncated").is_none());
        assert!(parse_classification(r#"{"complexity": "impossible"}"#).is_none());
    }

    #[test]
    fn fallback_splits_query_into_keywords() {
        let c = fallback("deadline to challenge an arbitrator");
        assert_eq!(c.topic, "general");
        assert_eq!(
            c.keywords,
            vec!["deadline", "to", "challenge", "an", "arbitrator"]
        );
        assert_eq!(c.complexity, Complexity::Medium);
    }

    #[tokio::test]
    async fn backend_failure_never_raises() {
        let provider = providers::noop::NoopProvider;
        let c = classify("what are the costs?", &provider, "any-model").await;
        assert_eq!(c, fallback("what are the costs?"));
    }
}
