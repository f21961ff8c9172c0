use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// One addressable section of the rules text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub number: u32,
    pub title: String,
    pub body: String,
    /// Filled in by the taxonomy tagger; non-empty after tagging.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Article {
    /// Canonical text used for embedding and for grounding prompts.
    /// Always regenerated from the parts so it cannot drift from them.
    pub fn full_text(&self) -> String {
        format!("Article {} {}\n\n{}", self.number, self.title, self.body)
    }
}

/// What to do when the document repeats an article number, e.g. an
/// appendix that restarts numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Repeated numbers stay distinct sections (safe default).
    #[default]
    Keep,
    /// Append the body of a repeated number to its first occurrence.
    Merge,
}

struct Heading<'a> {
    start: usize,
    body_start: usize,
    number: u32,
    title: &'a str,
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*Article (\d+)[ \t]+([^\n]+)").expect("heading pattern")
    })
}

fn appendix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*Appendix\b").expect("appendix pattern"))
}

/// Parse the full document text into ordered articles.
///
/// A heading is a line of the form `Article <integer> <title>`; the body
/// runs until the next heading, an `Appendix` boundary line, or end of
/// text. A document with no headings yields an empty vec, not an error.
pub fn extract_articles(text: &str, policy: DuplicatePolicy) -> Vec<Article> {
    let mut headings: Vec<Heading<'_>> = Vec::new();
    for caps in heading_re().captures_iter(text) {
        let whole = caps.get(0).expect("match group 0");
        // A number too large for u32 is not a plausible heading; skip it.
        let number = match caps[1].parse::<u32>() {
            Ok(n) => n,
            Err(_) => continue,
        };
        let title = caps.get(2).expect("title group").as_str().trim();
        headings.push(Heading {
            start: whole.start(),
            body_start: whole.end(),
            number,
            title,
        });
    }

    if headings.is_empty() {
        return Vec::new();
    }

    let appendix_starts: Vec<usize> = appendix_re().find_iter(text).map(|m| m.start()).collect();

    let mut articles: Vec<Article> = Vec::new();
    let mut first_seen: HashMap<u32, usize> = HashMap::new();

    for (i, h) in headings.iter().enumerate() {
        let mut body_end = headings
            .get(i + 1)
            .map(|next| next.start)
            .unwrap_or(text.len());
        if let Some(&appendix) = appendix_starts
            .iter()
            .find(|&&pos| pos >= h.body_start && pos < body_end)
        {
            body_end = appendix;
        }
        let body = text[h.body_start..body_end].trim().to_string();

        if policy == DuplicatePolicy::Merge {
            if let Some(&idx) = first_seen.get(&h.number) {
                let existing = &mut articles[idx].body;
                if !body.is_empty() {
                    if !existing.is_empty() {
                        existing.push_str("\n\n");
                    }
                    existing.push_str(&body);
                }
                continue;
            }
        }

        first_seen.entry(h.number).or_insert(articles.len());
        articles.push(Article {
            number: h.number,
            title: h.title.to_string(),
            body,
            categories: Vec::new(),
        });
    }

    tracing::debug!(count = articles.len(), "extracted articles");
    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "SCC Arbitration Rules\n\
        \n\
        Article 1 Scope of application\n\
        These rules govern arbitrations.\n\
        Further scope text.\n\
        \n\
        Article 2 Costs\n\
        The parties share costs.\n\
        \n\
        Article 3 Awards\n\
        Awards are final and binding.\n";

    #[test]
    fn extracts_all_headings_in_order() {
        let articles = extract_articles(DOC, DuplicatePolicy::Keep);
        assert_eq!(articles.len(), 3);
        assert_eq!(
            articles.iter().map(|a| a.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(articles[0].title, "Scope of application");
        assert_eq!(articles[1].title, "Costs");
        assert_eq!(articles[2].title, "Awards");
    }

    #[test]
    fn body_is_bounded_by_next_heading() {
        let articles = extract_articles(DOC, DuplicatePolicy::Keep);
        assert!(articles[0].body.contains("Further scope text."));
        assert!(!articles[0].body.contains("Article 2"));
        assert_eq!(articles[1].body, "The parties share costs.");
        assert_eq!(articles[2].body, "Awards are final and binding.");
    }

    #[test]
    fn no_headings_yields_empty_not_error() {
        let articles = extract_articles("just prose, no structure", DuplicatePolicy::Keep);
        assert!(articles.is_empty());
    }

    #[test]
    fn heading_with_empty_body() {
        let text = "Article 1 Scope\nArticle 2 Costs\nbody here";
        let articles = extract_articles(text, DuplicatePolicy::Keep);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].body, "");
        assert_eq!(articles[1].body, "body here");
    }

    #[test]
    fn body_stops_at_appendix_boundary() {
        let text = "Article 51 Confidentiality\nsecret things\nAppendix I\nboard rules";
        let articles = extract_articles(text, DuplicatePolicy::Keep);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].body, "secret things");
    }

    #[test]
    fn duplicate_numbers_kept_distinct_by_default() {
        let text = "Article 1 Scope\nmain body\nAppendix I\nArticle 1 Board scope\nappendix body";
        let articles = extract_articles(text, DuplicatePolicy::Keep);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].body, "main body");
        assert_eq!(articles[1].body, "appendix body");
    }

    #[test]
    fn duplicate_numbers_merge_when_configured() {
        let text = "Article 1 Scope\nmain body\nAppendix I\nArticle 1 Board scope\nappendix body";
        let articles = extract_articles(text, DuplicatePolicy::Merge);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].body, "main body\n\nappendix body");
        assert_eq!(articles[0].title, "Scope");
    }

    #[test]
    fn full_text_is_regenerated_from_parts() {
        let articles = extract_articles(DOC, DuplicatePolicy::Keep);
        for a in &articles {
            assert_eq!(
                a.full_text(),
                format!("Article {} {}\n\n{}", a.number, a.title, a.body)
            );
        }
    }

    #[test]
    fn cross_reference_inside_a_line_is_not_a_heading() {
        let text = "Article 1 Scope\nAs stated in Article 2 of the Rules, costs apply.\n";
        let articles = extract_articles(text, DuplicatePolicy::Keep);
        assert_eq!(articles.len(), 1);
        assert!(articles[0].body.contains("Article 2 of the Rules"));
    }
}
