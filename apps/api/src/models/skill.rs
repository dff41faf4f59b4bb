//! Canonical skill names — normalization used for every skill-set comparison
//! in compliance filtering, keyword scoring, and JD/resume parsing.

/// `(alias, canonical)` pairs. Both the raw mention and the canonical form
/// itself are listed as keys so that `normalize` is idempotent: feeding a
/// canonical name back in always reproduces the same canonical name.
const SKILL_ALIASES: &[(&str, &str)] = &[
    ("ml", "Machine Learning"),
    ("machine learning", "Machine Learning"),
    ("rag", "Retrieval Augmented Generation"),
    (
        "retrieval augmented generation",
        "Retrieval Augmented Generation",
    ),
    ("nlp", "Natural Language Processing"),
    ("natural language processing", "Natural Language Processing"),
    ("cv", "Computer Vision"),
    ("computer vision", "Computer Vision"),
    ("k8s", "Kubernetes"),
    ("kubernetes", "Kubernetes"),
    ("js", "JavaScript"),
    ("javascript", "JavaScript"),
    ("ts", "TypeScript"),
    ("typescript", "TypeScript"),
    ("py", "Python"),
    ("python", "Python"),
    ("ci/cd", "CI/CD"),
    ("cicd", "CI/CD"),
    ("aws", "Amazon Web Services"),
    ("amazon web services", "Amazon Web Services"),
    ("gcp", "Google Cloud Platform"),
    ("google cloud platform", "Google Cloud Platform"),
    ("llm", "Large Language Models"),
    ("llms", "Large Language Models"),
    ("large language models", "Large Language Models"),
    ("ai", "Artificial Intelligence"),
    ("artificial intelligence", "Artificial Intelligence"),
    ("oop", "Object-Oriented Programming"),
    ("object-oriented programming", "Object-Oriented Programming"),
    ("sql", "SQL"),
    ("distributed systems", "Distributed Systems"),
];

/// Lowercases and collapses internal whitespace. This is the comparison key
/// used for case-insensitive matching throughout the compliance filter —
/// ASCII-only per the unicode-case-folding decision in SPEC_FULL.md.
pub fn fold(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonicalizes a skill mention to its display form.
///
/// `normalize(normalize(x)) == normalize(x)` holds for any input: the
/// alias table's canonical values are themselves registered as keys (folded
/// to lowercase), and unknown inputs are title-cased deterministically from
/// their folded form.
pub fn normalize(raw: &str) -> String {
    let folded = fold(raw);
    for (alias, canonical) in SKILL_ALIASES {
        if *alias == folded {
            return (*canonical).to_string();
        }
    }
    title_case(&folded)
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_normalizes_to_canonical() {
        assert_eq!(normalize("ML"), "Machine Learning");
        assert_eq!(normalize("RAG"), "Retrieval Augmented Generation");
        assert_eq!(normalize("k8s"), "Kubernetes");
    }

    #[test]
    fn test_unknown_skill_is_title_cased() {
        assert_eq!(normalize("rust"), "Rust");
        assert_eq!(normalize("distributed   tracing"), "Distributed Tracing");
    }

    #[test]
    fn test_idempotent_on_alias() {
        let once = normalize("ML");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_idempotent_on_unknown() {
        let once = normalize("Snowflake");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_fold_collapses_whitespace_and_case() {
        assert_eq!(fold("  Machine   Learning "), "machine learning");
    }
}
