//! Instruction prompt for turning a question into an OpenSearch `query` clause.

/// A field of the movie index as described to the model.
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
}

pub const MOVIE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "title",
        description: "text, the movie title",
    },
    FieldSpec {
        name: "director",
        description: "text, full name of the director",
    },
    FieldSpec {
        name: "year",
        description: "text holding a four digit release year, e.g. \"2011\"",
    },
];

pub const SUPPORTED_CLAUSES: &[&str] = &["match", "multi_match", "range", "bool"];

pub fn build(question: &str) -> String {
    let mut prompt = String::from(
        "Translate the question below into the \"query\" clause of an OpenSearch search request.\n\
         The index holds movies with these fields:\n",
    );
    for field in MOVIE_FIELDS {
        prompt.push_str(&format!("- {}: {}\n", field.name, field.description));
    }
    prompt.push_str(&format!(
        "Use only these query types: {}.\n",
        SUPPORTED_CLAUSES.join(", ")
    ));
    prompt.push_str(
        "Answer with the clause alone, written as \"query\": { ... }, \
         with no surrounding braces, no size and no explanation.\n\n",
    );
    prompt.push_str(&format!("Question: {question}\n"));
    prompt
}
