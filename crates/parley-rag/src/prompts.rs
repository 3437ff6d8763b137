use crate::collection::QueryResult;

/// Default system prompt while retrieval augmentation is active.
pub const RAG_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the \
question using the provided context documents and mention the source file of \
any information you use. If the context does not contain the answer, say so \
instead of guessing.";

/// Build the user turn sent to the model when retrieval is active: the
/// retrieved chunks with their sources, then the user's question.
///
/// The transcript keeps the user's original text; only the model sees this
/// augmented form.
pub fn render_rag_prompt(query: &str, results: &[QueryResult]) -> String {
    let mut prompt =
        String::from("Use the following context documents to answer the question.\n\nContext:\n");
    for result in results {
        prompt.push_str(&format!(
            "[source: {}]\n{}\n\n",
            result.chunk.file_name, result.chunk.text
        ));
    }
    prompt.push_str(&format!("Question: {query}"));
    prompt
}

#[cfg(test)]
mod tests {
    use crate::collection::DocumentChunk;

    use super::*;

    fn result(file: &str, text: &str) -> QueryResult {
        QueryResult {
            chunk: DocumentChunk {
                text: text.to_owned(),
                file_name: file.to_owned(),
                chunk_index: 0,
            },
            score: 0.9,
        }
    }

    #[test]
    fn includes_sources_and_question() {
        let prompt = render_rag_prompt(
            "what is the warranty period?",
            &[
                result("warranty.md", "The warranty lasts two years."),
                result("faq.txt", "Returns accepted within 30 days."),
            ],
        );

        assert!(prompt.contains("[source: warranty.md]"));
        assert!(prompt.contains("The warranty lasts two years."));
        assert!(prompt.contains("[source: faq.txt]"));
        assert!(prompt.ends_with("Question: what is the warranty period?"));
    }

    #[test]
    fn renders_without_results() {
        let prompt = render_rag_prompt("anything?", &[]);
        assert!(prompt.ends_with("Question: anything?"));
    }
}
