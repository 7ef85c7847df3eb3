const PREAMBLE: &str = "Answer the user's question accurately and concisely using the reference documents below.";
const REFS_BEGIN: &str = "=== REFERENCES BEGIN ===";
const REFS_END: &str = "=== REFERENCES END ===";
const SEPARATOR: &str = "\n---\n";
const NOTES: &str = "Notes: 1. Prefer information from the reference documents. 2. If the references do not contain the answer, still try to answer.";

/// Turns a question and its retrieved segments into a single model prompt.
///
/// Segment text is inserted verbatim; nothing here escapes content that
/// imitates the delimiters.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build<S: AsRef<str>>(question: &str, segments: &[S]) -> String {
        if segments.is_empty() {
            return question.to_string();
        }
        let references = segments.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(SEPARATOR);
        format!("{PREAMBLE}\n{REFS_BEGIN}\n{references}\n{REFS_END}\nQuestion: {question}\n{NOTES}")
    }
}
