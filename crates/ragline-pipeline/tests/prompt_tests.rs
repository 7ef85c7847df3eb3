use ragline_pipeline::PromptBuilder;

#[test]
fn no_segments_gives_bare_question() {
    let empty: [&str; 0] = [];
    assert_eq!(PromptBuilder::build("What is X?", &empty), "What is X?");
}

#[test]
fn segments_are_delimited_and_ordered() {
    let prompt = PromptBuilder::build("How do threads work?", &["first segment", "second segment"]);
    let expected = "Answer the user's question accurately and concisely using the reference documents below.\n\
=== REFERENCES BEGIN ===\n\
first segment\n---\nsecond segment\n\
=== REFERENCES END ===\n\
Question: How do threads work?\n\
Notes: 1. Prefer information from the reference documents. 2. If the references do not contain the answer, still try to answer.";
    assert_eq!(prompt, expected);
}

#[test]
fn building_twice_is_identical() {
    let segments = vec!["a".to_string(), "b".to_string()];
    assert_eq!(PromptBuilder::build("q", &segments), PromptBuilder::build("q", &segments));
}
