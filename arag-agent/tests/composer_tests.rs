//! Answer composer behavior with a scripted model.

use std::sync::Arc;

use arag_agent::{AnswerComposer, FALLBACK_ANSWER, SYSTEM_PROMPT};
use arag_core::{AragError, Part, Result, Tool};
use arag_model::MockLlm;
use arag_rag::{
    Document, EmbeddingIndex, HashingEmbeddingProvider, InMemoryVectorStore, RecursiveChunker,
    Retriever, split_documents,
};
use async_trait::async_trait;
use serde_json::{Value, json};

struct FakeWikipedia;

#[async_trait]
impl Tool for FakeWikipedia {
    fn name(&self) -> &str {
        "wikipedia"
    }
    fn description(&self) -> &str {
        "Search Wikipedia for general knowledge."
    }
    async fn execute(&self, _args: Value) -> Result<Value> {
        Ok(json!({"result": "Page: Agent\nSummary: Something that acts."}))
    }
}

async fn retriever(docs: Vec<Document>) -> Retriever {
    let index = Arc::new(EmbeddingIndex::new(
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
    ));
    let chunks = split_documents(&RecursiveChunker::new(500, 50).unwrap(), &docs);
    index.build(chunks).await.unwrap();
    Retriever::new(index, Retriever::DEFAULT_K)
}

fn composer(model: Arc<MockLlm>, retriever: Retriever) -> AnswerComposer {
    AnswerComposer::new(model, retriever, Arc::new(FakeWikipedia))
}

#[tokio::test]
async fn agent_is_built_once_across_questions() {
    let model = Arc::new(MockLlm::new("mock").with_text("first").with_text("second"));
    let composer = composer(model.clone(), retriever(Vec::new()).await);
    assert!(!composer.is_agent_built());

    assert_eq!(composer.compose("one?", &[]).await.unwrap(), "first");
    assert!(composer.is_agent_built());
    assert_eq!(composer.compose("two?", &[]).await.unwrap(), "second");

    for request in model.requests() {
        assert_eq!(request.system_instruction.as_deref(), Some(SYSTEM_PROMPT));
        let tools: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tools, vec!["retriever", "wikipedia"]);
        assert_eq!(request.contents.len(), 1);
    }
}

#[tokio::test]
async fn retriever_tool_reads_the_index() {
    let docs = vec![
        Document::new("agent", "Agents use an agent loop to plan and act.", "agent.txt")
            .with_metadata("title", "Agent Loop"),
    ];
    let model = Arc::new(
        MockLlm::new("mock")
            .with_function_call("retriever", json!({"query": "agent loop"}))
            .with_text("An agent loop plans and acts."),
    );
    let composer = composer(model.clone(), retriever(docs).await);

    let answer = composer.compose("What is an agent loop?", &[]).await.unwrap();
    assert_eq!(answer, "An agent loop plans and acts.");

    let second = &model.requests()[1];
    let Part::FunctionResponse { name, response, .. } = &second.contents[2].parts[0] else {
        panic!("expected a function response");
    };
    assert_eq!(name, "retriever");
    assert_eq!(response["result"], "[1] Agent Loop\nAgents use an agent loop to plan and act.");
}

#[tokio::test]
async fn empty_index_still_answers() {
    let model = Arc::new(
        MockLlm::new("mock")
            .with_function_call("retriever", json!({"query": "xyz123"}))
            .with_text("I don't know."),
    );
    let composer = composer(model.clone(), retriever(Vec::new()).await);

    let answer = composer.compose("unanswerable nonsense query xyz123", &[]).await.unwrap();
    assert_eq!(answer, "I don't know.");

    let Part::FunctionResponse { response, .. } = &model.requests()[1].contents[2].parts[0] else {
        panic!("expected a function response");
    };
    assert_eq!(response["result"], "No documents found.");
}

#[tokio::test]
async fn missing_text_falls_back() {
    let model = Arc::new(MockLlm::new("mock"));
    let composer = composer(model, retriever(Vec::new()).await);
    assert_eq!(composer.compose("anything", &[]).await.unwrap(), FALLBACK_ANSWER);
}

#[tokio::test]
async fn iteration_limit_falls_back() {
    let mut mock = MockLlm::new("mock");
    for _ in 0..5 {
        mock = mock.with_function_call("wikipedia", json!({"query": "loop"}));
    }
    let model = Arc::new(mock);
    let composer = composer(model.clone(), retriever(Vec::new()).await).with_max_iterations(2);

    assert_eq!(composer.compose("loop forever", &[]).await.unwrap(), FALLBACK_ANSWER);
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn model_failure_is_an_error() {
    let model = Arc::new(MockLlm::new("mock").with_error(AragError::Model("quota".into())));
    let composer = composer(model, retriever(Vec::new()).await);
    assert!(matches!(composer.compose("q", &[]).await, Err(AragError::Model(_))));
}
