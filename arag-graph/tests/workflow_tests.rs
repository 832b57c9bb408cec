use std::sync::Arc;

use arag_agent::{AnswerComposer, FALLBACK_ANSWER};
use arag_core::{AragError, Result as CoreResult, Tool};
use arag_graph::{CompiledGraph, GraphBuilder, GraphError, Node, Phase, RagState};
use arag_model::MockLlm;
use arag_rag::{
    Document, EmbeddingIndex, HashingEmbeddingProvider, InMemoryVectorStore, RecursiveChunker,
    Retriever, split_documents,
};
use async_trait::async_trait;
use serde_json::{Value, json};

struct NoWikipedia;

#[async_trait]
impl Tool for NoWikipedia {
    fn name(&self) -> &str {
        "wikipedia"
    }
    fn description(&self) -> &str {
        "Search Wikipedia for general knowledge."
    }
    async fn execute(&self, _args: Value) -> CoreResult<Value> {
        Ok(json!({"result": "No good Wikipedia Search Result was found"}))
    }
}

async fn retriever(docs: Vec<Document>) -> Retriever {
    let index = Arc::new(EmbeddingIndex::new(
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
    ));
    index.build(split_documents(&RecursiveChunker::new(500, 50).unwrap(), &docs)).await.unwrap();
    Retriever::new(index, 1)
}

fn graph(model: MockLlm, retriever: Retriever) -> GraphBuilder {
    let composer = AnswerComposer::new(Arc::new(model), retriever.clone(), Arc::new(NoWikipedia));
    GraphBuilder::new(retriever, Arc::new(composer))
}

#[tokio::test]
async fn run_fills_docs_then_answer() {
    let docs = vec![
        Document::new("agent", "Agents use an agent loop to plan and act.", "agent.txt")
            .with_metadata("title", "Agent Loop"),
        Document::new("video", "Diffusion models generate video by denoising.", "video.txt")
            .with_metadata("title", "Diffusion Video"),
    ];
    let builder = graph(MockLlm::new("mock").with_text("Plan, act, repeat."), retriever(docs).await);
    assert!(!builder.is_built());

    let state = builder.run("What is an agent loop?").await.unwrap();

    assert!(builder.is_built());
    assert_eq!(state.phase(), Phase::Answered);
    assert_eq!(state.answer.as_deref(), Some("Plan, act, repeat."));
    assert_eq!(state.docs().len(), 1);
    assert_eq!(state.docs()[0].document_id, "agent");
}

#[tokio::test]
async fn compiled_stages_are_fixed() {
    let builder = graph(MockLlm::new("mock"), retriever(Vec::new()).await);
    let first = builder.build() as *const CompiledGraph;
    let second = builder.build() as *const CompiledGraph;

    assert_eq!(first, second);
    assert_eq!(builder.build().stage_names(), vec!["retriever", "responder"]);
}

#[tokio::test]
async fn unanswerable_question_over_empty_index_does_not_fail() {
    let builder = graph(MockLlm::new("mock"), retriever(Vec::new()).await);

    let state = builder.run("unanswerable nonsense query xyz123").await.unwrap();
    assert_eq!(state.answer.as_deref(), Some(FALLBACK_ANSWER));
    assert!(state.docs().is_empty());
}

#[tokio::test]
async fn model_failure_surfaces_as_composition_error() {
    let model = MockLlm::new("mock").with_error(AragError::Model("quota".into()));
    let builder = graph(model, retriever(Vec::new()).await);

    assert!(matches!(builder.run("q").await, Err(GraphError::Composition(_))));
}

#[tokio::test]
async fn unbuilt_index_surfaces_as_retrieval_error() {
    let index = Arc::new(EmbeddingIndex::new(
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
    ));
    let builder = graph(MockLlm::new("mock"), Retriever::new(index, 4));

    assert!(matches!(builder.run("q").await, Err(GraphError::Retrieval(_))));
}

struct Stalled;

#[async_trait]
impl Node for Stalled {
    fn name(&self) -> &str {
        "stalled"
    }
    fn input_phase(&self) -> Phase {
        Phase::Initial
    }
    fn output_phase(&self) -> Phase {
        Phase::Retrieved
    }
    async fn run(&self, state: RagState) -> arag_graph::Result<RagState> {
        Ok(state)
    }
}

#[tokio::test]
async fn stage_that_does_not_advance_is_invalid() {
    let graph = CompiledGraph::new(vec![Arc::new(Stalled)]);

    let err = graph.invoke("q").await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::InvalidTransition { ref stage, from: Phase::Initial, expected: Phase::Retrieved }
            if stage == "stalled"
    ));
}

#[tokio::test]
async fn stage_out_of_order_is_invalid() {
    let retriever = retriever(Vec::new()).await;
    let composer = AnswerComposer::new(
        Arc::new(MockLlm::new("mock")),
        retriever.clone(),
        Arc::new(NoWikipedia),
    );
    let graph = CompiledGraph::new(vec![Arc::new(arag_graph::ComposeNode::new(Arc::new(composer)))]);

    let err = graph.invoke("q").await.unwrap_err();
    assert!(matches!(err, GraphError::InvalidTransition { expected: Phase::Retrieved, .. }));
}
