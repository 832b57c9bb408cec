//! End-to-end retrieval over the embedding index.

use std::sync::Arc;

use arag_rag::{
    Document, EmbeddingIndex, HashingEmbeddingProvider, InMemoryVectorStore, RagError,
    RecursiveChunker, Retriever, split_documents,
};

fn corpus() -> Vec<Document> {
    vec![
        Document::new("agent", "Agents use an agent loop to plan and act.", "agent.txt")
            .with_metadata("title", "Agent Loop"),
        Document::new("video", "Diffusion models generate video by denoising.", "video.txt")
            .with_metadata("title", "Diffusion Video"),
    ]
}

async fn built_index() -> Arc<EmbeddingIndex> {
    let chunker = RecursiveChunker::new(500, 50).unwrap();
    let chunks = split_documents(&chunker, &corpus());
    let index = Arc::new(EmbeddingIndex::new(
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
    ));
    assert_eq!(index.build(chunks).await.unwrap(), 2);
    index
}

#[tokio::test]
async fn agent_loop_question_retrieves_agent_passage() {
    let index = built_index().await;

    let top = index.retrieve("What is an agent loop?", 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].metadata.get("title").map(String::as_str), Some("Agent Loop"));
}

#[tokio::test]
async fn retrieve_is_idempotent() {
    let index = built_index().await;

    let first = index.search("diffusion video", 2).await.unwrap();
    let second = index.search("diffusion video", 2).await.unwrap();

    let ids = |results: &[arag_rag::SearchResult]| {
        results.iter().map(|r| (r.chunk.id.clone(), r.score)).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first[0].chunk.document_id, "video");
}

#[tokio::test]
async fn result_count_is_bounded_by_k_and_corpus() {
    let index = built_index().await;
    let retriever = Retriever::new(Arc::clone(&index), Retriever::DEFAULT_K);

    assert_eq!(retriever.invoke("anything at all").await.unwrap().len(), 2);
    assert!(index.retrieve("agent", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn not_initialized_until_build_succeeds() {
    let index = EmbeddingIndex::new(
        Arc::new(HashingEmbeddingProvider::default()),
        Arc::new(InMemoryVectorStore::new()),
    );
    assert!(matches!(index.retrieve("agent", 4).await, Err(RagError::IndexNotInitialized)));

    index.build(Vec::new()).await.unwrap();
    assert!(index.retrieve("unanswerable nonsense query xyz123", 4).await.unwrap().is_empty());
}
