//! # arag-graph
//!
//! Runs a question through two fixed stages: `retriever` fetches passages
//! from the index, then `responder` composes the answer.
//!
//! ```rust,ignore
//! use arag_graph::GraphBuilder;
//!
//! let graph = GraphBuilder::new(retriever, composer);
//! let state = graph.run("What is an agent loop?").await?;
//! println!("{}", state.answer.unwrap_or_default());
//! ```

pub mod error;
pub mod node;
pub mod state;
pub mod workflow;

pub use error::{GraphError, Result};
pub use node::{ComposeNode, Node, RetrieveNode};
pub use state::{Phase, RagState};
pub use workflow::{CompiledGraph, GraphBuilder};
