//! A bounded reason-and-act loop over native function calling.
//!
//! Each iteration sends the conversation to the model. If the reply requests
//! tool calls, every call is executed and its result appended as a function
//! response; otherwise the run ends. The number of model calls is capped by
//! `max_iterations`.

use std::collections::HashSet;
use std::sync::Arc;

use arag_core::{
    AragError, Content, FunctionDeclaration, GenerateContentConfig, Llm, LlmRequest, Part,
    Result, Tool,
};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

/// Default cap on model calls per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model replied without requesting tools.
    Completed,
    /// The iteration cap was reached while the model was still calling tools.
    MaxIterations,
}

/// The outcome of [`ReactAgent::run`].
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Messages produced during the run (model replies and tool results),
    /// oldest first. The caller's input is not included.
    pub messages: Vec<Content>,
    /// Number of model calls made.
    pub iterations: usize,
    pub stop_reason: StopReason,
}

impl AgentRun {
    /// Text of the last produced message, if it has any.
    pub fn final_text(&self) -> Option<String> {
        self.messages.last().map(Content::text).filter(|text| !text.trim().is_empty())
    }
}

/// An agent that alternates model calls and tool calls until the model answers.
pub struct ReactAgent {
    name: String,
    model: Arc<dyn Llm>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    declarations: Vec<FunctionDeclaration>,
    generate_config: Option<GenerateContentConfig>,
    max_iterations: usize,
}

impl std::fmt::Debug for ReactAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactAgent")
            .field("name", &self.name)
            .field("model", &self.model.name())
            .field("tools", &self.tool_names())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl ReactAgent {
    pub fn builder(name: impl Into<String>) -> ReactAgentBuilder {
        ReactAgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the attached tools, in attachment order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run the loop with `input` as the sole user message.
    ///
    /// # Errors
    ///
    /// Model failures abort the run and are returned unchanged. Tool failures
    /// do not: they are reported back to the model as an `error` field.
    pub async fn run(&self, input: &str) -> Result<AgentRun> {
        let mut history = vec![Content::new("user").with_text(input)];
        let mut produced = Vec::new();

        for iteration in 1..=self.max_iterations {
            let mut request = LlmRequest::new(self.model.name(), history.clone())
                .with_tools(self.declarations.clone());
            request.system_instruction = self.instruction.clone();
            request.config = self.generate_config.clone();

            debug!(agent = %self.name, iteration, messages = history.len(), "calling model");
            let response = self.model.generate_content(request).await?;

            let Some(mut content) = response.content else {
                info!(agent = %self.name, iteration, finish_reason = ?response.finish_reason, "model returned no content");
                return Ok(self.finish(produced, iteration, StopReason::Completed));
            };
            content.role = "model".to_string();

            let calls: Vec<(Option<String>, String, Value)> = content
                .function_calls()
                .into_iter()
                .map(|(id, name, args)| (id.map(str::to_string), name.to_string(), args.clone()))
                .collect();
            history.push(content.clone());
            produced.push(content);

            if calls.is_empty() {
                return Ok(self.finish(produced, iteration, StopReason::Completed));
            }

            let mut results = Content::new("user");
            for (id, name, args) in calls {
                let response = self.call_tool(&name, args).await;
                results.parts.push(Part::FunctionResponse { id, name, response });
            }
            history.push(results.clone());
            produced.push(results);
        }

        warn!(agent = %self.name, max_iterations = self.max_iterations, "agent stopped at iteration limit");
        Ok(self.finish(produced, self.max_iterations, StopReason::MaxIterations))
    }

    fn finish(&self, messages: Vec<Content>, iterations: usize, stop_reason: StopReason) -> AgentRun {
        info!(agent = %self.name, iterations, ?stop_reason, "agent run finished");
        AgentRun { messages, iterations, stop_reason }
    }

    async fn call_tool(&self, name: &str, args: Value) -> Value {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!(agent = %self.name, tool = name, "model requested unknown tool");
            return json!({ "error": format!("unknown tool '{name}'") });
        };

        debug!(agent = %self.name, tool = name, %args, "executing tool");
        match tool.execute(args).await {
            Ok(value) if value.is_object() => value,
            Ok(value) => json!({ "result": value }),
            Err(err) => {
                warn!(agent = %self.name, tool = name, error = %err, "tool call failed");
                json!({ "error": err.to_string() })
            }
        }
    }
}

/// Builder for [`ReactAgent`].
///
/// # Example
///
/// ```rust,ignore
/// let agent = ReactAgent::builder("rag_agent")
///     .model(model)
///     .instruction("Answer using the tools.")
///     .tool(Arc::new(retriever_tool))
///     .build()?;
/// ```
pub struct ReactAgentBuilder {
    name: String,
    model: Option<Arc<dyn Llm>>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    generate_config: Option<GenerateContentConfig>,
    max_iterations: usize,
}

impl ReactAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            instruction: None,
            tools: Vec::new(),
            generate_config: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn model(mut self, model: Arc<dyn Llm>) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the system directive sent with every model call.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Sampling settings attached to every model request.
    pub fn generate_content_config(mut self, config: GenerateContentConfig) -> Self {
        self.generate_config = Some(config);
        self
    }

    /// Cap the number of model calls per run.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Build the agent.
    ///
    /// # Errors
    ///
    /// Returns [`AragError::Agent`] when no model is set, `max_iterations` is
    /// zero, or two tools share a name.
    pub fn build(self) -> Result<ReactAgent> {
        let model = self
            .model
            .ok_or_else(|| AragError::Agent(format!("agent '{}' has no model", self.name)))?;
        if self.max_iterations == 0 {
            return Err(AragError::Agent("max_iterations must be greater than zero".into()));
        }

        let mut seen = HashSet::new();
        for tool in &self.tools {
            if !seen.insert(tool.name().to_string()) {
                return Err(AragError::Agent(format!("duplicate tool name '{}'", tool.name())));
            }
        }

        let declarations = self.tools.iter().map(|t| t.declaration()).collect();
        Ok(ReactAgent {
            name: self.name,
            model,
            instruction: self.instruction,
            tools: self.tools,
            declarations,
            generate_config: self.generate_config,
            max_iterations: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use arag_model::MockLlm;
    use async_trait::async_trait;

    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the query back."
        }
        async fn execute(&self, args: Value) -> Result<Value> {
            Ok(args["query"].clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails."
        }
        async fn execute(&self, _args: Value) -> Result<Value> {
            Err(AragError::Tool("backend unavailable".into()))
        }
    }

    fn agent(model: Arc<MockLlm>, max_iterations: usize) -> ReactAgent {
        ReactAgent::builder("test")
            .model(model)
            .instruction("Be helpful.")
            .tool(Arc::new(Echo))
            .tool(Arc::new(Broken))
            .max_iterations(max_iterations)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn plain_answer_ends_the_run() {
        let model = Arc::new(MockLlm::new("mock").with_text("42"));
        let run = agent(model.clone(), 8).run("question").await.unwrap();

        assert_eq!(run.stop_reason, StopReason::Completed);
        assert_eq!(run.iterations, 1);
        assert_eq!(run.final_text().as_deref(), Some("42"));

        let request = &model.requests()[0];
        assert_eq!(request.system_instruction.as_deref(), Some("Be helpful."));
        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].text(), "question");
        let tools: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tools, vec!["echo", "broken"]);
        assert!(request.config.is_none());
    }

    #[tokio::test]
    async fn tool_results_are_fed_back_to_the_model() {
        let model = Arc::new(
            MockLlm::new("mock")
                .with_function_call("echo", json!({"query": "ping"}))
                .with_text("pong"),
        );
        let run = agent(model.clone(), 8).run("question").await.unwrap();

        assert_eq!(run.iterations, 2);
        assert_eq!(run.messages.len(), 3);
        assert_eq!(run.final_text().as_deref(), Some("pong"));

        let second = &model.requests()[1];
        assert_eq!(second.contents.len(), 3);
        assert_eq!(
            second.contents[2].parts[0],
            Part::FunctionResponse {
                id: None,
                name: "echo".into(),
                response: json!({"result": "ping"}),
            }
        );
    }

    #[tokio::test]
    async fn tool_failures_and_unknown_tools_are_reported_to_the_model() {
        let model = Arc::new(
            MockLlm::new("mock")
                .with_function_call("broken", json!({}))
                .with_function_call("missing", json!({}))
                .with_text("done"),
        );
        let run = agent(model.clone(), 8).run("question").await.unwrap();
        assert_eq!(run.final_text().as_deref(), Some("done"));

        let requests = model.requests();
        let Part::FunctionResponse { response, .. } = &requests[1].contents[2].parts[0] else {
            panic!("expected a function response");
        };
        assert!(response["error"].as_str().unwrap().contains("backend unavailable"));

        let Part::FunctionResponse { response, .. } = &requests[2].contents[4].parts[0] else {
            panic!("expected a function response");
        };
        assert_eq!(response["error"], "unknown tool 'missing'");
    }

    #[tokio::test]
    async fn loop_is_capped_by_max_iterations() {
        let mut mock = MockLlm::new("mock");
        for _ in 0..10 {
            mock = mock.with_function_call("echo", json!({"query": "again"}));
        }
        let model = Arc::new(mock);
        let run = agent(model.clone(), 3).run("question").await.unwrap();

        assert_eq!(run.stop_reason, StopReason::MaxIterations);
        assert_eq!(run.iterations, 3);
        assert_eq!(model.call_count(), 3);
        assert_eq!(run.final_text(), None);
    }

    #[tokio::test]
    async fn generation_settings_ride_along_on_each_call() {
        let model = Arc::new(
            MockLlm::new("mock")
                .with_function_call("echo", json!({"query": "ping"}))
                .with_text("pong"),
        );
        let config = GenerateContentConfig { temperature: Some(0.0), ..Default::default() };
        let agent = ReactAgent::builder("tuned")
            .model(model.clone())
            .tool(Arc::new(Echo))
            .generate_content_config(config.clone())
            .build()
            .unwrap();

        agent.run("question").await.unwrap();

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.config.as_ref() == Some(&config)));
    }

    #[tokio::test]
    async fn model_errors_abort_the_run() {
        let model = Arc::new(MockLlm::new("mock").with_error(AragError::Model("quota".into())));
        let err = agent(model, 8).run("question").await.unwrap_err();
        assert!(matches!(err, AragError::Model(_)));
    }

    #[tokio::test]
    async fn empty_reply_completes_without_text() {
        let model = Arc::new(MockLlm::new("mock"));
        let run = agent(model, 8).run("question").await.unwrap();
        assert_eq!(run.stop_reason, StopReason::Completed);
        assert!(run.messages.is_empty());
        assert_eq!(run.final_text(), None);
    }

    #[test]
    fn builder_validates() {
        assert!(ReactAgent::builder("no_model").build().is_err());

        let model: Arc<dyn Llm> = Arc::new(MockLlm::new("mock"));
        let duplicate = ReactAgent::builder("dup")
            .model(model.clone())
            .tool(Arc::new(Echo))
            .tool(Arc::new(Echo))
            .build();
        assert!(matches!(duplicate, Err(AragError::Agent(msg)) if msg.contains("echo")));

        assert!(ReactAgent::builder("zero").model(model).max_iterations(0).build().is_err());
    }
}
