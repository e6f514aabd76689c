use std::sync::Arc;

use llmgate::{
    GenerationTracer, NoopTracer, PromptResolver, ResponseOrchestrator, VariantRouter,
};

use llmgate::config::DEFAULT_SUMMARIZER_PROMPT;

#[derive(Clone)]
pub struct HandlerState {
    pub orchestrator: ResponseOrchestrator,

    pub variants: Arc<VariantRouter>,

    pub prompts: Arc<dyn PromptResolver>,

    /// Prompt name rendered by `/summarize`.
    pub summarizer_prompt: String,

    pub tracer: Arc<dyn GenerationTracer>,
}

impl HandlerState {
    pub fn new(
        orchestrator: ResponseOrchestrator,
        variants: VariantRouter,
        prompts: Arc<dyn PromptResolver>,
    ) -> Self {
        Self {
            orchestrator,
            variants: Arc::new(variants),
            prompts,
            summarizer_prompt: DEFAULT_SUMMARIZER_PROMPT.to_string(),
            tracer: Arc::new(NoopTracer),
        }
    }

    pub fn with_summarizer_prompt(mut self, name: impl Into<String>) -> Self {
        self.summarizer_prompt = name.into();
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn GenerationTracer>) -> Self {
        self.tracer = tracer;
        self
    }
}
