//! HTTP transport for llmgate: routes, handlers and error mapping.

pub mod gateway;
