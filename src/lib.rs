//! # agentry
//!
//! A minimal agent orchestration core: named tools, a registry that
//! dispatches them, and three loop patterns over a chat-completion model.
//!
//! This library provides:
//! - A [`tools::ToolRegistry`] of named async tools
//! - A ReAct loop that alternates model reasoning with tool execution
//! - A Plan-and-Solve loop that plans once, executes steps, and aggregates
//! - A Reflection loop that critiques and improves its own answers
//! - An OpenAI-compatible model client with retry and streaming
//!
//! ## Architecture
//!
//! An agent loop drives everything: it asks the model what to do, routes
//! tool actions through the registry, feeds observations back, and stops
//! on a final answer or a cap. Tool failures stay inside the loop as
//! observations; only model failures and unparseable plans abort a run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentry::{Config, agent::ReActAgent, llm::OpenAiClient, tools::{ToolRegistry, WebSearchTool}};
//!
//! let config = Config::from_env()?;
//! let llm = Arc::new(OpenAiClient::from_config(&config));
//!
//! let mut tools = ToolRegistry::new();
//! if let Some(key) = &config.search_api_key {
//!     tools.register(WebSearchTool::new(key))?;
//! }
//!
//! let agent = ReActAgent::new(llm, Arc::new(tools), &config);
//! let report = agent.run("What is the capital of France?").await?;
//! println!("{:?}", report.outcome);
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
