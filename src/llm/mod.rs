//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for interacting with the Large
//! Language Model providers the research pipeline uses for query refinement
//! and answer synthesis.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection
//! - [`ProviderRegistry`] - Resolves `[models.*]` entries to clients
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `openai` - OpenAI API and compatible endpoints
//! - `ollama` - Local Ollama server
//!
//! # Streaming
//!
//! Both providers support streaming responses via [`LLMClient::stream_with_system`],
//! which yields text fragments as they arrive.

/// Core LLM client trait and streaming response types.
pub mod client;
/// Registry for managing multiple LLM provider instances.
pub mod provider_registry;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, Provider, TokenStream};
pub use provider_registry::ProviderRegistry;
