//! Core of the search agent chat front-end.
//!
//! This crate provides everything below the view layer:
//!
//! - **Controller**: [`ConversationController`] owns the conversation, runs
//!   one generation at a time and types answers out character by character
//! - **Providers**: the [`AnswerProvider`] trait with a stub and an HTTP
//!   implementation
//! - **State**: messages, phase and change events consumed by a UI
//!
//! # Example
//!
//! ```no_run
//! use search_agent_core::ConversationController;
//!
//! # async fn demo() {
//! let controller = ConversationController::with_stub();
//! controller.set_input("how do lifetimes work?");
//! controller.send();
//! controller.wait_until_idle().await;
//!
//! for message in controller.messages() {
//!     println!("{}: {}", message.role.as_str(), message.text);
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod http;
pub mod ids;
pub mod message;
pub mod provider;
pub mod typing;

pub use config::{AgentConfig, ProviderConfig};
pub use controller::{ConversationController, STOPPED_TEXT};
pub use conversation::{ConversationEvent, ConversationSnapshot, Phase};
pub use error::{CoreError, ProviderError, Result};
pub use http::HttpAnswerProvider;
pub use ids::{IdError, MessageId};
pub use message::{Message, Role};
pub use provider::{canned_answer, AnswerProvider, StubAnswerProvider};
pub use typing::TypingCadence;
