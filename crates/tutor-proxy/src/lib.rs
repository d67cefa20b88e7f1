#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;
mod generate;
mod message;
mod retrieve;
mod service;

pub use crate::client::ProxyClient;
pub use crate::config::ProxyConfig;
pub use crate::error::{Error, Result};
pub use crate::generate::{GenerateReply, GenerateRequest};
pub use crate::message::{ChatMessage, MessageRole};
pub use crate::retrieve::{RagDocument, RetrieveRequest, render_rag_context};
pub use crate::service::{ChatProxy, MockProxy, ProxyService};
