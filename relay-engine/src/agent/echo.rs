//! Echo agent runner
//!
//! Stands in for a real runner when none is configured. Replies with the
//! prompt's last line, cut to the token budget (one word per token).

use async_trait::async_trait;

use super::{AgentError, AgentInvocation, AgentReply, AgentRunner, TokenUsage};

#[derive(Debug, Default, Clone, Copy)]
pub struct EchoAgentRunner;

#[async_trait]
impl AgentRunner for EchoAgentRunner {
    async fn run(&self, invocation: AgentInvocation) -> Result<AgentReply, AgentError> {
        let last_line = invocation
            .prompt
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default();

        let words: Vec<&str> = last_line
            .split_whitespace()
            .take(invocation.max_tokens as usize)
            .collect();

        let mut text = words.join(" ");
        if !text.ends_with(['.', '!', '?']) {
            text.push('.');
        }

        Ok(AgentReply {
            usage: TokenUsage {
                input_tokens: invocation.prompt.split_whitespace().count() as u32,
                output_tokens: words.len() as u32,
            },
            text,
            delegations: Vec::new(),
        })
    }
}
