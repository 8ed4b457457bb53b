//! These models represent the objects passed around by the agent.
//!
//! The completion service speaks the OpenAI chat-completions wire format,
//! where tool calls ride on assistant messages and tool results are separate
//! tool-role messages. Responses are immediately normalized into the internal
//! structs here and only converted back at the provider boundary, so history
//! holds exactly one representation of every exchange.

pub mod message;
pub mod role;
pub mod tool;
