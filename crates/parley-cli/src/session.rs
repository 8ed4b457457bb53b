use anyhow::Result;
use bat::PrettyPrinter;
use cliclack::{input, spinner};
use console::style;
use tracing::error;

use parley::agent::Agent;

pub enum Input {
    Message(String),
    Exit,
    AskAgain,
}

/// Interactive read-eval-print loop over one Agent.
pub struct Session {
    agent: Agent,
}

impl Session {
    pub fn new(agent: Agent) -> Self {
        Session { agent }
    }

    pub async fn start(&mut self) -> Result<()> {
        loop {
            let line: String = input("You:").placeholder("").interact()?;

            match parse_input(&line) {
                Input::Exit => {
                    println!("Exiting.");
                    break;
                }
                Input::AskAgain => continue,
                Input::Message(prompt) => {
                    // Spinner handle is scoped to this one pending respond()
                    let spin = spinner();
                    spin.start("Thinking...");

                    match self.agent.respond(&prompt).await {
                        Ok(answer) => {
                            spin.stop("");
                            render(&answer);
                        }
                        Err(e) => {
                            spin.stop("");
                            error!(error = %e, "turn aborted");
                            println!(
                                "{}",
                                style(format!("The assistant could not answer: {}", e)).red()
                            );
                        }
                    }
                    println!();
                }
            }
        }
        Ok(())
    }
}

pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::AskAgain
    } else if trimmed.eq_ignore_ascii_case("exit") {
        Input::Exit
    } else {
        Input::Message(trimmed.to_string())
    }
}

fn render(content: &str) {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .unwrap();
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exit_case_insensitive() {
        assert!(matches!(parse_input("exit"), Input::Exit));
        assert!(matches!(parse_input("EXIT"), Input::Exit));
        assert!(matches!(parse_input("  Exit  "), Input::Exit));
    }

    #[test]
    fn test_parse_empty_asks_again() {
        assert!(matches!(parse_input(""), Input::AskAgain));
        assert!(matches!(parse_input("   "), Input::AskAgain));
    }

    #[test]
    fn test_parse_anything_else_is_a_prompt() {
        match parse_input("Where is my package, order 306-3621584-1622342?") {
            Input::Message(text) => {
                assert_eq!(text, "Where is my package, order 306-3621584-1622342?")
            }
            _ => panic!("expected a message"),
        }
        // 'exit' embedded in a longer prompt is still a prompt
        assert!(matches!(parse_input("how do I exit vim"), Input::Message(_)));
    }
}
