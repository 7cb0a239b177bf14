//! Interactive terminal session.

use crate::agent::SqlAgent;
use crate::error::{AgentError, AgentResult};
use crate::render::render_response;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

pub const PROMPT: &str = "\nAsk a question about your database: ";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    DebugOn,
    DebugOff,
    Empty,
    Ask(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Self::Empty,
            "quit" | "exit" => Self::Quit,
            "debug on" => Self::DebugOn,
            "debug off" => Self::DebugOff,
            _ => Self::Ask(trimmed.to_string()),
        }
    }
}

/// Read questions from `input` until `quit`, `exit` or end of input.
///
/// `set_debug` switches log verbosity for `debug on|off`.
pub async fn run_session<R, W, F>(
    agent: &SqlAgent,
    input: R,
    output: &mut W,
    set_debug: F,
) -> AgentResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Fn(bool) -> AgentResult<()>,
{
    let mut lines = input.lines();

    loop {
        write_out(output, PROMPT).await?;
        let Some(line) = lines.next_line().await.map_err(io_error)? else {
            info!("End of input");
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Empty => continue,
            ReplCommand::DebugOn => {
                set_debug(true)?;
                write_out(output, "Debug mode enabled\n").await?;
            }
            ReplCommand::DebugOff => {
                set_debug(false)?;
                write_out(output, "Debug mode disabled\n").await?;
            }
            ReplCommand::Ask(question) => {
                let response = agent.ask_question(&question).await;
                write_out(output, &format!("\n{}", render_response(&response))).await?;
            }
        }
    }

    Ok(())
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> AgentResult<()> {
    output.write_all(text.as_bytes()).await.map_err(io_error)?;
    output.flush().await.map_err(io_error)
}

fn io_error(e: std::io::Error) -> AgentError {
    AgentError::internal(format!("Terminal I/O error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse("quit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("  EXIT "), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("Debug On"), ReplCommand::DebugOn);
        assert_eq!(ReplCommand::parse("debug off"), ReplCommand::DebugOff);
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
    }

    #[test]
    fn test_parse_question_keeps_case() {
        assert_eq!(
            ReplCommand::parse("  How many Customers are there? "),
            ReplCommand::Ask("How many Customers are there?".to_string())
        );
    }

    #[test]
    fn test_quit_inside_sentence_is_a_question() {
        assert!(matches!(
            ReplCommand::parse("which customers quit last month"),
            ReplCommand::Ask(_)
        ));
    }
}
