//! `haru chat`: one-shot or interactive terminal chat.

use haru_agent::{AgentStreamEvent, ChatOrchestrator};
use haru_core::message::{ChatMessage, ToolInvocation};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_llm_key() {
        super::print_missing_llm_key(&super::config_path(config_path));
        return Err("No language-model API key found. See above for setup instructions.".into());
    }
    if !config.has_weather_key() {
        tracing::warn!("OPENWEATHER_API_KEY not set; weather answers will be limited");
    }

    let provider = haru_providers::build_from_config(&config)?;
    let orchestrator = ChatOrchestrator::from_config(&config, provider);
    let mut history = Vec::new();

    if let Some(msg) = message {
        turn(&orchestrator, &mut history, msg).await?;
        return Ok(());
    }

    println!();
    println!("  ☀️  하루 · 날씨 & 운세 AI");
    println!();
    println!("  Model:  {}", config.llm.model);
    println!("  Tools:  getWeather, getFortune, getDateTime");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        print!("  하루 > ");
        std::io::stdout().flush()?;
        if let Err(e) = turn(&orchestrator, &mut history, line.to_string()).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  안녕히 가세요! 👋");
    println!();
    Ok(())
}

/// Run one exchange, printing text as it streams and extending `history`.
async fn turn(
    orchestrator: &ChatOrchestrator,
    history: &mut Vec<ChatMessage>,
    input: String,
) -> Result<(), Box<dyn std::error::Error>> {
    history.push(ChatMessage::user(input));

    let rx = match orchestrator.run_stream(history.clone()).await {
        Ok(rx) => rx,
        Err(e) => {
            history.pop();
            return Err(e.into());
        }
    };

    let mut stdout = std::io::stdout();
    let reply = render(rx, &mut stdout).await?;
    writeln!(stdout)?;
    history.push(reply);
    Ok(())
}

/// Write streamed text to `out` and assemble the assistant turn for the
/// history, tool invocations included.
pub async fn render(
    mut rx: mpsc::Receiver<AgentStreamEvent>,
    out: &mut impl Write,
) -> std::io::Result<ChatMessage> {
    let mut reply = ChatMessage::assistant("");

    while let Some(event) = rx.recv().await {
        match event {
            AgentStreamEvent::Chunk { content } => {
                write!(out, "{content}")?;
                out.flush()?;
                reply.content.push_str(&content);
            }
            AgentStreamEvent::ToolCall { id, name, input } => {
                tracing::debug!(tool = %name, "Tool requested");
                reply.tool_invocations.push(ToolInvocation {
                    tool_call_id: id,
                    tool_name: name,
                    args: input,
                    result: None,
                    error: None,
                });
            }
            AgentStreamEvent::ToolResult {
                id,
                output,
                success,
                data,
                ..
            } => {
                if let Some(inv) = reply
                    .tool_invocations
                    .iter_mut()
                    .find(|inv| inv.tool_call_id == id)
                {
                    if success {
                        inv.result = Some(data.unwrap_or(serde_json::Value::String(output)));
                    } else {
                        inv.error = Some(output);
                    }
                }
            }
            AgentStreamEvent::Done { rounds, .. } => {
                tracing::debug!(rounds, "Turn complete");
            }
            AgentStreamEvent::Error { message } => {
                tracing::warn!(error = %message, "Turn ended early");
                write!(out, "\n  [응답 중 오류가 발생했습니다]")?;
            }
        }
    }

    Ok(reply)
}
