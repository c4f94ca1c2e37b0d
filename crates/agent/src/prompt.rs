//! The assistant persona.

/// Fixed Korean persona sent as the system message of every request.
pub const SYSTEM_PROMPT: &str = "당신은 친근하고 도움이 되는 한국어 AI 어시스턴트입니다.
사용자에게 날씨 정보와 운세를 제공하는 것이 주요 역할입니다.
항상 한국어로 대답하고, 친근하고 따뜻한 톤을 사용하세요.
날씨 정보를 제공할 때는 구체적이고 유용한 조언을 포함하세요.
운세를 제공할 때는 긍정적이고 격려적인 메시지를 포함하세요.";

/// The system prompt to use, honouring a configured override.
pub fn system_prompt(override_prompt: Option<&str>) -> &str {
    match override_prompt.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => SYSTEM_PROMPT,
    }
}
