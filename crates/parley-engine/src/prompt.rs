use minijinja::{context, Environment};
use parley_types::ChatMessage;

use crate::errors::EngineError;

/// Llama 3 instruct chat template.
///
/// Per message: a role header, a blank line, the content, and an `<|eot_id|>`
/// terminator. The rendered prompt ends with an open assistant header so the
/// model continues as the assistant.
const LLAMA3_CHAT_TEMPLATE: &str = "<|begin_of_text|>\
{% for message in messages %}\
<|start_header_id|>{{ message.role }}<|end_header_id|>\n\n\
{{ message.content }}<|eot_id|>\n\
{% endfor %}\
<|start_header_id|>assistant<|end_header_id|>";

/// Render a message list into the Llama 3 instruct wire format.
///
/// The prompt is rebuilt from the full list on every turn; the engine holds
/// no cross-turn prompt state.
pub fn render_chat_prompt(messages: &[ChatMessage]) -> Result<String, EngineError> {
    let mut env = Environment::new();
    env.add_template("chat", LLAMA3_CHAT_TEMPLATE)
        .map_err(|source| EngineError::RenderTemplate {
            source: source.into(),
        })?;
    let template = env
        .get_template("chat")
        .map_err(|source| EngineError::RenderTemplate {
            source: source.into(),
        })?;
    template
        .render(context! { messages => messages })
        .map_err(|source| EngineError::RenderTemplate {
            source: source.into(),
        })
}
