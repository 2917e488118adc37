use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, DEFAULT_ART_FILENAME, ID_ARG_COMMANDS, NO_ARG_COMMANDS, RAW_ARG_COMMANDS,
    SAVE_COMMAND,
};

/// A parsed line of dashboard input.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            command_args: BTreeMap::new(),
        }
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_path_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    let parts = match shell_words::split(arg) {
        Ok(parts) => parts,
        Err(_) => arg.split_whitespace().map(str::to_string).collect(),
    };
    let parts: Vec<String> = parts.into_iter().filter(|value| !value.is_empty()).collect();
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

/// Maps a line of input to a dashboard action.
///
/// Slash-prefixed lines are looked up in the command registry; anything else
/// is treated as an image prompt (the `imagine` action), mirroring the
/// prompt field on the original dashboard.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let remainder = &slash_tail[command_len..];
            let arg = if remainder.is_empty() {
                ""
            } else {
                remainder.trim()
            };

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                let key = match action {
                    "add_task" => "text",
                    "set_location" => "location",
                    _ => "prompt",
                };
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert(key.to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, ID_ARG_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert("id".to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if command == SAVE_COMMAND.command {
                let path = parse_single_path_arg(arg);
                let mut intent = Intent::new(SAVE_COMMAND.action, text);
                intent.command_args.insert(
                    "path".to_string(),
                    Value::String(if path.is_empty() {
                        DEFAULT_ART_FILENAME.to_string()
                    } else {
                        path
                    }),
                );
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("imagine", text);
    intent.prompt = Some(raw_trimmed.to_string());
    intent
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn plain_text_becomes_an_image_prompt() {
        let intent = parse_intent("Uma mulher caminhando no campo ao amanhecer");
        assert_eq!(intent.action, "imagine");
        assert_eq!(
            intent.prompt.as_deref(),
            Some("Uma mulher caminhando no campo ao amanhecer")
        );
    }

    #[test]
    fn blank_input_is_a_noop() {
        assert_eq!(parse_intent("").action, "noop");
        assert_eq!(parse_intent("   ").action, "noop");
    }

    #[test]
    fn parse_task_keeps_raw_text() {
        let intent = parse_intent("/task Beber água");
        assert_eq!(intent.action, "add_task");
        assert_eq!(intent.command_args["text"], json!("Beber água"));
    }

    #[test]
    fn parse_id_commands() {
        let done = parse_intent("/done 1712000000000");
        assert_eq!(done.action, "toggle_task");
        assert_eq!(done.command_args["id"], json!("1712000000000"));

        let removed = parse_intent("/rm 1712000000000");
        assert_eq!(removed.action, "remove_task");
        assert_eq!(removed.command_args["id"], json!("1712000000000"));
    }

    #[test]
    fn parse_save_defaults_filename() {
        let intent = parse_intent("/save");
        assert_eq!(intent.action, "save_art");
        assert_eq!(intent.command_args["path"], json!("aura-inspira.png"));
    }

    #[test]
    fn parse_save_accepts_quoted_path() {
        let intent = parse_intent("/save \"/tmp/minha arte.png\"");
        assert_eq!(intent.command_args["path"], json!("/tmp/minha arte.png"));
    }

    #[test]
    fn parse_location_keeps_raw_coordinates() {
        let intent = parse_intent("/location -19.9, -43.9");
        assert_eq!(intent.action, "set_location");
        assert_eq!(intent.command_args["location"], json!("-19.9, -43.9"));
    }

    #[test]
    fn parse_no_arg_commands() {
        assert_eq!(parse_intent("/refresh").action, "refresh");
        assert_eq!(parse_intent("/tasks").action, "show_tasks");
        assert_eq!(parse_intent("/mood").action, "show_mood");
        assert_eq!(parse_intent("/help").action, "help");
        assert_eq!(parse_intent("/quit").action, "quit");
        assert_eq!(parse_intent("/exit").action, "quit");
    }

    #[test]
    fn parse_imagine_command_matches_plain_prompt() {
        let intent = parse_intent("/imagine um lago ao nascer do sol");
        assert_eq!(intent.action, "imagine");
        assert_eq!(
            intent.command_args["prompt"],
            json!("um lago ao nascer do sol")
        );
    }

    #[test]
    fn unknown_command_is_reported_with_its_arg() {
        let intent = parse_intent("/cafezinho forte");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("cafezinho"));
        assert_eq!(intent.command_args["arg"], json!("forte"));
    }
}
