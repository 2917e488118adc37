#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose remainder is passed through untouched (task text, image
/// prompts, a location override).
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "task",
        action: "add_task",
    },
    CommandSpec {
        command: "imagine",
        action: "imagine",
    },
    CommandSpec {
        command: "location",
        action: "set_location",
    },
];

/// Commands addressing a task by id.
pub(crate) const ID_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "done",
        action: "toggle_task",
    },
    CommandSpec {
        command: "rm",
        action: "remove_task",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "refresh",
        action: "refresh",
    },
    CommandSpec {
        command: "tasks",
        action: "show_tasks",
    },
    CommandSpec {
        command: "mood",
        action: "show_mood",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const SAVE_COMMAND: CommandSpec = CommandSpec {
    command: "save",
    action: "save_art",
};

/// Filename used by `/save` when no path is given.
pub const DEFAULT_ART_FILENAME: &str = "aura-inspira.png";

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/refresh",
    "/task",
    "/done",
    "/rm",
    "/tasks",
    "/mood",
    "/imagine",
    "/save",
    "/location",
    "/help",
    "/quit",
];
