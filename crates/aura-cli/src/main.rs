use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use aura_contracts::chat::{parse_intent, CHAT_HELP_COMMANDS, DEFAULT_ART_FILENAME};
use aura_contracts::essence::MorningEssence;
use aura_contracts::journal::Journal;
use aura_contracts::mood::{seeded_week, MoodPoint, MOOD_LEVEL_MAX};
use aura_contracts::tasks::TaskList;
use aura_engine::{detect_location, MorningEngine, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use serde_json::Value;

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";
const DEFAULT_IMAGE_PROMPT: &str = "Uma mulher caminhando no campo ao amanhecer";

#[derive(Debug, Parser)]
#[command(name = "aura", version, about = "Aura — seu despertar inteligente, no terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive morning dashboard.
    Dashboard(DashboardArgs),
    /// Print one morning greeting and exit.
    Greet(GreetArgs),
    /// Generate one decorative image and save it.
    Art(ArtArgs),
}

#[derive(Debug, Parser)]
struct DashboardArgs {
    #[arg(long)]
    journal: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
    #[arg(long, default_value = DEFAULT_IMAGE_MODEL)]
    image_model: String,
    /// Skips the geolocation probe when given.
    #[arg(long)]
    location: Option<String>,
}

#[derive(Debug, Parser)]
struct GreetArgs {
    #[arg(long)]
    journal: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_TEXT_MODEL)]
    text_model: String,
    #[arg(long)]
    location: Option<String>,
}

#[derive(Debug, Parser)]
struct ArtArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long, default_value = DEFAULT_ART_FILENAME)]
    out: PathBuf,
    #[arg(long)]
    journal: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_IMAGE_MODEL)]
    image_model: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("aura error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Dashboard(args) => run_dashboard(args),
        Command::Greet(args) => run_greet(args),
        Command::Art(args) => run_art(args),
    }
}

fn open_journal(path: Option<PathBuf>) -> Journal {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    Journal::new(
        path.unwrap_or_else(|| PathBuf::from("journal.jsonl")),
        format!("manha-{stamp}"),
    )
}

#[derive(Debug, Clone, PartialEq)]
enum EssencePhase {
    Loading,
    Ready(MorningEssence),
}

#[derive(Debug, Clone, PartialEq)]
enum ArtPhase {
    Idle,
    Generating,
    Ready(String),
}

/// All mutable dashboard state, owned by the loop thread. Every mutation
/// goes through a named transition; requests run synchronously on this
/// thread, so a stale response can never overwrite a newer one.
struct DashboardState {
    essence: EssencePhase,
    art: ArtPhase,
    tasks: TaskList,
    mood: Vec<MoodPoint>,
    location: Option<String>,
    image_prompt: String,
}

impl DashboardState {
    fn new() -> Self {
        Self {
            essence: EssencePhase::Loading,
            art: ArtPhase::Idle,
            tasks: TaskList::new(),
            mood: seeded_week(),
            location: None,
            image_prompt: DEFAULT_IMAGE_PROMPT.to_string(),
        }
    }

    fn begin_refresh(&mut self) {
        self.essence = EssencePhase::Loading;
    }

    fn essence_ready(&mut self, essence: MorningEssence) {
        self.essence = EssencePhase::Ready(essence);
    }

    fn begin_art(&mut self, prompt: &str) {
        self.image_prompt = prompt.to_string();
        self.art = ArtPhase::Generating;
    }

    fn art_finished(&mut self, result: Option<String>) {
        self.art = match result {
            Some(data_uri) => ArtPhase::Ready(data_uri),
            None => ArtPhase::Idle,
        };
    }

    fn set_location(&mut self, location: Option<String>) {
        self.location = location.filter(|value| !value.trim().is_empty());
    }

    fn art_data_uri(&self) -> Option<&str> {
        match &self.art {
            ArtPhase::Ready(data_uri) => Some(data_uri.as_str()),
            _ => None,
        }
    }
}

fn run_dashboard(args: DashboardArgs) -> Result<()> {
    let journal = open_journal(args.journal);
    let engine = MorningEngine::new(journal, args.text_model, args.image_model);
    let mut state = DashboardState::new();

    // Geolocation is attempted exactly once; the greeting proceeds either way.
    state.set_location(args.location.or_else(detect_location));

    println!("Aura — seu despertar inteligente. Digite /help para comandos.");
    refresh_essence(&engine, &mut state);
    println!("{}", render_dashboard(&state));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = stdin.read_line(&mut line)?;
        if read == 0 {
            break;
        }

        let intent = parse_intent(&line);
        match intent.action.as_str() {
            "noop" => {}
            "help" => println!("Comandos: {}", CHAT_HELP_COMMANDS.join(" ")),
            "quit" => break,
            "refresh" => {
                refresh_essence(&engine, &mut state);
                println!("{}", render_essence(&state));
            }
            "add_task" => {
                let text = string_arg(&intent.command_args, "text");
                match state.tasks.add(&text) {
                    Some(task) => println!("Tarefa adicionada [{}] {}", task.id, task.text),
                    None => println!("Tarefa vazia ignorada."),
                }
            }
            "toggle_task" => {
                let id = string_arg(&intent.command_args, "id");
                if state.tasks.toggle(&id) {
                    println!("{}", render_tasks(&state));
                } else {
                    println!("Tarefa não encontrada: {id}");
                }
            }
            "remove_task" => {
                let id = string_arg(&intent.command_args, "id");
                if state.tasks.remove(&id) {
                    println!("{}", render_tasks(&state));
                } else {
                    println!("Tarefa não encontrada: {id}");
                }
            }
            "show_tasks" => println!("{}", render_tasks(&state)),
            "show_mood" => println!("{}", render_mood(&state)),
            "set_location" => {
                let location = string_arg(&intent.command_args, "location");
                state.set_location(Some(location));
                match &state.location {
                    Some(location) => println!("Localização definida: {location}"),
                    None => println!("Localização limpa."),
                }
            }
            "imagine" => {
                let mut prompt = intent
                    .prompt
                    .clone()
                    .unwrap_or_else(|| string_arg(&intent.command_args, "prompt"));
                if prompt.trim().is_empty() {
                    // Bare /imagine reuses the prompt field, seeded like the
                    // original dashboard's input.
                    prompt = state.image_prompt.clone();
                }
                if prompt.trim().is_empty() {
                    println!("Descreva a arte que deseja criar.");
                    continue;
                }
                state.begin_art(&prompt);
                println!("Pintando sua manhã...");
                let art = engine.generate_art(&prompt);
                state.art_finished(art);
                match state.art_data_uri() {
                    Some(_) => println!("Imagem pronta. Use /save para guardar."),
                    None => println!("Nenhuma imagem desta vez. Tente outro tema."),
                }
            }
            "save_art" => {
                let path = string_arg(&intent.command_args, "path");
                match state.art_data_uri() {
                    Some(data_uri) => match save_data_uri(data_uri, Path::new(&path)) {
                        Ok(()) => println!("Imagem salva em {path}"),
                        Err(err) => println!("Falha ao salvar: {err:#}"),
                    },
                    None => println!("Gere uma imagem antes de salvar."),
                }
            }
            "unknown" => {
                let command = string_arg(&intent.command_args, "command");
                println!("Comando desconhecido: /{command} (veja /help)");
            }
            _ => {}
        }
    }

    Ok(())
}

fn run_greet(args: GreetArgs) -> Result<()> {
    let journal = open_journal(args.journal);
    let engine = MorningEngine::new(journal, args.text_model, DEFAULT_IMAGE_MODEL);
    let mut state = DashboardState::new();
    state.set_location(args.location.or_else(detect_location));
    refresh_essence(&engine, &mut state);
    println!("{}", render_essence(&state));
    Ok(())
}

fn run_art(args: ArtArgs) -> Result<()> {
    if args.prompt.trim().is_empty() {
        bail!("--prompt must not be empty");
    }
    let journal = open_journal(args.journal);
    let engine = MorningEngine::new(journal, DEFAULT_TEXT_MODEL, args.image_model);
    match engine.generate_art(&args.prompt) {
        Some(data_uri) => {
            save_data_uri(&data_uri, &args.out)?;
            println!("Imagem salva em {}", args.out.display());
        }
        None => println!("Nenhuma imagem gerada."),
    }
    Ok(())
}

fn refresh_essence(engine: &MorningEngine, state: &mut DashboardState) {
    state.begin_refresh();
    let essence = engine.morning_essence(state.location.as_deref());
    state.essence_ready(essence);
}

fn string_arg(args: &std::collections::BTreeMap<String, Value>, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Decodes a PNG data URI and writes the raw bytes to `path`.
fn save_data_uri(data_uri: &str, path: &Path) -> Result<()> {
    let Some(encoded) = data_uri.strip_prefix(PNG_DATA_URI_PREFIX) else {
        bail!("unsupported data URI (expected {PNG_DATA_URI_PREFIX}...)");
    };
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .context("art payload base64 decode failed")?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

/// Bordered text card with an optional `icon title` header row. Purely
/// structural; every dashboard region renders through it.
fn panel(title: Option<&str>, icon: Option<&str>, body: &[String]) -> String {
    let header = match (icon, title) {
        (Some(icon), Some(title)) => Some(format!("{icon} {title}")),
        (None, Some(title)) => Some(title.to_string()),
        _ => None,
    };

    let width = header
        .iter()
        .map(|line| line.chars().count() + 2)
        .chain(body.iter().map(|line| line.chars().count()))
        .max()
        .unwrap_or(0)
        .max(24);

    let mut out = String::new();
    match &header {
        Some(header) => {
            let used = header.chars().count() + 1;
            out.push_str(&format!(
                "╭─ {header} {}╮\n",
                "─".repeat(width.saturating_sub(used))
            ));
        }
        None => out.push_str(&format!("╭{}╮\n", "─".repeat(width + 2))),
    }
    for line in body {
        let pad = width.saturating_sub(line.chars().count());
        out.push_str(&format!("│ {line}{} │\n", " ".repeat(pad)));
    }
    out.push_str(&format!("╰{}╯", "─".repeat(width + 2)));
    out
}

fn render_essence(state: &DashboardState) -> String {
    match &state.essence {
        EssencePhase::Loading => panel(
            None,
            None,
            &["Preparando seu Bão Dia...".to_string()],
        ),
        EssencePhase::Ready(essence) => {
            let location_line = match &state.location {
                Some(_) => "📍 Localização detectada".to_string(),
                None => "📍 Onde quer que você esteja".to_string(),
            };
            let hero = panel(
                None,
                None,
                &[
                    essence.greeting.clone(),
                    format!("\"{}\"", essence.quote),
                    location_line,
                ],
            );
            let word = panel(
                Some("Palavra do Dia"),
                Some("📖"),
                &[
                    essence.word_of_day.word.clone(),
                    essence.word_of_day.meaning.clone(),
                ],
            );
            let tip = panel(Some("Dica de Bem-estar"), Some("✨"), &[essence.tip.clone()]);
            format!("{hero}\n{word}\n{tip}")
        }
    }
}

fn render_tasks(state: &DashboardState) -> String {
    let body: Vec<String> = if state.tasks.is_empty() {
        vec!["O que bão vamos fazer? (/task <texto>)".to_string()]
    } else {
        state
            .tasks
            .iter()
            .map(|task| {
                let marker = if task.completed { "✔" } else { "○" };
                format!("{marker} [{}] {}", task.id, task.text)
            })
            .collect()
    };
    panel(Some("Tarefas da Manhã"), Some("✅"), &body)
}

fn render_mood(state: &DashboardState) -> String {
    let body: Vec<String> = state
        .mood
        .iter()
        .map(|point| {
            let level = point.level.min(MOOD_LEVEL_MAX) as usize;
            format!("{:<4}{} {}", point.day, "█".repeat(level), point.level)
        })
        .collect();
    panel(Some("Energia Semanal"), Some("🙂"), &body)
}

fn render_art(state: &DashboardState) -> String {
    let body = vec![match &state.art {
        ArtPhase::Idle => "Gere uma imagem para decorar seu início de dia.".to_string(),
        ArtPhase::Generating => "Pintando sua manhã...".to_string(),
        ArtPhase::Ready(_) => format!("Imagem pronta. /save [{DEFAULT_ART_FILENAME}]"),
    }];
    panel(Some("Inspiração Visual"), Some("🎨"), &body)
}

fn render_dashboard(state: &DashboardState) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        render_essence(state),
        render_art(state),
        render_tasks(state),
        render_mood(state)
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use aura_contracts::essence::MorningEssence;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;

    use super::{
        panel, render_dashboard, render_essence, render_mood, render_tasks, save_data_uri,
        ArtPhase, DashboardState, EssencePhase, DEFAULT_IMAGE_PROMPT, PNG_DATA_URI_PREFIX,
    };

    #[test]
    fn fresh_state_is_loading_idle_with_seeded_prompt() {
        let state = DashboardState::new();
        assert_eq!(state.essence, EssencePhase::Loading);
        assert_eq!(state.art, ArtPhase::Idle);
        assert!(state.tasks.is_empty());
        assert_eq!(state.mood.len(), 7);
        assert_eq!(state.image_prompt, DEFAULT_IMAGE_PROMPT);
        assert_eq!(state.location, None);
    }

    #[test]
    fn essence_transitions_loading_then_ready() {
        let mut state = DashboardState::new();
        state.essence_ready(MorningEssence::fallback());
        assert!(matches!(state.essence, EssencePhase::Ready(_)));

        state.begin_refresh();
        assert_eq!(state.essence, EssencePhase::Loading);
    }

    #[test]
    fn art_transitions_cover_both_terminal_states() {
        let mut state = DashboardState::new();
        state.begin_art("um lago");
        assert_eq!(state.art, ArtPhase::Generating);
        assert_eq!(state.image_prompt, "um lago");

        state.art_finished(None);
        assert_eq!(state.art, ArtPhase::Idle);
        assert_eq!(state.art_data_uri(), None);

        state.begin_art("um lago");
        state.art_finished(Some("data:image/png;base64,QUJD".to_string()));
        assert_eq!(state.art_data_uri(), Some("data:image/png;base64,QUJD"));
    }

    #[test]
    fn blank_location_is_treated_as_absent() {
        let mut state = DashboardState::new();
        state.set_location(Some("   ".to_string()));
        assert_eq!(state.location, None);
        state.set_location(Some("-19.9, -43.9".to_string()));
        assert_eq!(state.location.as_deref(), Some("-19.9, -43.9"));
    }

    #[test]
    fn task_example_round_trip() {
        let mut state = DashboardState::new();
        let id = state.tasks.add("Beber água").unwrap().id.clone();
        assert!(state.tasks.toggle(&id));
        assert!(state.tasks.get(&id).unwrap().completed);
        assert!(state.tasks.remove(&id));
        assert!(state.tasks.is_empty());
    }

    #[test]
    fn save_decodes_data_uri_bytes_verbatim() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("arte/aura-inspira.png");
        let payload = b"not-really-a-png";
        let data_uri = format!("{PNG_DATA_URI_PREFIX}{}", BASE64.encode(payload));

        save_data_uri(&data_uri, &path)?;
        assert_eq!(fs::read(&path)?, payload);
        Ok(())
    }

    #[test]
    fn save_surfaces_unwritable_paths_as_plain_errors() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("ocupado");
        fs::write(&blocker, "arquivo, não diretório".as_bytes())?;

        let data_uri = format!("{PNG_DATA_URI_PREFIX}{}", BASE64.encode(b"png"));
        let err = save_data_uri(&data_uri, &blocker.join("arte.png")).unwrap_err();
        assert!(err.to_string().contains("failed to create"));
        Ok(())
    }

    #[test]
    fn save_rejects_foreign_data_uris() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("arte.png");
        let err = save_data_uri("data:text/plain;base64,QUJD", &path).unwrap_err();
        assert!(err.to_string().contains("unsupported data URI"));
        assert!(!path.exists());
    }

    #[test]
    fn panel_frames_header_and_body() {
        let card = panel(
            Some("Palavra do Dia"),
            Some("📖"),
            &["Alvorada".to_string()],
        );
        assert!(card.contains("📖 Palavra do Dia"));
        assert!(card.starts_with("╭"));
        assert!(card.ends_with("╯"));
        assert!(card.contains("│ Alvorada"));
    }

    #[test]
    fn essence_panels_show_loading_then_content() {
        let mut state = DashboardState::new();
        assert!(render_essence(&state).contains("Preparando seu Bão Dia..."));

        state.essence_ready(MorningEssence::fallback());
        let rendered = render_essence(&state);
        assert!(rendered.contains("Bão dia! Que seu dia seja iluminado."));
        assert!(rendered.contains("Palavra do Dia"));
        assert!(rendered.contains("Resiliência"));
        assert!(rendered.contains("Onde quer que você esteja"));

        state.set_location(Some("-19.9, -43.9".to_string()));
        assert!(render_essence(&state).contains("Localização detectada"));
    }

    #[test]
    fn mood_chart_bars_match_levels() {
        let state = DashboardState::new();
        let chart = render_mood(&state);
        assert!(chart.contains("Seg"));
        assert!(chart.contains(&"█".repeat(10)));
        assert!(!chart.contains(&"█".repeat(11)));
    }

    #[test]
    fn tasks_panel_lists_entries_with_ids() {
        let mut state = DashboardState::new();
        assert!(render_tasks(&state).contains("O que bão vamos fazer?"));

        let id = state.tasks.add("Beber água").unwrap().id.clone();
        let rendered = render_tasks(&state);
        assert!(rendered.contains(&format!("[{id}] Beber água")));
        assert!(rendered.contains("○"));

        state.tasks.toggle(&id);
        assert!(render_tasks(&state).contains("✔"));
    }

    #[test]
    fn dashboard_renders_all_regions() {
        let mut state = DashboardState::new();
        state.essence_ready(MorningEssence::fallback());
        let rendered = render_dashboard(&state);
        assert!(rendered.contains("Inspiração Visual"));
        assert!(rendered.contains("Tarefas da Manhã"));
        assert!(rendered.contains("Energia Semanal"));
    }
}
