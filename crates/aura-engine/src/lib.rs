use std::env;
use std::io::Cursor;

use anyhow::{bail, Context, Result};
use aura_contracts::essence::MorningEssence;
use aura_contracts::journal::{Journal, JournalPayload};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{Rgb, RgbImage};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const ART_ASPECT_RATIO: &str = "1:1";
const DATA_URI_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Clone)]
pub struct TextRequest {
    pub model: String,
    pub prompt: String,
    pub response_schema: Value,
}

#[derive(Debug, Clone)]
pub struct ArtRequest {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: String,
}

/// Schema-constrained text transport. Returns the raw reply text of the
/// first candidate; parsing into [`MorningEssence`] happens in the engine.
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &TextRequest) -> Result<String>;
}

/// Image transport. Returns the full response payload; the engine scans it
/// for inline image data.
pub trait ArtProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &ArtRequest) -> Result<Value>;
}

struct GeminiTextProvider {
    api_base: String,
    http: HttpClient,
}

impl GeminiTextProvider {
    fn new() -> Self {
        Self {
            api_base: gemini_api_base(),
            http: HttpClient::new(),
        }
    }
}

impl TextProvider for GeminiTextProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &TextRequest) -> Result<String> {
        let Some(api_key) = gemini_api_key() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let endpoint = endpoint_for_model(&self.api_base, &request.model);
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            },
        });

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key.as_str())])
            .json(&payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let parsed = response_json_or_error("Gemini", response)?;
        first_text_part(&parsed).ok_or_else(|| anyhow::anyhow!("Gemini reply carried no text part"))
    }
}

struct GeminiArtProvider {
    api_base: String,
    http: HttpClient,
}

impl GeminiArtProvider {
    fn new() -> Self {
        Self {
            api_base: gemini_api_base(),
            http: HttpClient::new(),
        }
    }
}

impl ArtProvider for GeminiArtProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &ArtRequest) -> Result<Value> {
        let Some(api_key) = gemini_api_key() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let endpoint = endpoint_for_model(&self.api_base, &request.model);
        let payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "generationConfig": {
                "candidateCount": 1,
                "responseModalities": ["IMAGE"],
                "imageConfig": {
                    "aspectRatio": request.aspect_ratio,
                },
            },
        });

        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key.as_str())])
            .json(&payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error("Gemini", response)
    }
}

/// Offline text transport keyed by `dryrun*` model names. Deterministic and
/// schema-conforming, so the success path stays testable without a network.
struct DryrunTextProvider;

impl TextProvider for DryrunTextProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, _request: &TextRequest) -> Result<String> {
        let reply = json!({
            "greeting": "Bão dia, sô! Levanta que o café tá passando.",
            "quote": "Devagar também é pressa.",
            "wordOfDay": {
                "word": "Alvorada",
                "meaning": "O romper do dia; o primeiro clarão da manhã.",
            },
            "tip": "Abra a janela e respire fundo três vezes.",
        });
        Ok(serde_json::to_string(&reply)?)
    }
}

/// Offline image transport. Synthesizes a flat-color PNG from a prompt hash
/// and wraps it in a Gemini-shaped payload so the inline-data scan runs.
struct DryrunArtProvider;

impl ArtProvider for DryrunArtProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &ArtRequest) -> Result<Value> {
        let (r, g, b) = color_from_prompt(&request.prompt);
        let mut canvas = RgbImage::new(256, 256);
        for pixel in canvas.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .context("dryrun PNG encode failed")?;

        Ok(json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "image/png",
                            "data": BASE64.encode(bytes),
                        },
                    }],
                },
            }],
        }))
    }
}

fn text_provider_for(model: &str) -> Box<dyn TextProvider> {
    if model.trim().to_ascii_lowercase().starts_with("dryrun") {
        Box::new(DryrunTextProvider)
    } else {
        Box::new(GeminiTextProvider::new())
    }
}

fn art_provider_for(model: &str) -> Box<dyn ArtProvider> {
    if model.trim().to_ascii_lowercase().starts_with("dryrun") {
        Box::new(DryrunArtProvider)
    } else {
        Box::new(GeminiArtProvider::new())
    }
}

/// Owns the two generative request operations and the diagnostics journal.
///
/// Both operations are total: transport errors, schema violations, and
/// missing inline data are absorbed here and recorded in the journal, so
/// callers only ever see a value (or an absent image).
pub struct MorningEngine {
    journal: Journal,
    text_model: String,
    image_model: String,
    text: Box<dyn TextProvider>,
    art: Box<dyn ArtProvider>,
}

impl MorningEngine {
    pub fn new(
        journal: Journal,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        let text_model = text_model.into();
        let image_model = image_model.into();
        let text = text_provider_for(&text_model);
        let art = art_provider_for(&image_model);
        Self {
            journal,
            text_model,
            image_model,
            text,
            art,
        }
    }

    /// Constructor with explicit transports; the seam tests inject through.
    pub fn with_providers(
        journal: Journal,
        text_model: impl Into<String>,
        image_model: impl Into<String>,
        text: Box<dyn TextProvider>,
        art: Box<dyn ArtProvider>,
    ) -> Self {
        Self {
            journal,
            text_model: text_model.into(),
            image_model: image_model.into(),
            text,
            art,
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn text_model(&self) -> &str {
        &self.text_model
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    /// Requests the morning greeting record, constrained to the declared
    /// schema. Always returns a value: any failure yields
    /// [`MorningEssence::fallback`] and a journal entry with the error chain.
    pub fn morning_essence(&self, location: Option<&str>) -> MorningEssence {
        let request = TextRequest {
            model: self.text_model.clone(),
            prompt: essence_prompt(location),
            response_schema: MorningEssence::response_schema(),
        };
        self.note(
            "essence_requested",
            json!({
                "model": request.model,
                "provider": self.text.name(),
                "location": location.unwrap_or(""),
            }),
        );

        match self
            .text
            .generate(&request)
            .and_then(|reply| parse_essence(&reply))
        {
            Ok(essence) => {
                self.note("essence_ready", json!({ "provider": self.text.name() }));
                essence
            }
            Err(err) => {
                self.note(
                    "essence_fallback",
                    json!({ "error": error_chain_text(&err, 512) }),
                );
                MorningEssence::fallback()
            }
        }
    }

    /// Requests one decorative image for the prompt, wrapped with the fixed
    /// stylistic instruction, at a square aspect ratio. Returns the inline
    /// payload re-encoded as a PNG data URI, or `None` when the response has
    /// no inline data or the request fails. "No image" is a normal terminal
    /// state, not an error.
    pub fn generate_art(&self, prompt: &str) -> Option<String> {
        let request = ArtRequest {
            model: self.image_model.clone(),
            prompt: styled_art_prompt(prompt),
            aspect_ratio: ART_ASPECT_RATIO.to_string(),
        };
        self.note(
            "art_requested",
            json!({
                "model": request.model,
                "provider": self.art.name(),
                "prompt": truncate_text(prompt, 200),
            }),
        );

        match self.art.generate(&request) {
            Ok(payload) => match first_inline_data(&payload) {
                Some(data) => {
                    self.note("art_ready", json!({ "provider": self.art.name() }));
                    Some(format!("{DATA_URI_PREFIX}{data}"))
                }
                None => {
                    self.note("art_empty", json!({ "provider": self.art.name() }));
                    None
                }
            },
            Err(err) => {
                self.note(
                    "art_failed",
                    json!({ "error": error_chain_text(&err, 512) }),
                );
                None
            }
        }
    }

    // Journal writes must not break the total request contract.
    fn note(&self, entry_type: &str, payload: Value) {
        let payload = payload
            .as_object()
            .cloned()
            .unwrap_or_else(JournalPayload::new);
        let _ = self.journal.emit(entry_type, payload);
    }
}

/// The natural-language instruction sent with the declared schema. The
/// location line falls back to "Desconhecida" when nothing is known.
pub fn essence_prompt(location: Option<&str>) -> String {
    let location = location
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("Desconhecida");
    format!(
        "Gere uma mensagem calorosa de \"Bão Dia\" para o usuário.\n\
         Se a localização for fornecida, mencione algo suave sobre o clima ou o dia lá.\n\
         Localização: {location}.\n\
         Retorne um JSON com:\n\
         - greeting: Uma saudação amigável e regional (estilo mineiro/interiorano gentil).\n\
         - quote: Uma citação inspiradora curta.\n\
         - wordOfDay: Uma palavra interessante do português com significado.\n\
         - tip: Uma dica de bem-estar para a manhã."
    )
}

/// Fixed stylistic wrapper applied to every art prompt before submission.
pub fn styled_art_prompt(prompt: &str) -> String {
    format!(
        "Uma representação artística de: {}. \
         Estilo de pintura a óleo suave ou fotografia artística de alta qualidade.",
        prompt.trim()
    )
}

/// Parses a model reply as the essence record. Trims first: models under a
/// JSON mime constraint still occasionally pad the payload with whitespace.
pub fn parse_essence(reply: &str) -> Result<MorningEssence> {
    serde_json::from_str(reply.trim()).context("reply did not match the declared essence schema")
}

/// First non-empty text part of the first candidate.
fn first_text_part(payload: &Value) -> Option<String> {
    payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?
        .iter()
        .find_map(|part| {
            part.get("text")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
}

/// First inline-data payload in the first candidate's content parts. Later
/// candidates are ignored; absence is a valid, non-error response.
pub fn first_inline_data(payload: &Value) -> Option<String> {
    payload
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?
        .iter()
        .find_map(|part| {
            part.get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(|inline| inline.get("data"))
                .and_then(Value::as_str)
                .filter(|data| !data.is_empty())
                .map(str::to_string)
        })
}

/// Best-effort geolocation, consumed once per session. `AURA_LOCATION`
/// overrides; otherwise one GET against an IP-geolocation endpoint. Every
/// failure collapses to `None` and the greeting proceeds without it.
pub fn detect_location() -> Option<String> {
    detect_location_with(non_empty_env("AURA_LOCATION"))
}

fn detect_location_with(override_location: Option<String>) -> Option<String> {
    if let Some(location) = override_location
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        return Some(location);
    }
    let endpoint = format!("{}/json", geo_api_base());
    let response = HttpClient::new().get(&endpoint).send().ok()?;
    if !response.status().is_success() {
        return None;
    }
    let payload: Value = response.json().ok()?;
    let lat = payload.get("lat").and_then(Value::as_f64)?;
    let lon = payload.get("lon").and_then(Value::as_f64)?;
    Some(format!("{lat}, {lon}"))
}

fn gemini_api_base() -> String {
    env::var("GEMINI_API_BASE")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string())
}

fn gemini_api_key() -> Option<String> {
    non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
}

fn geo_api_base() -> String {
    env::var("AURA_GEO_API_BASE")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "http://ip-api.com".to_string())
}

fn endpoint_for_model(api_base: &str, model: &str) -> String {
    let trimmed = model.trim();
    let model_path = if trimmed.starts_with("models/") {
        trimmed.to_string()
    } else {
        format!("models/{trimmed}")
    };
    format!("{api_base}/{model_path}:generateContent")
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}
