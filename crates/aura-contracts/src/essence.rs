use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Word-of-the-day entry nested inside [`MorningEssence`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordOfDay {
    pub word: String,
    pub meaning: String,
}

/// The structured greeting record for the current session.
///
/// Produced fresh on every successful text request and replaced wholesale;
/// there is no identity beyond "most recent". The wire shape uses camelCase
/// for the nested object key (`wordOfDay`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorningEssence {
    pub greeting: String,
    pub quote: String,
    #[serde(rename = "wordOfDay")]
    pub word_of_day: WordOfDay,
    pub tip: String,
}

impl MorningEssence {
    /// The fixed record substituted when the text request fails in any way.
    ///
    /// Callers never observe an error from the essence request; they observe
    /// this value instead.
    pub fn fallback() -> Self {
        Self {
            greeting: "Bão dia! Que seu dia seja iluminado.".to_string(),
            quote: "A jornada de mil milhas começa com um único passo.".to_string(),
            word_of_day: WordOfDay {
                word: "Resiliência".to_string(),
                meaning: "Capacidade de se adaptar às mudanças.".to_string(),
            },
            tip: "Beba um copo de água ao acordar.".to_string(),
        }
    }

    /// The JSON schema declared to the text model for its reply.
    ///
    /// Four required top-level fields, with the nested word-of-day object
    /// itself requiring both of its string fields.
    pub fn response_schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "greeting": { "type": "STRING" },
                "quote": { "type": "STRING" },
                "wordOfDay": {
                    "type": "OBJECT",
                    "properties": {
                        "word": { "type": "STRING" },
                        "meaning": { "type": "STRING" },
                    },
                    "required": ["word", "meaning"],
                },
                "tip": { "type": "STRING" },
            },
            "required": ["greeting", "quote", "wordOfDay", "tip"],
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::MorningEssence;

    #[test]
    fn fallback_populates_every_field() {
        let essence = MorningEssence::fallback();
        assert!(!essence.greeting.is_empty());
        assert!(!essence.quote.is_empty());
        assert!(!essence.word_of_day.word.is_empty());
        assert!(!essence.word_of_day.meaning.is_empty());
        assert!(!essence.tip.is_empty());
    }

    #[test]
    fn fallback_is_deterministic() {
        assert_eq!(MorningEssence::fallback(), MorningEssence::fallback());
    }

    #[test]
    fn deserializes_camel_case_wire_shape() {
        let essence: MorningEssence = serde_json::from_value(json!({
            "greeting": "Bom dia!",
            "quote": "Sigamos.",
            "wordOfDay": { "word": "Alvorada", "meaning": "O romper do dia." },
            "tip": "Alongue-se.",
        }))
        .unwrap();
        assert_eq!(essence.word_of_day.word, "Alvorada");
        assert_eq!(essence.word_of_day.meaning, "O romper do dia.");

        let round = serde_json::to_value(&essence).unwrap();
        assert!(round.get("wordOfDay").is_some());
        assert!(round.get("word_of_day").is_none());
    }

    #[test]
    fn rejects_missing_required_field() {
        let result: Result<MorningEssence, _> = serde_json::from_value(json!({
            "greeting": "Bom dia!",
            "quote": "Sigamos.",
            "tip": "Alongue-se.",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn schema_declares_all_required_fields() {
        let schema = MorningEssence::response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(required, vec!["greeting", "quote", "wordOfDay", "tip"]);

        let nested = &schema["properties"]["wordOfDay"];
        let nested_required: Vec<&str> = nested["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(nested_required, vec!["word", "meaning"]);
    }
}
