//! Lead scoring pipeline.
//!
//! Builds a prompt from the lead fields, asks the LLM for a JSON verdict and
//! normalizes whatever comes back into a bounded score, a classification and
//! an explanation. Malformed model output never fails the pipeline: it
//! degrades to a neutral `Morno`/50 result.

use crate::errors::AppError;
use crate::groq_client::{ChatCompletionRequest, ChatMessage, GroqClient};
use crate::models::{Classification, Lead, LeadAnalysis};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub const ANALYSIS_TEMPERATURE: f64 = 0.3;
pub const ANALYSIS_MAX_TOKENS: u32 = 500;

pub const FALLBACK_SCORE: i32 = 50;
pub const FALLBACK_REASON: &str =
    "Não foi possível analisar automaticamente. Análise manual recomendada.";
pub const DEFAULT_REASON: &str = "Análise realizada com base nas informações fornecidas.";

const SYSTEM_PROMPT: &str = r#"Você é um especialista em análise de leads e vendas. Analise leads e retorne APENAS um JSON válido no formato:
{
  "score": número de 0 a 100,
  "classification": "Frio" ou "Morno" ou "Quente",
  "reason": "explicação detalhada do score em português"
}

Classificação:
- Frio (0-40): Baixa intenção, mensagem genérica, sem urgência
- Morno (41-70): Interesse moderado, algumas informações específicas
- Quente (71-100): Alta intenção, pergunta específica, urgência, orçamento claro

Considere: qualidade da mensagem, origem, tempo de resposta e número de interações."#;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\n?").expect("valid fence regex"));

/// Fields of a lead that feed the scoring prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadAnalysisInput {
    pub message: String,
    pub origin: String,
    /// Response time in hours.
    pub response_time: Option<f64>,
    pub interactions: i32,
}

impl From<&Lead> for LeadAnalysisInput {
    fn from(lead: &Lead) -> Self {
        Self {
            message: lead.message.clone(),
            origin: lead.origin.clone(),
            response_time: lead.response_time,
            interactions: lead.interactions,
        }
    }
}

/// Scores leads through the Groq gateway.
#[derive(Clone)]
pub struct LeadAnalyzer {
    gateway: GroqClient,
    model: String,
}

impl LeadAnalyzer {
    pub fn new(gateway: GroqClient) -> Self {
        let model = gateway.default_model().to_string();
        Self { gateway, model }
    }

    /// Runs one scoring round trip.
    ///
    /// Gateway failures are returned as `ExternalApiError`; an unusable
    /// model answer resolves to the fallback analysis instead.
    pub async fn analyze(&self, input: &LeadAnalysisInput) -> Result<LeadAnalysis, AppError> {
        let prompt = build_analysis_prompt(input);
        tracing::debug!("Lead analysis prompt:\n{}", prompt);

        let completion = self
            .gateway
            .chat_completion(ChatCompletionRequest {
                messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
                model: Some(self.model.clone()),
                temperature: Some(ANALYSIS_TEMPERATURE),
                max_tokens: Some(ANALYSIS_MAX_TOKENS),
            })
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Erro ao analisar lead: {}", e)))?;

        tracing::debug!("Lead analysis raw response: {}", completion.content);
        Ok(parse_analysis_response(&completion.content))
    }
}

/// Builds the user prompt for one lead.
pub fn build_analysis_prompt(input: &LeadAnalysisInput) -> String {
    format!(
        "Analise este lead e retorne o JSON com score, classificação e motivo:\n\
         \n\
         MENSAGEM DO LEAD:\n\
         \"{}\"\n\
         \n\
         ORIGEM: {}\n\
         TEMPO DE RESPOSTA: {}\n\
         INTERAÇÕES: {}\n\
         \n\
         Retorne APENAS o JSON válido, sem markdown, sem código, apenas o JSON.",
        input.message,
        input.origin,
        describe_response_time(input.response_time),
        input.interactions
    )
}

/// "N horas", or "Não informado" when unknown or zero.
fn describe_response_time(hours: Option<f64>) -> String {
    match hours {
        Some(h) if h != 0.0 && !h.is_nan() => format!("{} horas", h),
        _ => "Não informado".to_string(),
    }
}

/// The neutral result used whenever the model answer cannot be decoded.
pub fn fallback_analysis() -> LeadAnalysis {
    LeadAnalysis {
        score: FALLBACK_SCORE,
        classification: Classification::Morno,
        reason: FALLBACK_REASON.to_string(),
    }
}

/// Parses the model answer. Never fails.
pub fn parse_analysis_response(content: &str) -> LeadAnalysis {
    let cleaned = CODE_FENCE.replace_all(content, "");
    let cleaned = cleaned.trim();

    let parsed = match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!("Lead analysis returned non-object JSON: {}", other);
            return fallback_analysis();
        }
        Err(e) => {
            tracing::warn!("Lead analysis returned invalid JSON ({}): {}", e, cleaned);
            return fallback_analysis();
        }
    };

    let classification = match parsed.get("classification") {
        None | Some(Value::Null) => Classification::Morno,
        Some(Value::String(raw)) => normalize_classification(raw),
        Some(other) => {
            tracing::warn!("Lead analysis returned a non-text classification: {}", other);
            return fallback_analysis();
        }
    };
    let score = parsed.get("score").map(coerce_score).unwrap_or(0);
    let reason = parsed
        .get("reason")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REASON)
        .to_string();

    LeadAnalysis {
        score,
        classification,
        reason,
    }
}

/// Reads an integer score from a JSON value and clamps it into [0, 100].
///
/// Numbers are truncated toward zero, strings contribute their leading
/// integer ("80 pontos" is 80). Anything else counts as 0.
pub fn coerce_score(value: &Value) -> i32 {
    let raw = match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(f64::trunc),
        Value::String(s) => leading_integer(s),
        _ => None,
    };
    clamp_score(raw.unwrap_or(0.0))
}

pub fn clamp_score(raw: f64) -> i32 {
    raw.clamp(0.0, 100.0) as i32
}

fn leading_integer(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<f64>().ok().map(|n| sign * n)
}

/// Case-insensitive substring match; anything unrecognized is `Morno`.
pub fn normalize_classification(raw: &str) -> Classification {
    let normalized = raw.trim().to_lowercase();

    if normalized.contains("quente") || normalized.contains("hot") {
        Classification::Quente
    } else if normalized.contains("frio") || normalized.contains("cold") {
        Classification::Frio
    } else {
        Classification::Morno
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(response_time: Option<f64>) -> LeadAnalysisInput {
        LeadAnalysisInput {
            message: "quero comprar agora, orçamento definido".to_string(),
            origin: "WhatsApp".to_string(),
            response_time,
            interactions: 3,
        }
    }

    #[test]
    fn test_prompt_embeds_fields() {
        let prompt = build_analysis_prompt(&input(Some(2.0)));
        assert!(prompt.contains("\"quero comprar agora, orçamento definido\""));
        assert!(prompt.contains("ORIGEM: WhatsApp"));
        assert!(prompt.contains("TEMPO DE RESPOSTA: 2 horas"));
        assert!(prompt.contains("INTERAÇÕES: 3"));
    }

    #[test]
    fn test_prompt_response_time_unknown() {
        assert!(build_analysis_prompt(&input(None)).contains("TEMPO DE RESPOSTA: Não informado"));
        assert!(build_analysis_prompt(&input(Some(0.0))).contains("TEMPO DE RESPOSTA: Não informado"));
        assert!(build_analysis_prompt(&input(Some(1.5))).contains("TEMPO DE RESPOSTA: 1.5 horas"));
    }

    #[test]
    fn test_parses_plain_json() {
        let result =
            parse_analysis_response(r#"{"score": 75, "classification": "Quente", "reason": "Urgente"}"#);
        assert_eq!(result.score, 75);
        assert_eq!(result.classification, Classification::Quente);
        assert_eq!(result.reason, "Urgente");
    }

    #[test]
    fn test_fenced_json_matches_plain() {
        let plain = r#"{"score": 62, "classification": "Morno", "reason": "Interesse"}"#;
        let fenced = format!("```json\n{}\n```", plain);
        let bare_fence = format!("```\n{}\n```", plain);
        assert_eq!(parse_analysis_response(&fenced), parse_analysis_response(plain));
        assert_eq!(parse_analysis_response(&bare_fence), parse_analysis_response(plain));
    }

    #[test]
    fn test_scores_are_clamped() {
        let low = parse_analysis_response(r#"{"score": -10, "classification": "frio"}"#);
        let high = parse_analysis_response(r#"{"score": 150, "classification": "quente"}"#);
        assert_eq!(low.score, 0);
        assert_eq!(high.score, 100);
    }

    #[test]
    fn test_score_coercion() {
        assert_eq!(coerce_score(&json!(75.9)), 75);
        assert_eq!(coerce_score(&json!("80")), 80);
        assert_eq!(coerce_score(&json!("  45 pontos")), 45);
        assert_eq!(coerce_score(&json!("alto")), 0);
        assert_eq!(coerce_score(&json!(null)), 0);
        assert_eq!(coerce_score(&json!(true)), 0);
        assert_eq!(coerce_score(&json!("-5")), 0);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let result = parse_analysis_response("{}");
        assert_eq!(result.score, 0);
        assert_eq!(result.classification, Classification::Morno);
        assert_eq!(result.reason, DEFAULT_REASON);
    }

    #[test]
    fn test_malformed_output_falls_back() {
        for raw in ["not json", "", "{\"score\": 80", "[1, 2]", "42", "null"] {
            assert_eq!(parse_analysis_response(raw), fallback_analysis(), "input: {:?}", raw);
        }
    }

    #[test]
    fn test_classification_normalization() {
        for raw in ["Quente", "quente", "HOT", "  lead muito quente "] {
            assert_eq!(normalize_classification(raw), Classification::Quente);
        }
        for raw in ["Frio", "frio", "COLD"] {
            assert_eq!(normalize_classification(raw), Classification::Frio);
        }
        for raw in ["Morno", "outro", "", "???"] {
            assert_eq!(normalize_classification(raw), Classification::Morno);
        }
    }

    #[test]
    fn test_non_text_classification_falls_back() {
        for raw in [
            r#"{"score": 90, "classification": 3}"#,
            r#"{"score": 90, "classification": true}"#,
            r#"{"score": 90, "classification": ["Quente"]}"#,
        ] {
            assert_eq!(parse_analysis_response(raw), fallback_analysis(), "input: {:?}", raw);
        }
    }

    #[test]
    fn test_null_classification_is_morno() {
        let result = parse_analysis_response(r#"{"score": 90, "classification": null}"#);
        assert_eq!(result.classification, Classification::Morno);
        assert_eq!(result.score, 90);
    }
}
