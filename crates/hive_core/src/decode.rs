//! Decodificação tolerante de payloads MQTT.
//!
//! Os dispositivos da colmeia publicam JSON, mas o tópico de VOC já foi visto
//! com três formatos diferentes:
//!
//! ```text
//! {"index": 150}     objeto com chave
//! 150                número puro
//! "150"              string numérica (JSON ou texto cru)
//! ```
//!
//! Cada tópico declara o [`PayloadShape`] que aceita e o decoder tenta as
//! estratégias correspondentes em ordem, retornando a primeira que funcionar.

use serde_json::{Map, Value};

/// Formato esperado pelo consumidor do tópico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Apenas objeto JSON.
    Object,
    /// Objeto JSON, número puro ou string numérica.
    ObjectOrScalar,
}

/// Valor decodificado de um payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Object(Map<String, Value>),
    Scalar(f64),
}

impl DecodedValue {
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            DecodedValue::Object(map) => Some(map),
            DecodedValue::Scalar(_) => None,
        }
    }
}

/// Motivo de falha na decodificação.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("Payload não é UTF-8 válido")]
    NotUtf8,

    #[error("Payload vazio")]
    Empty,

    #[error("Payload não é um objeto JSON")]
    NotAnObject,

    #[error("Payload não é objeto nem valor numérico")]
    NotNumeric,
}

/// Falha de decodificação com contexto para diagnóstico.
///
/// Carrega o tópico e o payload cru (lossy UTF-8) apenas para log.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{topic}: {reason} (payload: {raw:?})")]
pub struct DecodeFailure {
    pub topic: String,
    pub raw: String,
    pub reason: DecodeError,
}

type Strategy = fn(&str) -> Option<DecodedValue>;

const OBJECT_STRATEGIES: &[Strategy] = &[json_object];

const SCALAR_STRATEGIES: &[Strategy] = &[json_object, json_number, json_numeric_string, bare_number];

/// Decodifica o payload de `topic` segundo o formato esperado.
///
/// Nunca entra em pânico: qualquer entrada inválida vira [`DecodeFailure`].
pub fn decode(topic: &str, raw: &[u8], shape: PayloadShape) -> Result<DecodedValue, DecodeFailure> {
    let fail = |reason| DecodeFailure {
        topic: topic.to_string(),
        raw: String::from_utf8_lossy(raw).into_owned(),
        reason,
    };

    let text = std::str::from_utf8(raw).map_err(|_| fail(DecodeError::NotUtf8))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(fail(DecodeError::Empty));
    }

    let (strategies, reason) = match shape {
        PayloadShape::Object => (OBJECT_STRATEGIES, DecodeError::NotAnObject),
        PayloadShape::ObjectOrScalar => (SCALAR_STRATEGIES, DecodeError::NotNumeric),
    };

    strategies
        .iter()
        .find_map(|strategy| strategy(text))
        .ok_or_else(|| fail(reason))
}

/// Converte um texto numérico (após trim) em `f64` finito.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ──────────────────────────────────────────────
// Estratégias
// ──────────────────────────────────────────────

fn json_object(text: &str) -> Option<DecodedValue> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(DecodedValue::Object(map)),
        _ => None,
    }
}

fn json_number(text: &str) -> Option<DecodedValue> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).map(DecodedValue::Scalar),
        _ => None,
    }
}

fn json_numeric_string(text: &str) -> Option<DecodedValue> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::String(s)) => parse_number(&s).map(DecodedValue::Scalar),
        _ => None,
    }
}

fn bare_number(text: &str) -> Option<DecodedValue> {
    parse_number(text).map(DecodedValue::Scalar)
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
