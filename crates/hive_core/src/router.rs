//! Roteamento tópico → estado.
//!
//! Cada tópico do namespace tem uma linha na [`TOPIC_TABLE`]: o sufixo, o
//! formato de payload aceito e a função redutora que transforma o valor
//! decodificado em um [`StateDelta`]. Adicionar um tópico é adicionar uma
//! linha; as outras não mudam.
//!
//! Regras comuns a todas as redutoras:
//! - um campo está presente quando existe e não é `null` (zero é presente);
//! - campos ausentes ou com tipo errado não entram no delta;
//! - nada aqui é fatal, o pior caso é manter o último valor conhecido.

use crate::config::AppConfig;
use crate::decode::{self, DecodeFailure, DecodedValue, PayloadShape};
use crate::state::*;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

pub const TOPIC_SYSTEM: &str = "system";
pub const TOPIC_LOADCELL: &str = "loadcell1";
pub const TOPIC_BEECOUNT: &str = "beecount";
pub const TOPIC_ATMOSPHERE: &str = "atmosphera";
pub const TOPIC_VOC: &str = "voc";
pub const TOPIC_EXTERNAL: &str = "temp_umi";
pub const TOPIC_ALL: &str = "all";

/// Chaves do tópico consolidado que nunca são aplicadas.
const INERT_KEYS: &[&str] = &["loadcell", "scale", "weight"];

/// Contexto passado às redutoras.
struct ReduceCtx<'a> {
    topic: &'a str,
    volumes: &'a [String],
    legacy_aliases: bool,
}

type Reducer = fn(&ReduceCtx<'_>, &DecodedValue) -> StateDelta;

/// Tabela canônica de tópicos (sufixo, formato, redutora).
const TOPIC_TABLE: &[(&str, PayloadShape, Reducer)] = &[
    (TOPIC_SYSTEM, PayloadShape::Object, reduce_system),
    (TOPIC_LOADCELL, PayloadShape::Object, reduce_loadcell),
    (TOPIC_BEECOUNT, PayloadShape::Object, reduce_beecount),
    (TOPIC_ATMOSPHERE, PayloadShape::Object, reduce_atmosphere),
    (TOPIC_VOC, PayloadShape::ObjectOrScalar, reduce_voc),
    (TOPIC_EXTERNAL, PayloadShape::Object, reduce_external),
    (TOPIC_ALL, PayloadShape::Object, reduce_all),
];

/// Resultado do roteamento de uma mensagem.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Delta com pelo menos um campo.
    Applied(StateDelta),
    /// Payload válido, mas sem nenhum campo reconhecido.
    Empty,
    /// Payload não decodificável; estado intacto.
    DecodeFailed(DecodeFailure),
    /// Tópico fora da tabela.
    Unroutable,
}

#[derive(Clone, Copy)]
struct Binding {
    shape: PayloadShape,
    reduce: Reducer,
}

/// Mapeia tópicos exatos para redutoras.
pub struct Router {
    bindings: HashMap<String, Binding>,
    volumes: Vec<String>,
    legacy_aliases: bool,
}

impl Router {
    /// Cria o roteador para `namespace` monitorando os volumes `volumes`.
    pub fn new(namespace: &str, volumes: Vec<String>, legacy_aliases: bool) -> Self {
        let bindings = TOPIC_TABLE
            .iter()
            .map(|&(suffix, shape, reduce)| (format!("{namespace}/{suffix}"), Binding { shape, reduce }))
            .collect();
        Self {
            bindings,
            volumes,
            legacy_aliases,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.broker.namespace,
            config.storage.iter().map(|v| v.key.clone()).collect(),
            config.payload.accept_legacy_aliases,
        )
    }

    /// Tópicos reconhecidos (ordem arbitrária).
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Decodifica e reduz uma mensagem sem tocar no estado.
    pub fn route(&self, topic: &str, raw: &[u8]) -> RouteOutcome {
        let Some(binding) = self.bindings.get(topic) else {
            debug!("Tópico sem rota ignorado: {topic}");
            return RouteOutcome::Unroutable;
        };

        let value = match decode::decode(topic, raw, binding.shape) {
            Ok(value) => value,
            Err(failure) => {
                warn!("Payload inválido ignorado: {failure}");
                return RouteOutcome::DecodeFailed(failure);
            }
        };

        let ctx = ReduceCtx {
            topic,
            volumes: &self.volumes,
            legacy_aliases: self.legacy_aliases,
        };
        let delta = (binding.reduce)(&ctx, &value);
        if delta.is_empty() {
            debug!("{topic}: nenhum campo reconhecido");
            RouteOutcome::Empty
        } else {
            RouteOutcome::Applied(delta)
        }
    }

    /// Roteia e aplica no estado. Retorna o resultado para diagnóstico.
    pub fn dispatch(&self, state: &mut HiveState, topic: &str, raw: &[u8]) -> RouteOutcome {
        let outcome = self.route(topic, raw);
        if let RouteOutcome::Applied(delta) = &outcome {
            state.apply(delta);
        }
        outcome
    }
}

// ──────────────────────────────────────────────
// Leitura de campos
// ──────────────────────────────────────────────

fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Null => None,
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        other => {
            debug!("Campo '{key}' com tipo inesperado: {other}");
            None
        }
    }
}

/// Campo canônico, ou o alias antigo se permitido (com aviso).
fn number_or_alias(ctx: &ReduceCtx<'_>, map: &Map<String, Value>, key: &str, alias: &str) -> Option<f64> {
    if let Some(v) = number(map, key) {
        return Some(v);
    }
    if !ctx.legacy_aliases {
        return None;
    }
    let v = number(map, alias)?;
    warn!("{}: campo obsoleto '{alias}', use '{key}'", ctx.topic);
    Some(v)
}

/// Contador não negativo, truncado para inteiro.
///
/// Valores fora da faixa de `u64` contam como ausentes.
fn count(map: &Map<String, Value>, key: &str) -> Option<u64> {
    let v = number(map, key)?;
    if v < 0.0 {
        debug!("Contador '{key}' negativo ignorado: {v}");
        return None;
    }
    // u64::MAX as f64 arredonda para 2^64, já fora da faixa
    if v >= u64::MAX as f64 {
        debug!("Contador '{key}' fora da faixa ignorado: {v}");
        return None;
    }
    Some(v.trunc() as u64)
}

/// Número presente e diferente de zero.
fn truthy(map: &Map<String, Value>, key: &str) -> Option<f64> {
    number(map, key).filter(|v| *v != 0.0)
}

fn object<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    match map.get(key)? {
        Value::Object(inner) => Some(inner),
        Value::Null => None,
        other => {
            debug!("Sub-objeto '{key}' com tipo inesperado: {other}");
            None
        }
    }
}

/// Índice VOC em qualquer formato aceito dentro de um JSON.
fn voc_index(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => decode::parse_number(s),
        Value::Object(map) => nested_index(map),
        _ => None,
    }
}

/// Campo `index` de um objeto VOC: número ou string numérica.
fn nested_index(map: &Map<String, Value>) -> Option<f64> {
    match map.get("index")? {
        inner @ (Value::Number(_) | Value::String(_)) => voc_index(inner),
        _ => None,
    }
}

// ──────────────────────────────────────────────
// Patches reutilizados pelo tópico consolidado
// ──────────────────────────────────────────────

fn flow_patch(map: &Map<String, Value>) -> Option<FlowPatch> {
    let patch = FlowPatch {
        count_in: count(map, "in"),
        count_out: count(map, "out"),
    };
    (patch != FlowPatch::default()).then_some(patch)
}

fn atmosphere_patch(ctx: &ReduceCtx<'_>, map: &Map<String, Value>) -> Option<AtmospherePatch> {
    let patch = AtmospherePatch {
        co2_ppm: number(map, "co2"),
        temperature_c: number_or_alias(ctx, map, "temperature", "temp"),
        humidity_pct: number_or_alias(ctx, map, "humidity", "hum"),
    };
    (patch != AtmospherePatch::default()).then_some(patch)
}

fn climate_patch(ctx: &ReduceCtx<'_>, map: &Map<String, Value>) -> Option<ClimatePatch> {
    let patch = ClimatePatch {
        temperature_c: number_or_alias(ctx, map, "temperature", "temp"),
        humidity_pct: number_or_alias(ctx, map, "humidity", "hum"),
    };
    (patch != ClimatePatch::default()).then_some(patch)
}

// ──────────────────────────────────────────────
// Redutoras
// ──────────────────────────────────────────────

// Todas as redutoras de formato Object recebem sempre um objeto; o `else`
// só existe para o compilador.

fn reduce_system(ctx: &ReduceCtx<'_>, value: &DecodedValue) -> StateDelta {
    let Some(map) = value.as_object() else {
        return StateDelta::default();
    };

    let volumes = ctx
        .volumes
        .iter()
        .filter_map(|key| {
            let used = truthy(map, &format!("{key}_used"))?;
            let total = truthy(map, &format!("{key}_total"))?;
            Some(VolumePatch {
                key: key.clone(),
                used_gb: used,
                total_gb: total,
            })
        })
        .collect();

    let is_charging = match map.get("charging") {
        Some(Value::Bool(b)) => Some(*b),
        _ => None,
    };

    let patch = SystemPatch {
        battery_percent: number(map, "battery"),
        is_charging,
        volumes,
    };
    StateDelta {
        system: (patch != SystemPatch::default()).then_some(patch),
        ..Default::default()
    }
}

fn reduce_loadcell(ctx: &ReduceCtx<'_>, value: &DecodedValue) -> StateDelta {
    let Some(map) = value.as_object() else {
        return StateDelta::default();
    };

    if map.contains_key("tare") {
        debug!("{}: tara via telemetria ignorada (só por comando)", ctx.topic);
    }

    // Payload atual em gramas; o formato antigo mandava kg em `raw`.
    let raw_kg = number(map, "weight").map(|grams| grams / 1000.0).or_else(|| {
        if !ctx.legacy_aliases {
            return None;
        }
        let kg = number(map, "raw")?;
        warn!("{}: campo obsoleto 'raw' (kg), use 'weight' (g)", ctx.topic);
        Some(kg)
    });

    StateDelta {
        scale: raw_kg.map(|raw_kg| ScalePatch { raw_kg: Some(raw_kg) }),
        ..Default::default()
    }
}

fn reduce_beecount(_ctx: &ReduceCtx<'_>, value: &DecodedValue) -> StateDelta {
    StateDelta {
        flow: value.as_object().and_then(flow_patch),
        ..Default::default()
    }
}

fn reduce_atmosphere(ctx: &ReduceCtx<'_>, value: &DecodedValue) -> StateDelta {
    StateDelta {
        atmosphere: value.as_object().and_then(|map| atmosphere_patch(ctx, map)),
        ..Default::default()
    }
}

fn reduce_external(ctx: &ReduceCtx<'_>, value: &DecodedValue) -> StateDelta {
    StateDelta {
        external: value.as_object().and_then(|map| climate_patch(ctx, map)),
        ..Default::default()
    }
}

fn reduce_voc(ctx: &ReduceCtx<'_>, value: &DecodedValue) -> StateDelta {
    let index = match value {
        DecodedValue::Scalar(v) => Some(*v),
        DecodedValue::Object(map) => nested_index(map),
    };
    if index.is_none() {
        warn!("{}: formato VOC desconhecido: {value:?}", ctx.topic);
    }
    StateDelta {
        voc_index: index,
        ..Default::default()
    }
}

fn reduce_all(ctx: &ReduceCtx<'_>, value: &DecodedValue) -> StateDelta {
    let Some(map) = value.as_object() else {
        return StateDelta::default();
    };

    for key in INERT_KEYS {
        if map.contains_key(*key) {
            debug!("{}: campo '{key}' é inerte neste tópico", ctx.topic);
        }
    }

    let voc_index = match map.get("voc") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let index = voc_index(v);
            if index.is_none() {
                warn!("{}: formato VOC desconhecido: {v}", ctx.topic);
            }
            index
        }
    };

    StateDelta {
        flow: object(map, "bees").and_then(flow_patch),
        atmosphere: object(map, "atmosphere").and_then(|m| atmosphere_patch(ctx, m)),
        external: object(map, "external").and_then(|m| climate_patch(ctx, m)),
        voc_index,
        ..Default::default()
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
