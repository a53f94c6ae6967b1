//! Capability surface registered into the script engine.
//!
//! Scripts see only these functions plus the engine's own pure builtins:
//! read-only contexts, text and regex utilities, sequence helpers, and the
//! session's variables and answer through a per-execution copy.

use crate::core::{Answer, Context, Value};
use crate::error::{Error, SearchError, SessionError};
use crate::io::{CharIndex, char_len, split_lines};
use crate::search::{SearchOptions, find_all, search};
use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, INT, Map, Position};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Result type of fallible script functions.
type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// Largest list `range_list` will build.
const MAX_RANGE_LEN: usize = 10_000_000;

/// Session state a script may change, committed back after it ends.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptState {
    pub(crate) variables: BTreeMap<String, Value>,
    pub(crate) answer: Answer,
}

/// What one execution can reach.
#[derive(Debug, Clone)]
pub(crate) struct ScriptEnv {
    pub(crate) contexts: Arc<HashMap<String, Arc<Context>>>,
    pub(crate) state: Arc<Mutex<ScriptState>>,
}

impl ScriptEnv {
    fn with_state<T>(&self, f: impl FnOnce(&mut ScriptState) -> T) -> T {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn context(&self, id: &str) -> ScriptResult<Arc<Context>> {
        self.contexts.get(id).cloned().ok_or_else(|| {
            raise(
                &SessionError::ContextNotFound { id: id.to_string() }.into(),
                id,
            )
        })
    }
}

/// Throws a script error tagged with the engine error code, so the failure
/// can be reported with that code once the script ends.
fn raise(err: &Error, detail: &str) -> Box<EvalAltResult> {
    let mut tag = Map::new();
    tag.insert("code".into(), Dynamic::from(err.code().to_string()));
    tag.insert("detail".into(), Dynamic::from(detail.to_string()));
    tag.insert("message".into(), Dynamic::from(err.to_string()));
    Box::new(EvalAltResult::ErrorRuntime(Dynamic::from_map(tag), Position::NONE))
}

/// Unwraps function-call frames down to the error that was raised.
pub(crate) fn root_cause(err: &EvalAltResult) -> &EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
        | EvalAltResult::ErrorInModule(_, inner, _) => root_cause(inner),
        other => other,
    }
}

/// Rebuilds the engine error from a value thrown by [`raise`].
pub(crate) fn tagged_error(value: &Dynamic) -> Option<Error> {
    let tag = value.read_lock::<Map>()?;
    let field = |name: &str| tag.get(name).and_then(|v| v.clone().into_string().ok());
    let detail = field("detail")?;
    let error = match field("code")?.as_str() {
        "InvalidPattern" => SearchError::InvalidPattern(detail).into(),
        "ContextNotFound" => SessionError::ContextNotFound { id: detail }.into(),
        "VariableNotFound" => SessionError::VariableNotFound { name: detail }.into(),
        _ => return None,
    };
    Some(error)
}

fn compile(pattern: &str) -> ScriptResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        let detail = e.to_string();
        raise(&SearchError::InvalidPattern(detail.clone()).into(), &detail)
    })
}

fn to_int(n: usize) -> INT {
    INT::try_from(n).unwrap_or(INT::MAX)
}

fn to_index(n: INT) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn strings<'a>(items: impl IntoIterator<Item = &'a str>) -> Array {
    items.into_iter().map(|s| Dynamic::from(s.to_string())).collect()
}

/// Registers every helper on `engine`.
pub(crate) fn register(engine: &mut Engine, env: &ScriptEnv) {
    register_contexts(engine, env);
    register_text(engine);
    register_regex(engine);
    register_sequences(engine);
    register_variables(engine, env);
    register_answer(engine, env);
}

fn register_contexts(engine: &mut Engine, env: &ScriptEnv) {
    let e = env.clone();
    engine.register_fn("get_context", move |id: ImmutableString| -> ScriptResult<String> {
        Ok(e.context(&id)?.text().to_string())
    });

    let e = env.clone();
    engine.register_fn("context_info", move |id: ImmutableString| -> ScriptResult<Map> {
        let ctx = e.context(&id)?;
        let mut info = Map::new();
        info.insert("id".into(), Dynamic::from(ctx.id.clone()));
        info.insert("length".into(), Dynamic::from(to_int(ctx.metadata.length)));
        info.insert("lineCount".into(), Dynamic::from(to_int(ctx.metadata.line_count)));
        info.insert("wordCount".into(), Dynamic::from(to_int(ctx.metadata.word_count)));
        info.insert(
            "structure".into(),
            Dynamic::from(ctx.metadata.structure.as_str().to_string()),
        );
        Ok(info)
    });

    let e = env.clone();
    engine.register_fn("context_ids", move || -> Array {
        let mut ids: Vec<&str> = e.contexts.keys().map(String::as_str).collect();
        ids.sort_unstable();
        strings(ids)
    });

    let e = env.clone();
    engine.register_fn(
        "read_range",
        move |id: ImmutableString, start: INT, end: INT| -> ScriptResult<String> {
            let ctx = e.context(&id)?;
            let index = CharIndex::new(ctx.text());
            Ok(index.slice(to_index(start), to_index(end)).to_string())
        },
    );
}

fn register_text(engine: &mut Engine) {
    engine.register_fn("text_len", |s: ImmutableString| to_int(char_len(&s)));
    engine.register_fn("slice", |s: ImmutableString, start: INT, end: INT| {
        CharIndex::new(&s)
            .slice(to_index(start), to_index(end))
            .to_string()
    });
    engine.register_fn("split_by", |s: ImmutableString, sep: ImmutableString| -> Array {
        if sep.is_empty() {
            s.chars().map(|c| Dynamic::from(c.to_string())).collect()
        } else {
            strings(s.split(sep.as_str()))
        }
    });
    engine.register_fn("join", |items: Array, sep: ImmutableString| {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(sep.as_str())
    });
    engine.register_fn("lines", |s: ImmutableString| strings(split_lines(&s)));
    engine.register_fn("words", |s: ImmutableString| strings(s.split_whitespace()));
    engine.register_fn("lower", |s: ImmutableString| s.to_lowercase());
    engine.register_fn("upper", |s: ImmutableString| s.to_uppercase());
    engine.register_fn("trimmed", |s: ImmutableString| s.trim().to_string());
    engine.register_fn("contains_text", |s: ImmutableString, needle: ImmutableString| {
        s.contains(needle.as_str())
    });
}

fn register_regex(engine: &mut Engine) {
    engine.register_fn(
        "regex_test",
        |text: ImmutableString, pattern: ImmutableString| -> ScriptResult<bool> {
            Ok(compile(&pattern)?.is_match(&text))
        },
    );
    engine.register_fn(
        "regex_search",
        |text: ImmutableString, pattern: ImmutableString| -> ScriptResult<Dynamic> {
            compile(&pattern)?;
            let options = SearchOptions {
                context_chars: 0,
                max_results: usize::MAX,
                include_line_numbers: false,
                ..SearchOptions::default()
            };
            let matches = search(&text, &pattern, &options)
                .map_err(|e| raise(&e, &pattern))?;
            to_dynamic(&matches)
        },
    );
    engine.register_fn(
        "regex_find_all",
        |text: ImmutableString, pattern: ImmutableString| -> ScriptResult<Array> {
            let regex = compile(&pattern)?;
            Ok(strings(regex.find_iter(&text).map(|m| m.as_str())))
        },
    );
    engine.register_fn(
        "regex_replace",
        |text: ImmutableString, pattern: ImmutableString, replacement: ImmutableString| -> ScriptResult<String> {
            let regex = compile(&pattern)?;
            Ok(regex.replace_all(&text, replacement.as_str()).into_owned())
        },
    );
    engine.register_fn("find_all", |text: ImmutableString, needle: ImmutableString| -> Array {
        find_all(&text, &needle, true)
            .into_iter()
            .map(|offset| Dynamic::from(to_int(offset)))
            .collect()
    });
}

fn register_sequences(engine: &mut Engine) {
    engine.register_fn("range_list", |start: INT, end: INT| -> ScriptResult<Array> {
        let len = usize::try_from(end.saturating_sub(start)).unwrap_or(0);
        if len > MAX_RANGE_LEN {
            return Err(format!("range_list: at most {MAX_RANGE_LEN} elements").into());
        }
        Ok((start..end).map(Dynamic::from).collect())
    });
    engine.register_fn("unique", |items: Array| -> Array {
        let mut seen = HashSet::new();
        items
            .into_iter()
            .filter(|item| seen.insert(format!("{}:{item}", item.type_name())))
            .collect()
    });
    engine.register_fn("sorted", sorted);
    engine.register_fn("chunk_list", |items: Array, size: INT| -> ScriptResult<Array> {
        let size = usize::try_from(size)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| "chunk_list: size must be > 0".to_string())?;
        Ok(items
            .chunks(size)
            .map(|chunk| Dynamic::from_array(chunk.to_vec()))
            .collect())
    });
}

/// Returns a sorted copy; elements must all be numbers or all be strings.
fn sorted(items: Array) -> ScriptResult<Array> {
    let mut items = items;
    if items.iter().all(Dynamic::is_int) {
        items.sort_by_key(|item| item.as_int().unwrap_or_default());
    } else if items.iter().all(|item| item.is_int() || item.is_float()) {
        items.sort_by(|a, b| as_number(a).total_cmp(&as_number(b)));
    } else if items.iter().all(Dynamic::is_string) {
        items.sort_by_cached_key(ToString::to_string);
    } else {
        return Err("sorted: elements must all be numbers or all be strings".into());
    }
    Ok(items)
}

#[allow(clippy::cast_precision_loss)]
fn as_number(item: &Dynamic) -> f64 {
    item.as_float()
        .or_else(|_| item.as_int().map(|i| i as f64))
        .unwrap_or_default()
}

fn register_variables(engine: &mut Engine, env: &ScriptEnv) {
    let e = env.clone();
    engine.register_fn("get_var", move |name: ImmutableString| -> ScriptResult<Dynamic> {
        let value = e.with_state(|state| state.variables.get(name.as_str()).cloned());
        let value = value.ok_or_else(|| {
            raise(
                &SessionError::VariableNotFound {
                    name: name.to_string(),
                }
                .into(),
                &name,
            )
        })?;
        to_dynamic(&value)
    });

    let e = env.clone();
    engine.register_fn("set_var", move |name: ImmutableString, value: Dynamic| -> ScriptResult<()> {
        let value: Value = from_dynamic(&value)
            .map_err(|_| format!("set_var: unsupported value type {}", value.type_name()))?;
        e.with_state(|state| state.variables.insert(name.to_string(), value));
        Ok(())
    });

    let e = env.clone();
    engine.register_fn("has_var", move |name: ImmutableString| {
        e.with_state(|state| state.variables.contains_key(name.as_str()))
    });

    let e = env.clone();
    engine.register_fn("list_vars", move || -> Array {
        e.with_state(|state| strings(state.variables.keys().map(String::as_str)))
    });
}

fn register_answer(engine: &mut Engine, env: &ScriptEnv) {
    let e = env.clone();
    engine.register_fn("set_answer", move |content: Dynamic| {
        e.with_state(|state| state.answer.content = content.to_string());
    });

    let e = env.clone();
    engine.register_fn("set_answer", move |content: Dynamic, ready: bool| {
        e.with_state(|state| state.answer = Answer::new(content.to_string(), ready));
    });

    let e = env.clone();
    engine.register_fn("get_answer", move || -> Map {
        let answer = e.with_state(|state| state.answer.clone());
        let mut map = Map::new();
        map.insert("content".into(), Dynamic::from(answer.content));
        map.insert("ready".into(), Dynamic::from(answer.ready));
        map
    });
}
