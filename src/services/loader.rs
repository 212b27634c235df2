use crate::form::FieldOptions;
use crate::html::Options;
use crate::model::{validate_form_config, FormConfig};
use crate::reflect::Target;
use crate::services::registry::SchemaRegistry;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};
use tracing::debug;

pub const CONFIG_FILE: &str = "formgen.yaml";
pub const CONFIG_ENV: &str = "FORMGEN_CONFIG";

fn env_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap())
}

pub(crate) fn expand_with(s: &str, vars: &HashMap<String, String>) -> String {
    env_pattern()
        .replace_all(s, |caps: &regex::Captures| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .to_string()
}

fn expand_value(v: &mut JsonValue, vars: &HashMap<String, String>) {
    match v {
        JsonValue::String(s) => *s = expand_with(s, vars),
        JsonValue::Array(arr) => arr.iter_mut().for_each(|x| expand_value(x, vars)),
        JsonValue::Object(obj) => obj.values_mut().for_each(|x| expand_value(x, vars)),
        _ => {}
    }
}

fn expand_options(opts: &mut Options, vars: &HashMap<String, String>) {
    opts.values_mut().for_each(|v| expand_value(v, vars));
}

/// Explicit path, then `$FORMGEN_CONFIG`, then `formgen.yaml` in the current
/// directory or in a `.formgen/` directory of it or any ancestor.
pub fn resolve_config_path(explicit: Option<&str>) -> Result<PathBuf> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    discover_config(explicit, env::var(CONFIG_ENV).ok(), &cwd)
}

pub(crate) fn discover_config(
    explicit: Option<&str>,
    from_env: Option<String>,
    cwd: &Path,
) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(PathBuf::from(p));
    }
    if let Some(p) = from_env {
        return Ok(PathBuf::from(p));
    }
    let direct = cwd.join(CONFIG_FILE);
    if direct.exists() {
        return Ok(direct);
    }
    let mut cur = Some(cwd);
    while let Some(dir) = cur {
        let p = dir.join(".formgen").join(CONFIG_FILE);
        if p.exists() {
            return Ok(p);
        }
        cur = dir.parent();
    }
    Err(anyhow!(
        "No config found. Pass a path, set {CONFIG_ENV}=<file> or place {CONFIG_FILE} in CWD"
    ))
}

pub fn parse_config(s: &str, vars: &HashMap<String, String>) -> Result<FormConfig> {
    let mut cfg: FormConfig = serde_yaml::from_str(s).with_context(|| "parsing form config")?;
    cfg.action = expand_with(&cfg.action, vars);
    for opts in cfg.fields.values_mut() {
        expand_options(opts, vars);
    }
    expand_options(&mut cfg.form, vars);
    validate_form_config(&cfg).map_err(|e| anyhow!(e))?;
    Ok(cfg)
}

pub fn load_config(path: &Path) -> Result<FormConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let env_map: HashMap<String, String> = env::vars().collect();
    let cfg = parse_config(&s, &env_map).with_context(|| format!("loading {path:?}"))?;
    debug!(path = %path.display(), types = cfg.types.len(), "loaded form config");
    Ok(cfg)
}

pub fn build_registry(cfg: &FormConfig) -> SchemaRegistry {
    SchemaRegistry::new(cfg.types.clone())
}

pub fn build_target(cfg: &FormConfig, registry: &SchemaRegistry) -> Result<Target> {
    let name = &cfg.target.r#type;
    match &cfg.target.values {
        None => Ok(Target::Type(name.clone())),
        Some(values) => {
            let rec = registry
                .record(name, values.clone())
                .ok_or_else(|| anyhow!("unknown target type '{name}'"))?;
            Ok(Target::Instance(Box::new(rec)))
        }
    }
}

pub fn field_options(cfg: &FormConfig) -> FieldOptions {
    cfg.fields.clone()
}
