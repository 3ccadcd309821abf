//! Declarative authorization table: `(role, resource, verb) -> allow | deny`.
//!
//! Rules are loaded once at startup and never change afterwards. A request is
//! permitted only when some rule allows it and no rule denies it.

use config::{Config, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_POLICY: &str = include_str!("../../config/policy.toml");

const KNOWN_VERBS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to load policy: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid policy rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    #[error("cannot evaluate request: {0}")]
    Evaluation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyRule {
    pub role: String,
    pub resource: String,
    pub verb: String,
    #[serde(default)]
    pub effect: Effect,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param,
    Rest,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    role: String,
    segments: Vec<Segment>,
    verb: String,
    effect: Effect,
}

impl CompiledRule {
    fn compile(index: usize, rule: PolicyRule) -> Result<Self, PolicyError> {
        let invalid = |reason: &str| PolicyError::InvalidRule {
            index,
            reason: reason.to_string(),
        };

        if rule.role.trim().is_empty() {
            return Err(invalid("role is empty"));
        }
        if !rule.resource.starts_with('/') {
            return Err(invalid("resource must start with '/'"));
        }

        let verb = rule.verb.trim().to_ascii_uppercase();
        if verb != "*" && !KNOWN_VERBS.contains(&verb.as_str()) {
            return Err(invalid("unknown verb"));
        }

        let parts: Vec<&str> = split_path(&rule.resource).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let segment = match *part {
                "*" if i + 1 == parts.len() => Segment::Rest,
                "*" => return Err(invalid("'*' is only allowed as the last segment")),
                p if p.starts_with(':') || (p.starts_with('{') && p.ends_with('}')) => {
                    Segment::Param
                }
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            role: rule.role.trim().to_string(),
            segments,
            verb,
            effect: rule.effect,
        })
    }

    fn matches(&self, role: &str, path: &[&str], verb: &str) -> bool {
        (self.role == "*" || self.role == role)
            && (self.verb == "*" || self.verb == verb)
            && path_matches(&self.segments, path)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn path_matches(pattern: &[Segment], path: &[&str]) -> bool {
    match (pattern.first(), path.first()) {
        (Some(Segment::Rest), _) => true,
        (None, None) => true,
        (Some(Segment::Param), Some(_)) => path_matches(&pattern[1..], &path[1..]),
        (Some(Segment::Literal(lit)), Some(seg)) if lit.as_str() == *seg => {
            path_matches(&pattern[1..], &path[1..])
        }
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct PolicyEngine {
    rules: Vec<CompiledRule>,
}

impl PolicyEngine {
    pub fn from_rules(rules: Vec<PolicyRule>) -> Result<Self, PolicyError> {
        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(i, rule)| CompiledRule::compile(i, rule))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn from_toml_str(source: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Self::from_rules(file.rules)
    }

    /// Load from `path`, or the embedded default table when `None`.
    pub fn load(path: Option<&str>) -> Result<Self, PolicyError> {
        let engine = match path {
            Some(path) => {
                let file: PolicyFile = Config::builder()
                    .add_source(File::new(path, FileFormat::Toml))
                    .build()?
                    .try_deserialize()?;
                Self::from_rules(file.rules)?
            }
            None => Self::from_toml_str(DEFAULT_POLICY)?,
        };

        tracing::info!(
            rules = engine.rules.len(),
            source = path.unwrap_or("embedded"),
            "Policy table loaded"
        );
        Ok(engine)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// `Ok(true)` only if some rule allows and none denies.
    pub fn enforce(&self, role: &str, resource: &str, verb: &str) -> Result<bool, PolicyError> {
        if !resource.starts_with('/') {
            return Err(PolicyError::Evaluation(format!(
                "resource is not an absolute path: {:?}",
                resource
            )));
        }
        let verb = verb.to_ascii_uppercase();
        if !KNOWN_VERBS.contains(&verb.as_str()) {
            return Err(PolicyError::Evaluation(format!("unsupported verb: {}", verb)));
        }

        let path: Vec<&str> = split_path(resource).collect();
        let mut allowed = false;
        for rule in self.rules.iter().filter(|r| r.matches(role, &path, &verb)) {
            match rule.effect {
                Effect::Deny => return Ok(false),
                Effect::Allow => allowed = true,
            }
        }
        Ok(allowed)
    }
}
