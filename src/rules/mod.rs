//! Compilation and evaluation of metadata-declared rule expressions.
//!
//! A rule is a small boolean expression attached to a setting's metadata
//! (`fail-if`, `warn-if`, or a trigger value-match). It may reference
//! the setting it is attached to (`this`, `this(N)`), other settings by
//! id, `all(...)`/`any(...)` quantifiers over multi-valued settings, and
//! `len(...)` element counts.
//!
//! Compilation is staged so that no step can interfere with a later one:
//!
//! 1. `all`/`any` quantifiers expand to explicit conjunctions or
//!    disjunctions, one clause per element of the referenced value;
//! 2. `len(...)` expands to a literal element count;
//! 3. scientific-notation and quoted-string literals become placeholder
//!    variables (so id substitution cannot misread them);
//! 4. `this`, `this(N)` and remaining setting-id references become
//!    placeholders bound to looked-up, type-coerced values.
//!
//! The substituted text is then parsed and evaluated by the dedicated
//! expression engine in [`expr`]. A reference that cannot be resolved is
//! a distinct [`RuleFailure::Unresolvable`] condition that callers skip
//! rather than fail; anything else wrong with a rule surfaces as
//! [`RuleFailure::Malformed`] with diagnostic text.

pub mod expr;
pub mod value;

pub use value::Value;

use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::node::Node;
use crate::meta::{self, Metadata, SettingId, ids};

/// Why a rule did not produce a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleFailure {
    /// A referenced setting or element does not exist; the rule is
    /// skipped, not failed.
    Unresolvable,
    /// The rule text is broken; the diagnostic is embedded in a
    /// validation report rather than raised.
    Malformed(String),
}

/// Value lookup used during substitution.
///
/// The engine resolves ids against a configuration; syntax checking
/// resolves everything to dummies.
trait Lookup {
    fn value_of(&self, id: &str) -> Result<Value, RuleFailure>;
    fn elements_of(&self, id: &str) -> Result<Vec<String>, RuleFailure>;
    fn this_value(&self, element: Option<usize>)
    -> Result<Value, RuleFailure>;
}

/// Evaluation context: the configuration, its metadata, and the setting
/// the rule is attached to.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    config: &'a Node,
    meta: Metadata<'a>,
    this_id: &'a SettingId,
}

impl<'a> RuleContext<'a> {
    /// Create a context for evaluating rules attached to `this_id`.
    #[must_use]
    pub const fn new(
        config: &'a Node,
        meta: Metadata<'a>,
        this_id: &'a SettingId,
    ) -> Self {
        Self {
            config,
            meta,
            this_id,
        }
    }

    /// The raw text value of the calling setting, if present.
    #[must_use]
    pub fn this_raw(&self) -> Option<String> {
        self.raw_value(self.this_id)
    }

    /// Resolve a referenced id to its raw value.
    ///
    /// When the referenced section belongs to a duplicate family and
    /// carries no explicit index, the reference resolves to the sibling
    /// instance matching the calling setting's own index.
    fn raw_value(&self, id: &SettingId) -> Option<String> {
        let section = self.resolve_section(&id.section);
        let node = match &id.option {
            Some(option) => {
                let (opt_base, element) = split_element(option);
                let node = self.config.get(&[section.as_str(), opt_base])?;
                if let Some(element) = element {
                    let value = node.value()?;
                    let items = meta::split_value_list(value);
                    return items.get(element.checked_sub(1)?).cloned();
                }
                node
            }
            None => self.config.child(&section)?,
        };
        node.value().map(ToString::to_string)
    }

    fn resolve_section(&self, section: &str) -> String {
        if ids::duplicate_index(section).is_none()
            && self.meta.is_duplicate_section(section)
            && let Some(index) = self.this_id.duplicate_index()
        {
            return ids::with_index(section, index);
        }
        section.to_string()
    }
}

impl Lookup for RuleContext<'_> {
    fn value_of(&self, id: &str) -> Result<Value, RuleFailure> {
        let parsed = SettingId::parse(id);
        self.raw_value(&parsed)
            .map(|raw| Value::parse(&raw))
            .ok_or(RuleFailure::Unresolvable)
    }

    fn elements_of(&self, id: &str) -> Result<Vec<String>, RuleFailure> {
        let parsed = SettingId::parse(id);
        self.raw_value(&parsed)
            .map(|raw| meta::split_value_list(&raw))
            .ok_or(RuleFailure::Unresolvable)
    }

    fn this_value(
        &self,
        element: Option<usize>,
    ) -> Result<Value, RuleFailure> {
        let raw = self.this_raw().ok_or(RuleFailure::Unresolvable)?;
        match element {
            None => Ok(Value::parse(&raw)),
            Some(n) => {
                let items = meta::split_value_list(&raw);
                items
                    .get(n.checked_sub(1).ok_or(RuleFailure::Unresolvable)?)
                    .map(|item| Value::parse(item))
                    .ok_or(RuleFailure::Unresolvable)
            }
        }
    }
}

/// Split an option name into its base and a 1-based element reference.
fn split_element(option: &str) -> (&str, Option<usize>) {
    match ids::duplicate_index(option) {
        Some(n) => (ids::section_base(option), Some(n)),
        None => (option, None),
    }
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

const ID_FRAGMENT: &str =
    r"[\w\-.:/]+(?:\{[^}]*\})?(?:\(\d+\))?=[\w\-.]+(?:\(\d+\))?";

#[allow(clippy::expect_used)] // patterns are compile-time constants
fn quantifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"\b(?P<quant>all|any)\(\s*(?P<id>{ID_FRAGMENT}|this)\s*(?P<op>==|!=|<=|>=|<|>)\s*(?P<rhs>[^()]+?)\s*\)"
        ))
        .expect("quantifier pattern is valid")
    })
}

#[allow(clippy::expect_used)] // patterns are compile-time constants
fn len_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"\blen\(\s*(?P<id>{ID_FRAGMENT}|this)\s*\)"))
            .expect("len pattern is valid")
    })
}

#[allow(clippy::expect_used)] // patterns are compile-time constants
fn sci_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b\d+(?:\.\d+)?[eE][+-]?\d+\b")
            .expect("scientific literal pattern is valid")
    })
}

#[allow(clippy::expect_used)] // patterns are compile-time constants
fn string_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""[^"]*"|'[^']*'"#)
            .expect("string literal pattern is valid")
    })
}

#[allow(clippy::expect_used)] // patterns are compile-time constants
fn this_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bthis\b(?:\((?P<el>\d+)\))?")
            .expect("this pattern is valid")
    })
}

#[allow(clippy::expect_used)] // patterns are compile-time constants
fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(ID_FRAGMENT).expect("id pattern is valid")
    })
}

struct Substitution {
    text: String,
    bindings: HashMap<String, Value>,
    counter: usize,
}

impl Substitution {
    fn fresh(&mut self, value: Value) -> String {
        let name = format!("_v{}", self.counter);
        self.counter += 1;
        self.bindings.insert(name.clone(), value);
        name
    }
}

/// Run the staged substitution over a rule text.
fn substitute<L: Lookup>(
    rule: &str,
    lookup: &L,
) -> Result<Substitution, RuleFailure> {
    let mut sub = Substitution {
        text: rule.to_string(),
        bindings: HashMap::new(),
        counter: 0,
    };

    let elements_of = |id: &str| -> Result<Vec<String>, RuleFailure> {
        if id == "this" {
            let value = lookup.this_value(None)?;
            Ok(meta::split_value_list(&value.to_string()))
        } else {
            lookup.elements_of(id)
        }
    };

    // 1. Quantifiers.
    replace_pass(&mut sub, quantifier_re(), |caps, sub| {
        let quant = caps.name("quant").map_or("", |m| m.as_str());
        let id = caps.name("id").map_or("", |m| m.as_str());
        let op = caps.name("op").map_or("", |m| m.as_str());
        let rhs = caps.name("rhs").map_or("", |m| m.as_str());
        let elements = elements_of(id)?;
        if elements.is_empty() {
            return Ok(
                if quant == "all" { "true" } else { "false" }.to_string()
            );
        }
        let joiner = if quant == "all" { " and " } else { " or " };
        let clauses: Vec<String> = elements
            .iter()
            .map(|element| {
                let name = sub.fresh(Value::parse(element));
                format!("{name} {op} {rhs}")
            })
            .collect();
        Ok(format!("({})", clauses.join(joiner)))
    })?;

    // 2. Element counts.
    replace_pass(&mut sub, len_re(), |caps, _sub| {
        let id = caps.name("id").map_or("", |m| m.as_str());
        Ok(elements_of(id)?.len().to_string())
    })?;

    // 3. Literals, so id substitution cannot misread them.
    replace_pass(&mut sub, string_literal_re(), |caps, sub| {
        let quoted = caps.get(0).map_or("", |m| m.as_str());
        let inner = value::unquote(quoted).unwrap_or(quoted);
        Ok(sub.fresh(Value::Str(inner.to_string())))
    })?;
    replace_pass(&mut sub, sci_literal_re(), |caps, sub| {
        let literal = caps.get(0).map_or("", |m| m.as_str());
        Ok(sub.fresh(Value::parse(literal)))
    })?;

    // 4. `this` references, then remaining bare ids.
    replace_pass(&mut sub, this_re(), |caps, sub| {
        let element = caps
            .name("el")
            .and_then(|m| m.as_str().parse::<usize>().ok());
        let value = lookup.this_value(element)?;
        Ok(sub.fresh(value))
    })?;
    replace_pass(&mut sub, id_re(), |caps, sub| {
        let id = caps.get(0).map_or("", |m| m.as_str());
        let value = lookup.value_of(id)?;
        Ok(sub.fresh(value))
    })?;

    Ok(sub)
}

/// One substitution pass: replace every match of `re` in the working
/// text via a fallible callback with access to the binding state.
fn replace_pass<F>(
    sub: &mut Substitution,
    re: &Regex,
    mut replacer: F,
) -> Result<(), RuleFailure>
where
    F: FnMut(
        &regex::Captures<'_>,
        &mut Substitution,
    ) -> Result<String, RuleFailure>,
{
    let text = std::mem::take(&mut sub.text);
    let mut out = String::new();
    let mut last = 0;
    for caps in re.captures_iter(&text) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(text.get(last..m.start()).unwrap_or_default());
        out.push_str(&replacer(&caps, sub)?);
        last = m.end();
    }
    out.push_str(text.get(last..).unwrap_or_default());
    sub.text = out;
    Ok(())
}

// ---------------------------------------------------------------------------
// Evaluation with a bounded result cache
// ---------------------------------------------------------------------------

/// Rule evaluator with a per-instance result cache.
///
/// The cache is keyed by (rule text, calling value) and bounded; once
/// full, entries are evicted first-in-first-out in insertion order. The
/// cache — like the evaluator — is scoped to one engine run and
/// discarded afterwards.
#[derive(Debug)]
pub struct RuleEvaluator {
    cache: HashMap<(String, String), bool>,
    insertion_order: VecDeque<(String, String)>,
    capacity: usize,
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEvaluator {
    /// Default bound on the result cache.
    pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

    /// Create an evaluator with the default cache bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CACHE_CAPACITY)
    }

    /// Create an evaluator with an explicit cache bound.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: HashMap::new(),
            insertion_order: VecDeque::new(),
            capacity,
        }
    }

    /// Evaluate `rule` in `ctx`, reporting whether it holds.
    ///
    /// # Errors
    ///
    /// [`RuleFailure::Unresolvable`] when a referenced setting or
    /// element does not exist (callers skip the rule);
    /// [`RuleFailure::Malformed`] with a diagnostic for anything else.
    pub fn evaluate(
        &mut self,
        rule: &str,
        ctx: &RuleContext<'_>,
    ) -> Result<bool, RuleFailure> {
        let key = (
            rule.to_string(),
            ctx.this_raw().unwrap_or_default(),
        );
        if let Some(hit) = self.cache.get(&key) {
            return Ok(*hit);
        }

        let result = evaluate_uncached(rule, ctx)?;

        if self.capacity > 0 {
            if self.cache.len() >= self.capacity
                && let Some(oldest) = self.insertion_order.pop_front()
            {
                self.cache.remove(&oldest);
            }
            self.insertion_order.push_back(key.clone());
            self.cache.insert(key, result);
        }
        Ok(result)
    }

    /// Number of cached results (for diagnostics).
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn evaluate_uncached(
    rule: &str,
    ctx: &RuleContext<'_>,
) -> Result<bool, RuleFailure> {
    let sub = substitute(rule, ctx)?;
    let tokens = expr::tokenize(&sub.text)
        .map_err(RuleFailure::Malformed)?;
    let parsed = expr::parse(&tokens).map_err(RuleFailure::Malformed)?;
    let value =
        expr::eval(&parsed, &sub.bindings).map_err(RuleFailure::Malformed)?;
    Ok(value.is_truthy())
}

/// Structural syntax check used by trigger validation: every reference
/// resolves to a dummy value, then the expression must parse.
///
/// # Errors
///
/// Returns the compiler diagnostic for an expression that cannot parse.
pub fn check_syntax(rule: &str) -> Result<(), String> {
    struct DummyLookup;
    impl Lookup for DummyLookup {
        fn value_of(&self, _id: &str) -> Result<Value, RuleFailure> {
            Ok(Value::Int(0))
        }
        fn elements_of(
            &self,
            _id: &str,
        ) -> Result<Vec<String>, RuleFailure> {
            Ok(vec!["0".to_string()])
        }
        fn this_value(
            &self,
            _element: Option<usize>,
        ) -> Result<Value, RuleFailure> {
            Ok(Value::Int(0))
        }
    }

    let sub = substitute(rule, &DummyLookup).map_err(|e| match e {
        RuleFailure::Malformed(detail) => detail,
        RuleFailure::Unresolvable => "unresolvable reference".to_string(),
    })?;
    let tokens = expr::tokenize(&sub.text)?;
    expr::parse(&tokens).map(|_| ())
}

/// Whether a trigger allowed-value looks like a rule expression rather
/// than a plain constant.
#[must_use]
#[allow(clippy::expect_used)] // pattern is a compile-time constant
pub fn is_rule(text: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"==|!=|<=|>=|<|>|\bthis\b|\b(?:and|or|not)\b|\b(?:all|any|len)\(")
            .expect("rule detection pattern is valid")
    });
    re.is_match(text)
}
