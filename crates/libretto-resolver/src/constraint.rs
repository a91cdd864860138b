//! Version constraint parsing and matching.
//!
//! A constraint string is parsed into a [`ConstraintNode`] tree of single
//! comparisons joined by conjunctions (comma or space) and disjunctions
//! (`|` or `||`, binding looser than AND). Shorthand forms are expanded on
//! parse:
//!
//! | Input        | Expands to                          |
//! |--------------|-------------------------------------|
//! | `^1.2.3`     | `>=1.2.3.0-dev <2.0.0.0-dev`        |
//! | `^0.3`       | `>=0.3.0.0-dev <0.4.0.0-dev`        |
//! | `~1.2`       | `>=1.2.0.0-dev <2.0.0.0-dev`        |
//! | `1.2.*`      | `>=1.2.0.0-dev <1.3.0.0-dev`        |
//! | `1.0 - 2.0`  | `>=1.0.0.0-dev <2.1.0.0-dev`        |
//! | `1.2.3`      | `==1.2.3.0`                         |
//! | `dev-main`   | `==dev-main`                        |
//!
//! The tree is kept in disjunctive normal form, and its `Display` output is
//! that normalized form, which parses back to an equivalent constraint.

use crate::version::{ComposerVersion, Modifier, VersionParseError};
use libretto_core::Stability;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use version_ranges::Ranges;

const VERSION_PATTERN: &str = r"v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?(?:[._-]?(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*))?([.-]?dev)?(?:\+[^\s]+)?";

static OR_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\|?\s*").expect("valid regex"));

static INLINE_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^,\s]+) +as +[^,\s]+$").expect("valid regex"));

static STABILITY_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([^,\s]*?)@(stable|rc|beta|alpha|dev)$").expect("valid regex")
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(dev-[^,\s@]+?|[^,\s@]+?\.x-dev)#.+$").expect("valid regex")
});

static MATCH_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(v)?[x*](\.[x*])*$").expect("valid regex"));

static TILDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^~{VERSION_PATTERN}$")).expect("valid regex"));

static CARET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^\^{VERSION_PATTERN}$")).expect("valid regex"));

static WILDCARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.[x*])+$").expect("valid regex")
});

static HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+) +- +(\S+)$").expect("valid regex"));

static BARE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)^{VERSION_PATTERN}$")).expect("valid regex"));

static COMPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(<>|!=|>=?|<=?|==?)?\s*(.*)$").expect("valid regex"));

static ENDS_WITH_MODIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-(?:[._-]?(?:stable|beta|b|rc|alpha|a|patch|pl|p)(?:[.-]?\d+)*)?(?:[.-]?dev)?$")
        .expect("valid regex")
});

const BARE_OPERATORS: [&str; 10] = ["<", "<=", ">", ">=", "=", "==", "!=", "<>", "^", "~"];

/// Comparison operator of a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Operator {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "=" | "==" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }

    /// Operator as written in normalized constraints.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

/// A constraint tree in disjunctive normal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstraintNode {
    /// Matches every version, branches included.
    Any,
    /// A single comparison against a normalized version.
    Single {
        /// Comparison operator.
        op: Operator,
        /// Version compared against.
        version: ComposerVersion,
    },
    /// Conjunction of single constraints.
    And(Vec<ConstraintNode>),
    /// Disjunction of conjunctions.
    Or(Vec<ConstraintNode>),
}

impl ConstraintNode {
    /// A single comparison.
    #[must_use]
    pub const fn single(op: Operator, version: ComposerVersion) -> Self {
        Self::Single { op, version }
    }

    /// Conjunction, flattened and distributed over any nested disjunction.
    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Self::Any => {}
                Self::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        if let Some(pos) = flat.iter().position(|c| matches!(c, Self::Or(_)))
            && let Self::Or(alternatives) = flat.remove(pos)
        {
            let branches = alternatives
                .into_iter()
                .map(|alt| {
                    let mut conj = flat.clone();
                    conj.push(alt);
                    Self::and(conj)
                })
                .collect();
            return Self::or(branches);
        }

        match flat.len() {
            0 => Self::Any,
            1 => flat.pop().unwrap_or(Self::Any),
            _ => Self::And(flat),
        }
    }

    /// Disjunction, flattened; absorbs into `Any` if any branch is `Any`.
    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Self::Any => return Self::Any,
                Self::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::Any,
            1 => flat.pop().unwrap_or(Self::Any),
            _ => Self::Or(flat),
        }
    }

    /// Check whether a version satisfies this constraint.
    #[must_use]
    pub fn matches(&self, candidate: &ComposerVersion) -> bool {
        match self {
            Self::Any => true,
            Self::Single { op, version } => single_matches(*op, version, candidate),
            Self::And(children) => children.iter().all(|c| c.matches(candidate)),
            Self::Or(children) => children.iter().any(|c| c.matches(candidate)),
        }
    }

    fn for_each_single(&self, f: &mut impl FnMut(Operator, &ComposerVersion)) {
        match self {
            Self::Any => {}
            Self::Single { op, version } => f(*op, version),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.for_each_single(f);
                }
            }
        }
    }

    fn intervals(&self) -> Intervals {
        match self {
            Self::Any => Intervals::any(),
            Self::Single { op, version } => Intervals::single(*op, version),
            Self::And(children) => children
                .iter()
                .fold(Intervals::any(), |acc, c| acc.intersection(&c.intervals())),
            Self::Or(children) => children
                .iter()
                .fold(Intervals::none(), |acc, c| acc.union(&c.intervals())),
        }
    }
}

/// Range operators never match branches; `==`/`!=` compare branch names.
fn single_matches(op: Operator, bound: &ComposerVersion, candidate: &ComposerVersion) -> bool {
    if bound.is_branch() || candidate.is_branch() {
        return match op {
            Operator::Eq => bound == candidate,
            Operator::Ne => bound != candidate,
            _ => false,
        };
    }
    op.holds(candidate.cmp(bound))
}

impl fmt::Display for ConstraintNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Single { op, version } => {
                write!(f, "{}{version}", op.as_str())?;
                // keep `>=` and `<` from picking up an implicit -dev on reparse
                if matches!(op, Operator::Ge | Operator::Lt)
                    && version.modifier() == Some(Modifier::Release)
                    && !version.has_dev_suffix()
                {
                    f.write_str("-stable")?;
                }
                Ok(())
            }
            Self::And(children) => write_joined(f, children, " "),
            Self::Or(children) => write_joined(f, children, " || "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, nodes: &[ConstraintNode], sep: &str) -> fmt::Result {
    for (idx, node) in nodes.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{node}")?;
    }
    Ok(())
}

/// A parsed Composer version constraint.
///
/// Keeps the authored text for display in manifests and messages; equality
/// compares the normalized tree.
#[derive(Clone)]
pub struct ComposerConstraint {
    node: ConstraintNode,
    pretty: Arc<str>,
}

impl ComposerConstraint {
    /// Create a constraint matching any version.
    #[must_use]
    pub fn any() -> Self {
        Self {
            node: ConstraintNode::Any,
            pretty: Arc::from("*"),
        }
    }

    /// Create an exact version constraint.
    #[must_use]
    pub fn exact(version: &ComposerVersion) -> Self {
        Self {
            pretty: Arc::from(version.pretty()),
            node: ConstraintNode::single(Operator::Eq, version.clone()),
        }
    }

    /// Wrap an already-built tree; the pretty text is the normalized form.
    #[must_use]
    pub fn from_node(node: ConstraintNode) -> Self {
        Self {
            pretty: Arc::from(node.to_string()),
            node,
        }
    }

    /// Parse a Composer constraint string.
    ///
    /// # Examples
    ///
    /// ```
    /// use libretto_resolver::{ComposerConstraint, ComposerVersion};
    ///
    /// let c = ComposerConstraint::parse("^1.0 || ^2.0").unwrap();
    /// assert!(c.matches(&ComposerVersion::parse("1.5.0").unwrap()));
    /// assert!(!c.matches(&ComposerVersion::parse("3.0.0").unwrap()));
    /// assert!(ComposerConstraint::parse(">=").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, ConstraintParseError> {
        let pretty = input.trim();
        if pretty.is_empty() {
            return Err(ConstraintParseError::Empty);
        }

        let mut groups = Vec::new();
        for or_part in OR_SPLIT.split(pretty) {
            if or_part.is_empty() {
                return Err(ConstraintParseError::dangling(pretty, "||"));
            }
            let mut singles = Vec::new();
            for and_part in split_and(or_part).map_err(|op| ConstraintParseError::dangling(pretty, op))? {
                singles.push(parse_single(&and_part, pretty)?);
            }
            groups.push(ConstraintNode::and(singles));
        }

        Ok(Self {
            node: ConstraintNode::or(groups),
            pretty: Arc::from(pretty),
        })
    }

    /// The constraint as originally written.
    #[must_use]
    #[inline]
    pub fn pretty(&self) -> &str {
        &self.pretty
    }

    /// The normalized tree.
    #[must_use]
    #[inline]
    pub const fn node(&self) -> &ConstraintNode {
        &self.node
    }

    /// Whether this constraint accepts everything.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.node == ConstraintNode::Any
    }

    /// Check if a version matches this constraint.
    #[must_use]
    #[inline]
    pub fn matches(&self, version: &ComposerVersion) -> bool {
        self.node.matches(version)
    }

    /// Set of versions this constraint accepts.
    #[must_use]
    pub fn intervals(&self) -> Intervals {
        self.node.intervals()
    }

    /// Whether some version satisfies both constraints.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.intervals().intersection(&other.intervals()).is_empty()
    }

    /// Whether every version accepted here is also accepted by `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        let mine = self.intervals();
        mine.intersection(&other.intervals()) == mine
    }

    /// Whether both constraints accept exactly the same versions.
    #[must_use]
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.intervals() == other.intervals()
    }

    /// Highest `<`/`<=` bound anywhere in the constraint.
    #[must_use]
    pub fn upper_bound(&self) -> Option<ComposerVersion> {
        let mut highest: Option<ComposerVersion> = None;
        self.node.for_each_single(&mut |op, version| {
            if matches!(op, Operator::Lt | Operator::Le)
                && !version.is_branch()
                && highest.as_ref().is_none_or(|h| version > h)
            {
                highest = Some(version.clone());
            }
        });
        highest
    }

    /// Lift the highest upper bound so that anything at or above it matches too.
    ///
    /// `^7.4` becomes `>=7.4.0.0-dev <8.0.0.0-dev || >=8.0.0.0-dev`.
    #[must_use]
    pub fn without_upper_bound(&self) -> Self {
        let Some(bound) = self.upper_bound() else {
            return self.clone();
        };
        Self {
            node: ConstraintNode::or(vec![
                self.node.clone(),
                ConstraintNode::single(Operator::Ge, bound),
            ]),
            pretty: self.pretty.clone(),
        }
    }
}

/// Split one OR group into its AND parts.
///
/// Operators separated from their operand (`>= 1.0`), hyphen ranges and
/// inline aliases are kept together. Returns the offending operator when one
/// has nothing to apply to.
fn split_and(input: &str) -> Result<Vec<String>, &str> {
    let mut parts: Vec<String> = Vec::new();
    for piece in input.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(",");
        }
        let piece_start = parts.len();
        let tokens: Vec<&str> = piece.split_whitespace().collect();
        let mut idx = 0;
        while idx < tokens.len() {
            let token = tokens[idx];
            if BARE_OPERATORS.contains(&token) {
                match tokens.get(idx + 1) {
                    Some(next) if !is_joiner(next) && !BARE_OPERATORS.contains(next) => {
                        parts.push(format!("{token}{next}"));
                        idx += 2;
                    }
                    _ => return Err(token),
                }
            } else if is_joiner(token) {
                let next = tokens.get(idx + 1).ok_or(token)?;
                if parts.len() <= piece_start {
                    return Err(token);
                }
                let prev = parts.pop().ok_or(token)?;
                parts.push(format!("{prev} {token} {next}"));
                idx += 2;
            } else {
                parts.push(token.to_string());
                idx += 1;
            }
        }
    }
    Ok(parts)
}

fn is_joiner(token: &str) -> bool {
    token == "-" || token == "as"
}

/// Every OR/AND part of a constraint string, without parsing them.
///
/// Unbalanced input falls back to whitespace splitting.
#[must_use]
pub fn constraint_parts(input: &str) -> Vec<String> {
    OR_SPLIT
        .split(input.trim())
        .filter(|part| !part.is_empty())
        .flat_map(|part| {
            split_and(part).unwrap_or_else(|_| part.split_whitespace().map(String::from).collect())
        })
        .collect()
}

fn version(raw: &str, constraint: &str) -> Result<ComposerVersion, ConstraintParseError> {
    ComposerVersion::parse(raw).map_err(|source| ConstraintParseError::InvalidVersion {
        constraint: constraint.to_string(),
        source,
    })
}

/// Four segments from regex groups 1..=4, plus how many were present.
fn captured_segments(caps: &regex::Captures<'_>) -> ([u64; 4], usize) {
    let mut segments = [0u64; 4];
    let mut present = 0;
    for (idx, segment) in segments.iter_mut().enumerate() {
        if let Some(m) = caps.get(idx + 1) {
            *segment = m.as_str().parse().unwrap_or(u64::MAX);
            present = idx + 1;
        }
    }
    (segments, present)
}

/// Increment the segment at `position` (1-based) and zero everything after it.
fn bump(mut segments: [u64; 4], position: usize) -> [u64; 4] {
    let idx = position.clamp(1, 4) - 1;
    segments[idx] = segments[idx].saturating_add(1);
    for seg in segments.iter_mut().skip(idx + 1) {
        *seg = 0;
    }
    segments
}

fn has_stability_part(caps: &regex::Captures<'_>) -> bool {
    caps.get(5).is_some() || caps.get(7).is_some()
}

fn range(lower: ComposerVersion, upper: ComposerVersion) -> ConstraintNode {
    ConstraintNode::and(vec![
        ConstraintNode::single(Operator::Ge, lower),
        ConstraintNode::single(Operator::Lt, upper),
    ])
}

fn parse_single(part: &str, constraint: &str) -> Result<ConstraintNode, ConstraintParseError> {
    let mut part = part;
    if let Some(caps) = INLINE_ALIAS.captures(part)
        && let Some(m) = caps.get(1)
    {
        part = m.as_str();
    }

    let mut stability_modifier = None;
    if let Some(caps) = STABILITY_FLAG.captures(part) {
        let head = caps.get(1).map_or("", |m| m.as_str());
        part = if head.is_empty() { "*" } else { head };
        stability_modifier = caps
            .get(2)
            .and_then(|m| Stability::parse(m.as_str()))
            .filter(|s| *s != Stability::Stable);
    }

    if let Some(caps) = REFERENCE.captures(part)
        && let Some(m) = caps.get(1)
    {
        part = m.as_str();
    }

    if let Some(caps) = MATCH_ALL.captures(part) {
        if caps.get(1).is_some() || caps.get(2).is_some() {
            return Ok(ConstraintNode::single(
                Operator::Ge,
                ComposerVersion::dev_floor([0; 4]),
            ));
        }
        return Ok(ConstraintNode::Any);
    }

    if part.starts_with("~>") {
        return Err(ConstraintParseError::InvalidOperator {
            constraint: constraint.to_string(),
            operator: "~>".to_string(),
        });
    }

    if let Some(caps) = TILDE.captures(part) {
        let (segments, position) = captured_segments(&caps);
        let mut lower = version(&part[1..], constraint)?;
        if !has_stability_part(&caps) {
            lower = lower.to_dev();
        }
        let upper = ComposerVersion::dev_floor(bump(segments, position.saturating_sub(1).max(1)));
        return Ok(range(lower, upper));
    }

    if let Some(caps) = CARET.captures(part) {
        let (segments, _) = captured_segments(&caps);
        let position = if segments[0] != 0 || caps.get(2).is_none() {
            1
        } else if segments[1] != 0 || caps.get(3).is_none() {
            2
        } else {
            3
        };
        let mut lower = version(&part[1..], constraint)?;
        if !has_stability_part(&caps) {
            lower = lower.to_dev();
        }
        let upper = ComposerVersion::dev_floor(bump(segments, position));
        return Ok(range(lower, upper));
    }

    if let Some(caps) = WILDCARD.captures(part) {
        let (mut segments, position) = captured_segments(&caps);
        for seg in segments.iter_mut().skip(position) {
            *seg = 0;
        }
        let lower = ComposerVersion::dev_floor(segments);
        let upper = ComposerVersion::dev_floor(bump(segments, position));
        if segments == [0; 4] {
            return Ok(ConstraintNode::single(Operator::Lt, upper));
        }
        return Ok(range(lower, upper));
    }

    if let Some(caps) = HYPHEN.captures(part) {
        let (from, to) = (caps.get(1).map_or("", |m| m.as_str()), caps.get(2).map_or("", |m| m.as_str()));
        let from_caps = BARE_VERSION.captures(from);
        let to_caps = BARE_VERSION.captures(to);
        if let (Some(from_caps), Some(to_caps)) = (from_caps, to_caps) {
            let mut lower = version(from, constraint)?;
            if !has_stability_part(&from_caps) {
                lower = lower.to_dev();
            }
            let upper_version = version(to, constraint)?;
            let complete = to_caps.get(2).is_some() && to_caps.get(3).is_some();
            let upper = if complete || has_stability_part(&to_caps) {
                ConstraintNode::single(Operator::Le, upper_version)
            } else {
                let (segments, _) = captured_segments(&to_caps);
                let position = if to_caps.get(2).is_none() { 1 } else { 2 };
                ConstraintNode::single(
                    Operator::Lt,
                    ComposerVersion::dev_floor(bump(segments, position)),
                )
            };
            return Ok(ConstraintNode::and(vec![
                ConstraintNode::single(Operator::Ge, lower),
                upper,
            ]));
        }
    }

    let caps = COMPARATOR
        .captures(part)
        .ok_or_else(|| ConstraintParseError::dangling(constraint, part))?;
    let op_str = caps.get(1).map_or("", |m| m.as_str());
    let raw = caps.get(2).map_or("", |m| m.as_str()).trim();
    if raw.is_empty() {
        return Err(ConstraintParseError::dangling(constraint, op_str));
    }
    let op = Operator::parse(op_str).ok_or_else(|| ConstraintParseError::InvalidOperator {
        constraint: constraint.to_string(),
        operator: op_str.to_string(),
    })?;

    let mut bound = version(raw, constraint)?;
    match stability_modifier {
        Some(stability)
            if op != Operator::Eq && bound.stability() == Stability::Stable && !bound.is_branch() =>
        {
            bound = bound.with_stability(stability);
        }
        _ if matches!(op, Operator::Lt | Operator::Ge)
            && !ENDS_WITH_MODIFIER.is_match(raw)
            && !raw.starts_with("dev-") =>
        {
            bound = bound.to_dev();
        }
        _ => {}
    }
    Ok(ConstraintNode::single(op, bound))
}

impl PartialEq for ComposerConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for ComposerConstraint {}

impl std::hash::Hash for ComposerConstraint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

impl fmt::Debug for ComposerConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposerConstraint")
            .field("pretty", &self.pretty)
            .field("normalized", &self.node.to_string())
            .finish()
    }
}

impl fmt::Display for ComposerConstraint {
    /// Writes the normalized form, e.g. `>=1.2.0.0-dev <2.0.0.0-dev`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

impl FromStr for ComposerConstraint {
    type Err = ConstraintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ComposerConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pretty)
    }
}

impl<'de> Deserialize<'de> for ComposerConstraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Set of branch names a constraint admits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchSet {
    /// Exactly these branches.
    Only(BTreeSet<String>),
    /// Every branch except these.
    AllExcept(BTreeSet<String>),
}

impl BranchSet {
    fn none() -> Self {
        Self::Only(BTreeSet::new())
    }

    fn all() -> Self {
        Self::AllExcept(BTreeSet::new())
    }

    fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Only(a), Self::Only(b)) => Self::Only(a.union(b).cloned().collect()),
            (Self::Only(a), Self::AllExcept(b)) | (Self::AllExcept(b), Self::Only(a)) => {
                Self::AllExcept(b.difference(a).cloned().collect())
            }
            (Self::AllExcept(a), Self::AllExcept(b)) => {
                Self::AllExcept(a.intersection(b).cloned().collect())
            }
        }
    }

    fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Only(a), Self::Only(b)) => Self::Only(a.intersection(b).cloned().collect()),
            (Self::Only(a), Self::AllExcept(b)) | (Self::AllExcept(b), Self::Only(a)) => {
                Self::Only(a.difference(b).cloned().collect())
            }
            (Self::AllExcept(a), Self::AllExcept(b)) => {
                Self::AllExcept(a.union(b).cloned().collect())
            }
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Only(names) if names.is_empty())
    }

    /// Whether specific branch names are listed, either admitted or excluded.
    #[must_use]
    pub fn has_names(&self) -> bool {
        match self {
            Self::Only(names) | Self::AllExcept(names) => !names.is_empty(),
        }
    }
}

/// The versions a constraint accepts, as numeric ranges plus branch names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intervals {
    /// Accepted numeric versions.
    pub numeric: Ranges<ComposerVersion>,
    /// Accepted branches.
    pub branches: BranchSet,
}

impl Intervals {
    /// Numeric versions only; branches sort above every numeric version.
    fn numeric_universe() -> Ranges<ComposerVersion> {
        Ranges::strictly_lower_than(ComposerVersion::branch(""))
    }

    fn any() -> Self {
        Self {
            numeric: Self::numeric_universe(),
            branches: BranchSet::all(),
        }
    }

    fn none() -> Self {
        Self {
            numeric: Ranges::empty(),
            branches: BranchSet::none(),
        }
    }

    fn single(op: Operator, version: &ComposerVersion) -> Self {
        if let Some(name) = version.branch_name() {
            let names = BTreeSet::from([name.to_string()]);
            return match op {
                Operator::Eq => Self {
                    numeric: Ranges::empty(),
                    branches: BranchSet::Only(names),
                },
                Operator::Ne => Self {
                    numeric: Self::numeric_universe(),
                    branches: BranchSet::AllExcept(names),
                },
                _ => Self::none(),
            };
        }

        let universe = Self::numeric_universe();
        let v = version.clone();
        let (numeric, branches) = match op {
            Operator::Eq => (Ranges::singleton(v), BranchSet::none()),
            Operator::Ne => (
                universe.intersection(&Ranges::singleton(v).complement()),
                BranchSet::all(),
            ),
            Operator::Lt => (Ranges::strictly_lower_than(v), BranchSet::none()),
            Operator::Le => (Ranges::lower_than(v), BranchSet::none()),
            Operator::Gt => (
                universe.intersection(&Ranges::strictly_higher_than(v)),
                BranchSet::none(),
            ),
            Operator::Ge => (
                universe.intersection(&Ranges::higher_than(v)),
                BranchSet::none(),
            ),
        };
        Self { numeric, branches }
    }

    /// Versions accepted by both.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            numeric: self.numeric.intersection(&other.numeric),
            branches: self.branches.intersection(&other.branches),
        }
    }

    /// Versions accepted by either.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            numeric: self.numeric.union(&other.numeric),
            branches: self.branches.union(&other.branches),
        }
    }

    /// Whether no version at all is accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.numeric == Ranges::empty() && self.branches.is_empty()
    }
}

/// Error when parsing a constraint string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintParseError {
    /// Nothing to parse.
    #[error("empty version constraint")]
    Empty,

    /// An operator with no operand (`>=`, `1.0 ||`, trailing comma).
    #[error("could not parse version constraint {constraint}: dangling operator \"{operator}\"")]
    DanglingOperator {
        /// Whole constraint.
        constraint: String,
        /// Operator left without an operand.
        operator: String,
    },

    /// An operator Composer does not support.
    #[error(
        "could not parse version constraint {constraint}: invalid operator \"{operator}\", you probably meant to use the \"~\" operator"
    )]
    InvalidOperator {
        /// Whole constraint.
        constraint: String,
        /// Offending operator.
        operator: String,
    },

    /// An operand that is not a version.
    #[error("could not parse version constraint {constraint}: {source}")]
    InvalidVersion {
        /// Whole constraint.
        constraint: String,
        /// Underlying version error.
        #[source]
        source: VersionParseError,
    },
}

impl ConstraintParseError {
    fn dangling(constraint: &str, operator: &str) -> Self {
        Self::DanglingOperator {
            constraint: constraint.to_string(),
            operator: operator.to_string(),
        }
    }
}
