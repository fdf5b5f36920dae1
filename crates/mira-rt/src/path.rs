//! Chained member access: `pos.x`, `rows[1][2]`, `grid[0, 1].z`.
//!
//! A chain resolves strictly left to right. Each hop classifies the value
//! the previous hop produced and has its own cache slot; there is no fused
//! multi-hop entry.
//!
//! ## Path syntax
//!
//! ```text
//! path  := hop ( '.' name | index )*
//! hop   := name | index
//! index := '[' int ( ',' int )* ']'      -- one to three integers
//! ```

use std::fmt;
use std::str::FromStr;

use crate::builtins::MAX_INDICES;
use crate::cache::{FieldSite, IndexSite, StoreSite};
use crate::class::validate_member_name;
use crate::error::DispatchError;
use crate::registry::ClassRegistry;
use crate::value::Value;

/// One step of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hop {
    Field(String),
    Index(Vec<i64>),
}

/// A validated chain of hops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPath {
    hops: Vec<Hop>,
}

impl AccessPath {
    /// Build a path from hops, checking member names and index counts.
    pub fn new(hops: Vec<Hop>) -> Result<Self, DispatchError> {
        if hops.is_empty() {
            return Err(DispatchError::malformed("", "empty access path"));
        }
        for hop in &hops {
            match hop {
                Hop::Field(name) => validate_member_name(name)?,
                Hop::Index(indices) if indices.is_empty() || indices.len() > MAX_INDICES => {
                    return Err(DispatchError::IndexArity {
                        found: indices.len(),
                    })
                }
                Hop::Index(_) => {}
            }
        }
        Ok(AccessPath { hops })
    }

    pub fn parse(src: &str) -> Result<Self, DispatchError> {
        Parser { src, pos: 0 }.parse()
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }
}

impl FromStr for AccessPath {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccessPath::parse(s)
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hop) in self.hops.iter().enumerate() {
            match hop {
                Hop::Field(name) if i == 0 => write!(f, "{}", name)?,
                Hop::Field(name) => write!(f, ".{}", name)?,
                Hop::Index(indices) => {
                    let parts: Vec<String> = indices.iter().map(|n| n.to_string()).collect();
                    write!(f, "[{}]", parts.join(", "))?;
                }
            }
        }
        Ok(())
    }
}

// ── Parser ──────────────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<AccessPath, DispatchError> {
        let mut hops = Vec::new();
        match self.peek() {
            None => return Err(self.error("empty access path")),
            Some('[') => hops.push(self.index()?),
            Some(_) => hops.push(Hop::Field(self.name()?)),
        }
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.advance();
                    hops.push(Hop::Field(self.name()?));
                }
                '[' => hops.push(self.index()?),
                other => return Err(self.error(format!("unexpected {:?}", other))),
            }
        }
        AccessPath::new(hops).map_err(|err| match err {
            DispatchError::MalformedAccessExpression { reason, .. } => self.error(reason),
            other => other,
        })
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }

    fn name(&mut self) -> Result<String, DispatchError> {
        let start = self.pos;
        self.eat_while(|c| !c.is_whitespace() && !matches!(c, '.' | '[' | ']' | ','));
        let name = &self.src[start..self.pos];
        if name.is_empty() {
            return Err(self.error("expected a member name"));
        }
        validate_member_name(name)
            .map_err(|_| self.error(format!("invalid member name `{}`", name)))?;
        Ok(name.to_string())
    }

    fn index(&mut self) -> Result<Hop, DispatchError> {
        self.advance(); // '['
        let mut indices = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            self.eat_while(|c| c.is_ascii_digit() || c == '-');
            let literal = &self.src[start..self.pos];
            if literal.is_empty() {
                return Err(match self.peek() {
                    None => self.error("unclosed '['"),
                    Some(']') if indices.is_empty() => self.error("empty index list"),
                    Some(_) => self.error("index must be an integer literal"),
                });
            }
            let n = literal
                .parse::<i64>()
                .map_err(|_| self.error(format!("invalid index `{}`", literal)))?;
            indices.push(n);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.advance(),
                Some(']') => {
                    self.advance();
                    break;
                }
                None => return Err(self.error("unclosed '['")),
                Some(other) => return Err(self.error(format!("unexpected {:?} in index", other))),
            }
        }
        if indices.len() > MAX_INDICES {
            return Err(self.error(format!("at most {} indices per hop", MAX_INDICES)));
        }
        Ok(Hop::Index(indices))
    }

    fn error(&self, reason: impl Into<String>) -> DispatchError {
        DispatchError::malformed(self.src, reason)
    }
}

// ── Sites ───────────────────────────────────────────────────────────────

#[derive(Debug)]
enum ReadSite {
    Field(FieldSite),
    Index(IndexSite),
}

#[derive(Debug)]
enum WriteSite {
    Field(StoreSite),
    Index(IndexSite),
}

/// Cache slots for one chained access site: one per hop, plus one for the
/// final write.
#[derive(Debug)]
pub struct PathSite {
    reads: Vec<ReadSite>,
    write: WriteSite,
}

impl PathSite {
    pub fn for_path(path: &AccessPath) -> Self {
        let reads = path
            .hops
            .iter()
            .map(|hop| match hop {
                Hop::Field(_) => ReadSite::Field(FieldSite::new()),
                Hop::Index(_) => ReadSite::Index(IndexSite::new()),
            })
            .collect();
        let write = match path.hops.last() {
            Some(Hop::Index(_)) => WriteSite::Index(IndexSite::new()),
            _ => WriteSite::Field(StoreSite::new()),
        };
        PathSite { reads, write }
    }

    /// Hit/miss counters per hop, in order.
    pub fn hop_stats(&self) -> Vec<crate::cache::CacheStats> {
        self.reads
            .iter()
            .map(|site| match site {
                ReadSite::Field(s) => s.stats(),
                ReadSite::Index(s) => s.stats(),
            })
            .collect()
    }
}

fn index_values(indices: &[i64]) -> Vec<Value> {
    indices.iter().map(|n| Value::Int(*n)).collect()
}

fn site_mismatch(path: &AccessPath) -> DispatchError {
    DispatchError::malformed(&path.to_string(), "cache site was built for a different path")
}

impl ClassRegistry {
    fn read_hop(
        &self,
        site: &mut ReadSite,
        current: &Value,
        hop: &Hop,
        path: &AccessPath,
    ) -> Result<Value, DispatchError> {
        match (site, hop) {
            (ReadSite::Field(slot), Hop::Field(name)) => self.get_field(slot, current, name),
            (ReadSite::Index(slot), Hop::Index(indices)) => {
                self.get_indexed(slot, current, &index_values(indices))
            }
            _ => Err(site_mismatch(path)),
        }
    }

    /// Read the value at the end of `path`, starting from `receiver`.
    pub fn get_path(
        &self,
        site: &mut PathSite,
        receiver: &Value,
        path: &AccessPath,
    ) -> Result<Value, DispatchError> {
        if site.reads.len() != path.hops.len() {
            return Err(site_mismatch(path));
        }
        let mut current = receiver.clone();
        for (slot, hop) in site.reads.iter_mut().zip(&path.hops) {
            current = self.read_hop(slot, &current, hop, path)?;
        }
        Ok(current)
    }

    /// Write `value` at the end of `path`. Every hop but the last is a read.
    pub fn set_path(
        &self,
        site: &mut PathSite,
        receiver: &Value,
        path: &AccessPath,
        value: Value,
    ) -> Result<(), DispatchError> {
        if site.reads.len() != path.hops.len() {
            return Err(site_mismatch(path));
        }
        let Some((last, init)) = path.hops.split_last() else {
            return Err(site_mismatch(path));
        };
        let mut current = receiver.clone();
        for (slot, hop) in site.reads.iter_mut().zip(init) {
            current = self.read_hop(slot, &current, hop, path)?;
        }
        match (&mut site.write, last) {
            (WriteSite::Field(slot), Hop::Field(name)) => {
                self.set_field(slot, &current, name, value)
            }
            (WriteSite::Index(slot), Hop::Index(indices)) => {
                self.set_indexed(slot, &current, &index_values(indices), value)
            }
            _ => Err(site_mismatch(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Hop {
        Hop::Field(name.to_string())
    }

    #[test]
    fn test_parse_mixed_chain() {
        let path = AccessPath::parse("grid[0, 1].z").unwrap();
        assert_eq!(path.hops(), &[field("grid"), Hop::Index(vec![0, 1]), field("z")]);
        assert_eq!(path.to_string(), "grid[0, 1].z");
    }

    #[test]
    fn test_parse_leading_index() {
        let path: AccessPath = "[2][0].fill!".parse().unwrap();
        assert_eq!(
            path.hops(),
            &[Hop::Index(vec![2]), Hop::Index(vec![0]), field("fill!")]
        );
    }

    #[test]
    fn test_parse_errors() {
        for (src, reason) in [
            ("", "empty access path"),
            ("a..b", "expected a member name"),
            ("a[", "unclosed '['"),
            ("a[]", "empty index list"),
            ("a[i]", "index must be an integer literal"),
            ("a[1,2,3,4]", "at most 3 indices per hop"),
            ("a.2b", "invalid member name `2b`"),
            ("a]", "unexpected ']'"),
        ] {
            let err = AccessPath::parse(src).unwrap_err();
            assert_eq!(
                err,
                DispatchError::MalformedAccessExpression {
                    expression: src.to_string(),
                    reason: reason.to_string(),
                },
                "source {:?}",
                src
            );
        }
    }

    #[test]
    fn test_new_rejects_oversized_index_hop() {
        let err = AccessPath::new(vec![Hop::Index(vec![0, 0, 0, 0])]).unwrap_err();
        assert_eq!(err, DispatchError::IndexArity { found: 4 });
    }

    #[test]
    fn test_each_hop_has_own_slot() {
        let reg = ClassRegistry::new();
        let path = AccessPath::parse("[0].y").unwrap();
        let mut site = PathSite::for_path(&path);
        let rows = Value::array(vec![Value::array(vec![Value::Int(1), Value::Int(2)])]);
        for _ in 0..3 {
            assert_eq!(reg.get_path(&mut site, &rows, &path).unwrap(), Value::Int(2));
        }
        let stats = site.hop_stats();
        assert_eq!(stats[0].misses, 1);
        assert_eq!(stats[1].misses, 1);
        assert_eq!(stats[1].hits, 2);
    }

    #[test]
    fn test_site_for_other_path_rejected() {
        let reg = ClassRegistry::new();
        let short = AccessPath::parse("x").unwrap();
        let long = AccessPath::parse("x.y").unwrap();
        let mut site = PathSite::for_path(&short);
        let err = reg.get_path(&mut site, &Value::Nil, &long).unwrap_err();
        assert!(matches!(err, DispatchError::MalformedAccessExpression { .. }));
    }
}
