use regex::Regex;
use serde_json::{Map, Value};
use tlm_types::event::field;

use crate::config::FilterConfig;
use crate::error::ConfigError;

/// One level of a filter pattern, compiled as `^atom$`.
#[derive(Clone, Debug)]
pub struct FilterAtom {
    source: String,
    regex: Regex,
}

impl FilterAtom {
    fn compile(name: &str, source: &str) -> Result<Self, ConfigError> {
        let regex =
            Regex::new(&format!("^{source}$")).map_err(|e| ConfigError::InvalidPattern {
                name: name.to_string(),
                segment: source.to_string(),
                source: e,
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Atoms whose source contains `.*` or the letter `d` stand for "any
    /// key at this level" when a leaf is matched back against its dotted
    /// schema path. The letter test also covers `\d` classes, and it
    /// catches plain names such as `Node` as well.
    pub fn is_wildcard(&self) -> bool {
        self.source.contains(".*") || self.source.contains('d')
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// A compiled filter: optional name plus one atom per depth.
#[derive(Clone, Debug)]
pub struct FilterEntry {
    name: Option<String>,
    atoms: Vec<FilterAtom>,
}

impl FilterEntry {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn atoms(&self) -> &[FilterAtom] {
        &self.atoms
    }

    /// Positional match of the document's dotted `Path` against the atoms.
    ///
    /// Segment and atom counts must agree. Wildcard atoms match without
    /// being evaluated.
    fn matches_schema_path(&self, raw_path: &str) -> bool {
        if raw_path.is_empty() {
            return false;
        }
        let segments: Vec<&str> = raw_path.split('.').collect();
        segments.len() == self.atoms.len()
            && segments
                .iter()
                .zip(&self.atoms)
                .all(|(segment, atom)| atom.is_wildcard() || atom.regex.is_match(segment))
    }
}

/// One flattened record before envelope fields are attached.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatRecord {
    pub path: String,
    pub event_type: String,
    pub content: Value,
}

/// A filter still in play on the current branch, with the named captures
/// it picked up on the way down.
struct Candidate<'t> {
    entry: &'t FilterEntry,
    captures: Vec<(String, Value)>,
}

/// The compiled, ordered filter set plus the path delimiter.
///
/// Built once from configuration and shared read-only; every walk keeps
/// its own capture state.
#[derive(Clone, Debug)]
pub struct FilterTable {
    delimiter: String,
    entries: Vec<FilterEntry>,
}

impl Default for FilterTable {
    /// No filters, `~` delimiter.
    fn default() -> Self {
        Self {
            delimiter: "~".to_string(),
            entries: Vec::new(),
        }
    }
}

impl FilterTable {
    /// Split each pattern on `delimiter` and compile every piece.
    ///
    /// Empty pieces at the end of a pattern are dropped, so `a~b~` compiles
    /// to the same two atoms as `a~b`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyPattern`] for a pattern with no pieces left.
    /// - [`ConfigError::InvalidPattern`] naming the piece that failed.
    pub fn compile(filters: &[FilterConfig], delimiter: &str) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(filters.len());
        for filter in filters {
            let label = filter.name.clone().unwrap_or_default();
            let mut pieces: Vec<&str> = filter.pattern.split(delimiter).collect();
            while pieces.last().is_some_and(|piece| piece.is_empty()) {
                pieces.pop();
            }
            if pieces.is_empty() {
                return Err(ConfigError::EmptyPattern { name: label });
            }
            let atoms = pieces
                .into_iter()
                .map(|atom| FilterAtom::compile(&label, atom))
                .collect::<Result<Vec<_>, _>>()?;
            entries.push(FilterEntry {
                name: filter.name.clone(),
                atoms,
            });
        }
        Ok(Self {
            delimiter: delimiter.to_string(),
            entries,
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walk `data` depth-first and hand every record to `emit`.
    ///
    /// `raw_path` is the document's dotted `Path`, used by the leaf
    /// fallback. `seed` is the rendered path every record starts from.
    pub fn flatten<F>(&self, raw_path: &str, seed: &str, data: &Map<String, Value>, mut emit: F)
    where
        F: FnMut(FlatRecord),
    {
        let candidates: Vec<_> = self
            .entries
            .iter()
            .map(|entry| Candidate {
                entry,
                captures: Vec::new(),
            })
            .collect();
        self.walk(raw_path, seed, data, &candidates, 0, &mut emit);
    }

    /// Convenience wrapper collecting [`flatten`](Self::flatten) output.
    pub fn flatten_to_vec(
        &self,
        raw_path: &str,
        seed: &str,
        data: &Map<String, Value>,
    ) -> Vec<FlatRecord> {
        let mut out = Vec::new();
        self.flatten(raw_path, seed, data, |record| out.push(record));
        out
    }

    fn walk<F>(
        &self,
        raw_path: &str,
        path: &str,
        data: &Map<String, Value>,
        candidates: &[Candidate<'_>],
        depth: usize,
        emit: &mut F,
    ) where
        F: FnMut(FlatRecord),
    {
        for (branch, value) in data {
            let path_and_branch = format!("{path}{}{branch}", self.delimiter);
            let mut carried = Vec::new();
            let mut yielded = false;

            for candidate in candidates {
                let Some(atom) = candidate.entry.atoms.get(depth) else {
                    continue;
                };
                let Some(caps) = atom.regex.captures(branch) else {
                    continue;
                };

                // Depth 0 starts a fresh match, so nothing is inherited.
                let mut captures = if depth == 0 {
                    Vec::new()
                } else {
                    candidate.captures.clone()
                };
                for group in atom.regex.capture_names().flatten() {
                    let text = caps
                        .name(group)
                        .map_or(Value::Null, |m| Value::String(m.as_str().to_string()));
                    captures.push((group.to_string(), text));
                }

                if depth + 1 == candidate.entry.atoms.len() {
                    emit(complete_match(
                        &path_and_branch,
                        branch,
                        candidate.entry,
                        value,
                        captures,
                    ));
                    yielded = true;
                    break;
                }

                carried.push(Candidate {
                    entry: candidate.entry,
                    captures,
                });
            }

            if yielded {
                continue;
            }

            if let Value::Object(child) = value {
                self.walk(raw_path, &path_and_branch, child, &carried, depth + 1, emit);
            } else {
                emit(self.leaf(raw_path, path_and_branch, branch, value));
            }
        }
    }

    /// Scalars and arrays with no complete match above them.
    ///
    /// The configured filter set is searched for an entry that matches the
    /// document's schema path; a hit renames the record after that entry.
    fn leaf(
        &self,
        raw_path: &str,
        path_and_branch: String,
        branch: &str,
        value: &Value,
    ) -> FlatRecord {
        let hit = self
            .entries
            .iter()
            .find(|entry| entry.matches_schema_path(raw_path));

        match hit {
            Some(entry) => FlatRecord {
                path: raw_path.replace('.', &self.delimiter),
                event_type: entry.name.clone().unwrap_or_else(|| branch.to_string()),
                content: value.clone(),
            },
            None => FlatRecord {
                path: path_and_branch,
                event_type: branch.to_string(),
                content: value.clone(),
            },
        }
    }
}

fn complete_match(
    path_and_branch: &str,
    branch: &str,
    entry: &FilterEntry,
    value: &Value,
    captures: Vec<(String, Value)>,
) -> FlatRecord {
    match &entry.name {
        Some(name) => {
            let mut content = Map::new();
            content.insert(name.clone(), value.clone());
            content.insert(
                field::CAPTURES.to_string(),
                Value::Object(captures.into_iter().collect()),
            );
            FlatRecord {
                path: path_and_branch.to_string(),
                event_type: name.clone(),
                content: Value::Object(content),
            }
        }
        None => FlatRecord {
            path: path_and_branch.to_string(),
            event_type: branch.to_string(),
            content: value.clone(),
        },
    }
}
