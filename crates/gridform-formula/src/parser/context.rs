//! Per-call parse state and the parse result

use ahash::AHashMap;

use crate::ast::{Address, Range, Span, StructuredReference, Unit, UnitId, UnitKind};
use crate::error::{FormulaResult, ParseError, ParseErrorKind};
use crate::lexer::CharStream;
use crate::options::Locale;

/// One reference encountered while parsing, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Id of the unit the reference came from
    pub id: UnitId,
    pub span: Span,
    pub kind: ReferenceKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceKind {
    Address(Address),
    Range(Range),
    Identifier(String),
    StructuredReference(StructuredReference),
}

/// Outcome of one parse
///
/// Parsing never fails outright: on malformed input `valid` is false, `error`
/// says what and where, and `root` still holds a best-effort tree.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// `None` when the formula was empty
    pub root: Option<Unit>,
    pub valid: bool,
    pub error: Option<ParseError>,
    /// Standalone cell references keyed by canonical label
    pub addresses: AHashMap<String, Address>,
    /// Ranges keyed by their source label
    pub ranges: AHashMap<String, Range>,
    /// Every address, range, name and structured reference in source order
    pub references: Vec<Reference>,
    /// Locale the formula was parsed with
    pub locale: Locale,
}

impl ParseResult {
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|error| error.kind.to_string())
    }

    pub fn error_position(&self) -> Option<usize> {
        self.error.as_ref().map(|error| error.position)
    }

    /// The tree, if the parse was valid
    pub fn into_root(self) -> FormulaResult<Option<Unit>> {
        match self.error {
            Some(error) => Err(error.into()),
            None => Ok(self.root),
        }
    }
}

struct AddressEntry {
    address: Address,
    count: i64,
}

/// Mutable state of a single parse invocation
pub(crate) struct ParseContext {
    pub stream: CharStream,
    pub depth: usize,
    next_id: UnitId,
    error: Option<ParseError>,
    addresses: AHashMap<String, AddressEntry>,
    ranges: AHashMap<String, Range>,
    references: Vec<Reference>,
}

impl ParseContext {
    pub fn new(formula: &str) -> Self {
        Self {
            stream: CharStream::new(formula),
            depth: 0,
            next_id: 0,
            error: None,
            addresses: AHashMap::new(),
            ranges: AHashMap::new(),
            references: Vec::new(),
        }
    }

    pub fn unit(&mut self, span: Span, kind: UnitKind) -> Unit {
        let id = self.next_id;
        self.next_id += 1;
        Unit::new(id, span, kind)
    }

    /// Record an error; the first one wins
    pub fn fail(&mut self, kind: ParseErrorKind, position: usize) {
        log::debug!("parse error at {position}: {kind}");
        if self.error.is_none() {
            self.error = Some(ParseError::new(kind, position));
        }
    }

    /// Track a reference-bearing unit
    pub fn note(&mut self, unit: &Unit) {
        let kind = match &unit.kind {
            UnitKind::Address(address) => {
                self.addresses
                    .entry(address.label())
                    .or_insert_with(|| AddressEntry {
                        address: address.clone(),
                        count: 0,
                    })
                    .count += 1;
                ReferenceKind::Address(address.clone())
            }
            UnitKind::Identifier(name) => ReferenceKind::Identifier(name.clone()),
            UnitKind::StructuredReference(reference) => {
                ReferenceKind::StructuredReference(reference.clone())
            }
            _ => return,
        };
        self.references.push(Reference {
            id: unit.id,
            span: unit.span,
            kind,
        });
    }

    /// Undo the dependency count of an address that became a range corner
    pub fn release_address(&mut self, address: &Address) {
        if let Some(entry) = self.addresses.get_mut(&address.label()) {
            entry.count -= 1;
        }
    }

    pub fn forget_reference(&mut self, id: UnitId) {
        self.references.retain(|reference| reference.id != id);
    }

    /// Record a bound range in place of the units it was built from
    pub fn bind_range(&mut self, left: UnitId, right: UnitId, unit: &Unit) {
        let UnitKind::Range(range) = &unit.kind else {
            return;
        };
        self.ranges.insert(range.label.clone(), range.clone());

        let reference = Reference {
            id: unit.id,
            span: unit.span,
            kind: ReferenceKind::Range(range.clone()),
        };
        match self
            .references
            .iter()
            .position(|r| r.id == left || r.id == right)
        {
            Some(index) => {
                self.references[index] = reference;
                self.references.retain(|r| r.id != left && r.id != right);
            }
            None => self.references.push(reference),
        }
    }

    pub fn finish(self, root: Option<Unit>, locale: Locale) -> ParseResult {
        let addresses = self
            .addresses
            .into_iter()
            .filter(|(_, entry)| entry.count > 0)
            .map(|(label, entry)| (label, entry.address))
            .collect();

        ParseResult {
            root,
            valid: self.error.is_none(),
            error: self.error,
            addresses,
            ranges: self.ranges,
            references: self.references,
            locale,
        }
    }
}
