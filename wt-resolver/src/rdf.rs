//! RDF/XML reader for resource map graphs
//!
//! Handles the RDF/XML shapes DataONE emits for OAI-ORE resource maps:
//! - `rdf:Description` and typed node elements (`ore:Aggregation`, ...)
//!   with `rdf:about`, `rdf:ID` or `rdf:nodeID`
//! - Property elements with `rdf:resource` / `rdf:nodeID` objects, literal
//!   text (optionally `rdf:datatype`), or a nested node element
//! - `rdf:parseType="Resource"` and property attributes on node elements
//!
//! Not a general-purpose RDF/XML parser: `rdf:parseType="Literal"` content
//! is skipped, containers and reification are not expanded.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use thiserror::Error;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const ORE_AGGREGATES: &str = "http://www.openarchives.org/ore/terms/aggregates";
pub const CITO_IS_DOCUMENTED_BY: &str = "http://purl.org/spar/cito/isDocumentedBy";
pub const DCTERMS_IDENTIFIER: &str = "http://purl.org/dc/terms/identifier";

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// RDF/XML parse errors
#[derive(Debug, Error)]
pub enum RdfError {
    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("Unknown namespace prefix: {0}")]
    UnknownPrefix(String),

    #[error("Unqualified property element: {0}")]
    Unqualified(String),
}

/// Graph node or value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(String),
}

impl Term {
    pub fn as_str(&self) -> &str {
        match self {
            Term::Iri(s) | Term::Blank(s) | Term::Literal(s) => s,
        }
    }
}

/// One subject-predicate-object statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

/// Parsed graph with simple pattern lookups
#[derive(Debug, Clone, Default)]
pub struct Graph {
    triples: Vec<Triple>,
}

impl Graph {
    /// Parse an RDF/XML document; `base` resolves relative `rdf:about`/`rdf:ID`
    pub fn parse(content: &str, base: &str) -> Result<Self, RdfError> {
        let triples = Parser::new(base).run(content)?;
        Ok(Self { triples })
    }

    pub fn triple_count(&self) -> usize {
        self.triples.len()
    }

    /// Objects of `predicate`, for any subject
    pub fn objects<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a Term> + 'a {
        self.triples
            .iter()
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// Objects of `predicate` for `subject`
    pub fn objects_of<'a>(
        &'a self,
        subject: &'a Term,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.triples
            .iter()
            .filter(move |t| &t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
    }
}

// ============================================================================
// Parser
// ============================================================================

enum Frame {
    /// `rdf:RDF` wrapper
    Root,
    /// Node element; children are property elements
    Node { subject: Term },
    /// Property element awaiting its object
    Property {
        subject: Term,
        predicate: String,
        object: Option<Term>,
        text: String,
    },
    /// Content ignored until the matching end tag
    Skip,
}

struct RawAttr {
    prefix: String,
    local: String,
    value: String,
}

struct Parser {
    base: String,
    scopes: Vec<HashMap<String, String>>,
    stack: Vec<Frame>,
    triples: Vec<Triple>,
    next_blank: usize,
}

impl Parser {
    fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            scopes: Vec::new(),
            stack: Vec::new(),
            triples: Vec::new(),
            next_blank: 0,
        }
    }

    fn run(mut self, content: &str) -> Result<Vec<Triple>, RdfError> {
        let mut reader = Reader::from_str(content);

        loop {
            let event = reader.read_event().map_err(|e| RdfError::Xml {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;

            match event {
                Event::Start(ref e) => {
                    let attrs = self.enter(e)?;
                    let frame = self.open_element(e, &attrs)?;
                    self.stack.push(frame);
                }
                Event::Empty(ref e) => {
                    let attrs = self.enter(e)?;
                    let frame = self.open_element(e, &attrs)?;
                    self.close_frame(frame);
                    self.scopes.pop();
                }
                Event::End(_) => {
                    if let Some(frame) = self.stack.pop() {
                        self.close_frame(frame);
                    }
                    self.scopes.pop();
                }
                Event::Text(ref e) => {
                    if let Some(Frame::Property { text, .. }) = self.stack.last_mut() {
                        let unescaped = e.unescape().map_err(|err| RdfError::Xml {
                            position: reader.buffer_position(),
                            message: err.to_string(),
                        })?;
                        text.push_str(&unescaped);
                    }
                }
                Event::CData(ref e) => {
                    if let Some(Frame::Property { text, .. }) = self.stack.last_mut() {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(self.triples)
    }

    /// Read attributes and push the element's namespace scope
    fn enter(&mut self, e: &BytesStart<'_>) -> Result<Vec<RawAttr>, RdfError> {
        let mut scope = HashMap::new();
        let mut attrs = Vec::new();

        for attr in e.attributes() {
            let attr = attr.map_err(|err| RdfError::Xml {
                position: 0,
                message: err.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|err| RdfError::Xml {
                    position: 0,
                    message: err.to_string(),
                })?
                .to_string();

            if key == "xmlns" {
                scope.insert(String::new(), value);
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.insert(prefix.to_string(), value);
            } else {
                let (prefix, local) = split_qname(&key);
                attrs.push(RawAttr { prefix, local, value });
            }
        }

        self.scopes.push(scope);
        Ok(attrs)
    }

    fn open_element(&mut self, e: &BytesStart<'_>, attrs: &[RawAttr]) -> Result<Frame, RdfError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let (prefix, local) = split_qname(&name);

        match self.stack.last() {
            None => {
                if local == "RDF" && self.is_rdf(&prefix) {
                    Ok(Frame::Root)
                } else {
                    self.open_node(&prefix, &local, attrs)
                }
            }
            Some(Frame::Root) | Some(Frame::Property { object: None, .. }) => {
                self.open_node(&prefix, &local, attrs)
            }
            Some(Frame::Node { subject }) => {
                let subject = subject.clone();
                self.open_property(subject, &prefix, &local, attrs)
            }
            Some(Frame::Property { .. }) | Some(Frame::Skip) => Ok(Frame::Skip),
        }
    }

    fn open_node(&mut self, prefix: &str, local: &str, attrs: &[RawAttr]) -> Result<Frame, RdfError> {
        let subject = self.node_subject(attrs);

        // A nested node is the object of the enclosing property
        if let Some(Frame::Property { object, .. }) = self.stack.last_mut() {
            *object = Some(subject.clone());
        }

        if !(local == "Description" && self.is_rdf(prefix)) {
            let type_iri = self.expand(prefix, local)?;
            self.emit(subject.clone(), RDF_TYPE.to_string(), Term::Iri(type_iri));
        }

        self.emit_property_attrs(&subject, attrs)?;
        Ok(Frame::Node { subject })
    }

    fn open_property(
        &mut self,
        subject: Term,
        prefix: &str,
        local: &str,
        attrs: &[RawAttr],
    ) -> Result<Frame, RdfError> {
        if prefix.is_empty() && self.lookup("").is_none() {
            return Err(RdfError::Unqualified(local.to_string()));
        }
        let predicate = self.expand(prefix, local)?;

        if let Some(parse_type) = self.rdf_attr(attrs, "parseType") {
            if parse_type == "Resource" {
                let blank = self.fresh_blank();
                self.emit(subject, predicate, blank.clone());
                return Ok(Frame::Node { subject: blank });
            }
            return Ok(Frame::Skip);
        }

        let object = if let Some(resource) = self.rdf_attr(attrs, "resource") {
            Some(Term::Iri(self.resolve_iri(resource)))
        } else if let Some(node_id) = self.rdf_attr(attrs, "nodeID") {
            Some(Term::Blank(node_id.to_string()))
        } else {
            None
        };

        // Remaining property attributes describe an implicit blank object
        let object = match object {
            Some(term) => {
                self.emit_property_attrs(&term, attrs)?;
                Some(term)
            }
            None if attrs.iter().any(|a| self.is_property_attr(a)) => {
                let blank = self.fresh_blank();
                self.emit_property_attrs(&blank, attrs)?;
                Some(blank)
            }
            None => None,
        };

        Ok(Frame::Property {
            subject,
            predicate,
            object,
            text: String::new(),
        })
    }

    fn close_frame(&mut self, frame: Frame) {
        if let Frame::Property {
            subject,
            predicate,
            object,
            text,
        } = frame
        {
            let object = object.unwrap_or_else(|| Term::Literal(text.trim().to_string()));
            self.emit(subject, predicate, object);
        }
    }

    fn node_subject(&mut self, attrs: &[RawAttr]) -> Term {
        if let Some(about) = self.rdf_attr(attrs, "about") {
            return Term::Iri(self.resolve_iri(about));
        }
        if let Some(id) = self.rdf_attr(attrs, "ID") {
            return Term::Iri(format!("{}#{}", self.base, id));
        }
        if let Some(node_id) = self.rdf_attr(attrs, "nodeID") {
            return Term::Blank(node_id.to_string());
        }
        self.fresh_blank()
    }

    fn emit_property_attrs(&mut self, subject: &Term, attrs: &[RawAttr]) -> Result<(), RdfError> {
        for attr in attrs {
            if !self.is_property_attr(attr) {
                continue;
            }
            let predicate = self.expand(&attr.prefix, &attr.local)?;
            let object = if predicate == RDF_TYPE {
                Term::Iri(self.resolve_iri(&attr.value))
            } else {
                Term::Literal(attr.value.clone())
            };
            self.emit(subject.clone(), predicate, object);
        }
        Ok(())
    }

    /// Prefixed attributes outside the RDF syntax and XML namespaces
    fn is_property_attr(&self, attr: &RawAttr) -> bool {
        if attr.prefix.is_empty() {
            return false;
        }
        match self.lookup(&attr.prefix) {
            Some(ns) if ns == XML_NS => false,
            Some(ns) if ns == RDF_NS => attr.local == "type",
            Some(_) => true,
            None => attr.prefix != "xml",
        }
    }

    /// RDF syntax attribute value, accepting the legacy unprefixed form
    fn rdf_attr<'a>(&self, attrs: &'a [RawAttr], local: &str) -> Option<&'a str> {
        attrs
            .iter()
            .find(|a| a.local == local && (a.prefix.is_empty() || self.is_rdf(&a.prefix)))
            .map(|a| a.value.as_str())
    }

    fn resolve_iri(&self, value: &str) -> String {
        if value.is_empty() {
            self.base.clone()
        } else if value.starts_with('#') {
            format!("{}{}", self.base, value)
        } else {
            value.to_string()
        }
    }

    fn expand(&self, prefix: &str, local: &str) -> Result<String, RdfError> {
        let ns = self
            .lookup(prefix)
            .ok_or_else(|| RdfError::UnknownPrefix(prefix.to_string()))?;
        Ok(format!("{}{}", ns, local))
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix))
            .map(String::as_str)
    }

    fn is_rdf(&self, prefix: &str) -> bool {
        self.lookup(prefix) == Some(RDF_NS)
    }

    fn fresh_blank(&mut self) -> Term {
        self.next_blank += 1;
        Term::Blank(format!("genid{}", self.next_blank))
    }

    fn emit(&mut self, subject: Term, predicate: String, object: Term) {
        self.triples.push(Triple {
            subject,
            predicate,
            object,
        });
    }
}

fn split_qname(name: &str) -> (String, String) {
    match name.split_once(':') {
        Some((prefix, local)) => (prefix.to_string(), local.to_string()),
        None => (String::new(), name.to_string()),
    }
}
