//! Owned element tree for the save document.
//!
//! The game's format is a loose plist: dictionaries are `<d>`/`<dict>`
//! elements whose children alternate `<k>key</k>` and a value element. Text
//! is kept exactly as escaped in the source so untouched parts of the
//! document are written back unchanged.

use log::debug;
use quick_xml::Writer;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;

use crate::SaveError;

pub const LEVEL_NAME_KEY: &str = "k2";
pub const LEVEL_PAYLOAD_KEY: &str = "k4";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Escaped character data.
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    /// Tag content after `<`: name plus raw attributes.
    start: String,
    pub children: Vec<Node>,
    empty: bool,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: name.to_string(),
            children: Vec::new(),
            empty: false,
        }
    }

    fn from_start(e: &BytesStart<'_>, empty: bool) -> Result<Self, SaveError> {
        let name = String::from_utf8(e.name().as_ref().to_vec())?;
        let start = String::from_utf8(e.to_vec())?;
        Ok(Self {
            name,
            start,
            children: Vec::new(),
            empty,
        })
    }

    /// Element with a single text child, escaping `text`.
    pub fn with_text(name: &str, text: &str) -> Self {
        let mut el = Self::new(name);
        el.set_text(text);
        el
    }

    /// Unescaped concatenation of direct text children.
    ///
    /// # Errors
    /// `SaveError::MalformedDocument` for an undecodable entity.
    pub fn text(&self) -> Result<String, SaveError> {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(raw) => {
                    let text = unescape(raw).map_err(|e| SaveError::MalformedDocument(e.to_string()))?;
                    out.push_str(&text);
                },
                Node::CData(raw) => out.push_str(raw),
                _ => {},
            }
        }
        Ok(out)
    }

    pub fn set_text(&mut self, text: &str) {
        self.children = vec![Node::Text(escape(text).into_owned())];
        self.empty = false;
    }

    fn elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children.iter().enumerate().filter_map(|(i, n)| match n {
            Node::Element(el) => Some((i, el)),
            _ => None,
        })
    }

    /// Child index of the value element following `<k>key</k>`.
    pub fn value_index(&self, key: &str) -> Option<usize> {
        let mut iter = self.elements();
        while let Some((_, el)) = iter.next() {
            if el.name == "k" && el.text().is_ok_and(|t| t == key) {
                return iter.next().map(|(i, _)| i);
            }
        }
        None
    }

    pub fn value(&self, key: &str) -> Option<&Element> {
        match self.children.get(self.value_index(key)?) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn value_mut(&mut self, key: &str) -> Option<&mut Element> {
        let idx = self.value_index(key)?;
        match self.children.get_mut(idx) {
            Some(Node::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Set the string value for `key`, appending `<k>key</k><s>..</s>` when
    /// the key is absent.
    pub fn set_string(&mut self, key: &str, text: &str) {
        match self.value_mut(key) {
            Some(el) => el.set_text(text),
            None => {
                self.children.push(Node::Element(Element::with_text("k", key)));
                self.children.push(Node::Element(Element::with_text("s", text)));
                self.empty = false;
            },
        }
    }

    fn is_level_entry(&self) -> bool {
        self.name == "d" && self.value(LEVEL_NAME_KEY).is_some()
    }

    fn write<W: std::io::Write>(&self, w: &mut Writer<W>) -> Result<(), SaveError> {
        let start = BytesStart::from_content(self.start.as_str(), self.name.len());
        if self.empty && self.children.is_empty() {
            w.write_event(Event::Empty(start))?;
            return Ok(());
        }
        w.write_event(Event::Start(start))?;
        for child in &self.children {
            child.write(w)?;
        }
        w.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

impl Node {
    fn write<W: std::io::Write>(&self, w: &mut Writer<W>) -> Result<(), SaveError> {
        match self {
            Node::Element(el) => el.write(w)?,
            Node::Text(raw) => w.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?,
            Node::CData(raw) => w.write_event(Event::CData(BytesCData::new(raw.as_str())))?,
            Node::Comment(raw) => w.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?,
        }
        Ok(())
    }
}

/// A parsed save document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// XML declaration version, if the source had a declaration.
    decl_version: Option<String>,
    pub nodes: Vec<Node>,
}

/// Path of child indices from the document's top-level nodes to an element.
pub type NodePath = Vec<usize>;

impl Document {
    /// Parse document text.
    ///
    /// # Errors
    /// `SaveError::Xml` for syntax errors, `MalformedDocument` for unbalanced
    /// tags.
    pub fn parse(text: &str) -> Result<Self, SaveError> {
        let mut reader = Reader::from_str(text);
        let mut decl_version = None;
        let mut top = Vec::new();
        let mut open: Vec<Element> = Vec::new();

        loop {
            let node = match reader.read_event()? {
                Event::Start(e) => {
                    open.push(Element::from_start(&e, false)?);
                    continue;
                },
                Event::End(_) => {
                    let el = open
                        .pop()
                        .ok_or_else(|| SaveError::MalformedDocument("unexpected closing tag".into()))?;
                    Node::Element(el)
                },
                Event::Empty(e) => Node::Element(Element::from_start(&e, true)?),
                Event::Text(t) => Node::Text(String::from_utf8(t.into_inner().into_owned())?),
                Event::GeneralRef(r) => Node::Text(format!("&{};", String::from_utf8(r.to_vec())?)),
                Event::CData(c) => Node::CData(String::from_utf8(c.into_inner().into_owned())?),
                Event::Comment(c) => Node::Comment(String::from_utf8(c.into_inner().into_owned())?),
                Event::Decl(d) => {
                    decl_version = Some(String::from_utf8(d.version()?.into_owned())?);
                    continue;
                },
                Event::Eof => break,
                other => {
                    debug!("dropping unsupported document event {other:?}");
                    continue;
                },
            };
            let siblings = match open.last_mut() {
                Some(parent) => &mut parent.children,
                None => &mut top,
            };
            push_merged(siblings, node);
        }

        if let Some(el) = open.last() {
            return Err(SaveError::MalformedDocument(format!("element <{}> is never closed", el.name)));
        }
        Ok(Self {
            decl_version,
            nodes: top,
        })
    }

    /// Serialize back to text.
    ///
    /// # Errors
    /// Only if the underlying writer fails.
    pub fn to_xml(&self) -> Result<String, SaveError> {
        let mut writer = Writer::new(Vec::new());
        if let Some(version) = &self.decl_version {
            writer.write_event(Event::Decl(BytesDecl::new(version, None, None)))?;
        }
        for node in &self.nodes {
            node.write(&mut writer)?;
        }
        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Every level entry (a `<d>` with a `k2` name) in document order.
    pub fn level_entries(&self) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        collect_levels(&self.nodes, &mut path, &mut found);
        found
    }

    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        let (first, rest) = path.split_first()?;
        let mut el = match self.nodes.get(*first)? {
            Node::Element(el) => el,
            _ => return None,
        };
        for idx in rest {
            el = match el.children.get(*idx)? {
                Node::Element(child) => child,
                _ => return None,
            };
        }
        Some(el)
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let (first, rest) = path.split_first()?;
        let mut el = match self.nodes.get_mut(*first)? {
            Node::Element(el) => el,
            _ => return None,
        };
        for idx in rest {
            el = match el.children.get_mut(*idx)? {
                Node::Element(child) => child,
                _ => return None,
            };
        }
        Some(el)
    }
}

// text split by entity references arrives in pieces
fn push_merged(siblings: &mut Vec<Node>, node: Node) {
    if let (Some(Node::Text(prev)), Node::Text(next)) = (siblings.last_mut(), &node) {
        prev.push_str(next);
        return;
    }
    siblings.push(node);
}

fn collect_levels(nodes: &[Node], path: &mut NodePath, found: &mut Vec<NodePath>) {
    for (i, node) in nodes.iter().enumerate() {
        if let Node::Element(el) = node {
            path.push(i);
            if el.is_level_entry() {
                found.push(path.clone());
            } else {
                collect_levels(&el.children, path, found);
            }
            path.pop();
        }
    }
}

/// Display name of a level entry.
pub fn level_name(entry: &Element) -> String {
    entry
        .value(LEVEL_NAME_KEY)
        .and_then(|v| v.text().ok())
        .unwrap_or_default()
}
