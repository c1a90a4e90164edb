//! Arena-backed XML document tree
//!
//! Generic structural layer under the planner facade: nodes live in a flat
//! arena and are addressed by `NodeId`, with explicit parent/children
//! indexes instead of live object references. Child lookup is direct
//! traversal: iterate children, compare names. No query language.
//!
//! Round-trip fidelity: attribute order and text content are preserved, so
//! loading and saving a document only changes the attributes a caller
//! explicitly set.

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::lock::write_atomic;

/// Opaque handle to a node in a [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: Option<String>,
}

/// An XML document as a tree of named elements with string attributes
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Parse a document from XML text
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let id = push_node(&mut nodes, &start, stack.last().copied())?;
                    attach(&mut nodes, &stack, &mut root, id)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    let id = push_node(&mut nodes, &start, stack.last().copied())?;
                    attach(&mut nodes, &stack, &mut root, id)?;
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(text) => {
                    let value = text.unescape()?;
                    if value.trim().is_empty() {
                        continue;
                    }
                    let Some(&current) = stack.last() else {
                        continue;
                    };
                    let node = &mut nodes[current.0];
                    match &mut node.text {
                        Some(existing) => existing.push_str(&value),
                        None => node.text = Some(value.into_owned()),
                    }
                }
                Event::Eof => break,
                // Declarations, comments, CDATA, PIs carry no task data
                _ => {}
            }
        }

        let root = root
            .ok_or_else(|| Error::OperationFailed("document has no root element".to_string()))?;
        Ok(Document { nodes, root })
    }

    /// Load a document from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DocumentNotFound(path.to_path_buf()));
        }
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    /// Serialize the document back to XML text
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.write_node(&mut writer, self.root)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes)
            .map_err(|err| Error::OperationFailed(format!("serialized XML is not UTF-8: {err}")))
    }

    /// Atomically write the document to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let xml = self.to_xml_string()?;
        write_atomic(path, xml.as_bytes())
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        let node = &self.nodes[id.0];
        let mut start = BytesStart::new(node.name.as_str());
        for (key, value) in &node.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if node.children.is_empty() && node.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &node.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for &child in &node.children {
            self.write_node(writer, child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(node.name.as_str())))?;
        Ok(())
    }

    /// The document's root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Element name of a node
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Attribute value, if present
    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0]
            .attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing in place to preserve attribute order
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        let node = &mut self.nodes[id.0];
        let value = value.into();
        match node.attrs.iter_mut().find(|(name, _)| name == key) {
            Some(entry) => entry.1 = value,
            None => node.attrs.push((key.to_string(), value)),
        }
    }

    /// Text content of a node, if any
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].text.as_deref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Direct children with the given element name
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(move |&child| self.nodes[child.0].name == name)
    }

    /// The first direct child with the given element name
    pub fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// All descendants of a node in depth-first order, excluding the node
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut pending: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            result.push(current);
            pending.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        result
    }

    /// Create a new unattached element
    ///
    /// The caller is responsible for appending it to a parent.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
            text: None,
        });
        id
    }

    /// Attach an unattached node as the last child of a parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.nodes[child.0].parent.is_none(),
            "node already has a parent"
        );
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }
}

fn push_node(nodes: &mut Vec<Node>, start: &BytesStart, parent: Option<NodeId>) -> Result<NodeId> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr =
            attr.map_err(|err| Error::OperationFailed(format!("bad XML attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }

    let id = NodeId(nodes.len());
    nodes.push(Node {
        name,
        attrs,
        parent,
        children: Vec::new(),
        text: None,
    });
    Ok(id)
}

fn attach(
    nodes: &mut [Node],
    stack: &[NodeId],
    root: &mut Option<NodeId>,
    id: NodeId,
) -> Result<()> {
    match stack.last() {
        Some(&parent) => {
            nodes[parent.0].children.push(id);
        }
        None => {
            if root.is_some() {
                return Err(Error::OperationFailed(
                    "document has more than one root element".to_string(),
                ));
            }
            *root = Some(id);
        }
    }
    Ok(())
}
