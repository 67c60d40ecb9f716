// Namespace-aware element tree for XBRL instance documents
use crate::{Error, Result};
use compact_str::CompactString;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::io::BufRead;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub prefix: Option<CompactString>,
    pub local_name: CompactString,
    pub value: String,
}

/// A single XML element with its resolved namespace, attributes, text and
/// children in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    prefix: Option<CompactString>,
    local_name: CompactString,
    attributes: Vec<Attribute>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// `prefix:local` when a prefix was written, otherwise the local name.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local_name),
            None => self.local_name.to_string(),
        }
    }

    /// Attribute value by local name, ignoring any prefix.
    pub fn attr(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Trimmed text content directly owned by this element.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name == local_name)
    }

    /// Pre-order traversal of every element below this one.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack: Vec<&Element> = Vec::with_capacity(64);
        stack.extend(self.children.iter().rev());
        Descendants { stack }
    }

    pub fn has_element_content(&self) -> bool {
        !self.children.is_empty() || !self.text().is_empty()
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// A fully parsed instance document. Owned by the caller; extraction only
/// ever borrows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    root: Element,
}

impl ParsedDocument {
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Number of elements in the tree, root included.
    pub fn element_count(&self) -> usize {
        1 + self.root.descendants().count()
    }
}

/// Parse a readable stream into a [`ParsedDocument`].
pub fn parse<R: BufRead>(source: R) -> Result<ParsedDocument> {
    let mut reader = NsReader::from_reader(source);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (namespace, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, event)) => (owned_namespace(ns), event.into_owned()),
            Err(e) => {
                return Err(Error::MalformedDocument(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                )))
            }
        };

        match event {
            Event::Start(start) => {
                stack.push(open_element(&start, namespace)?);
            }
            Event::Empty(start) => {
                let element = open_element(&start, namespace)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    Error::MalformedDocument("unexpected closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| Error::MalformedDocument(e.to_string()))?;
                    current.text.push_str(&unescaped);
                }
            }
            Event::CData(cdata) => {
                if let Some(current) = stack.last_mut() {
                    let raw = cdata.into_inner();
                    let text = std::str::from_utf8(&raw).map_err(|_| {
                        Error::MalformedDocument("invalid UTF-8 in CDATA section".to_string())
                    })?;
                    current.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(Error::MalformedDocument(format!(
            "unclosed element <{}>",
            open.qualified_name()
        )));
    }

    root.map(|root| ParsedDocument { root })
        .ok_or_else(|| Error::MalformedDocument("document has no root element".to_string()))
}

pub fn parse_bytes(data: &[u8]) -> Result<ParsedDocument> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    parse(data)
}

pub fn parse_str(text: &str) -> Result<ParsedDocument> {
    parse_bytes(text.as_bytes())
}

fn owned_namespace(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

fn open_element(start: &BytesStart<'_>, namespace: Option<String>) -> Result<Element> {
    let name = start.name();
    let local_name = utf8(name.local_name().as_ref(), "element name")?;
    let prefix = match name.prefix() {
        Some(prefix) => Some(utf8(prefix.as_ref(), "element prefix")?),
        None => None,
    };

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::MalformedDocument(e.to_string()))?;
        let key = attr.key;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::MalformedDocument(e.to_string()))?;
        attributes.push(Attribute {
            prefix: match key.prefix() {
                Some(prefix) => Some(utf8(prefix.as_ref(), "attribute prefix")?),
                None => None,
            },
            local_name: utf8(key.local_name().as_ref(), "attribute name")?,
            value: value.into_owned(),
        });
    }

    Ok(Element {
        namespace,
        prefix,
        local_name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(Error::MalformedDocument(format!(
            "second root element <{}>",
            element.qualified_name()
        ))),
    }
}

fn utf8(bytes: &[u8], what: &str) -> Result<CompactString> {
    std::str::from_utf8(bytes)
        .map(CompactString::from)
        .map_err(|_| Error::MalformedDocument(format!("invalid UTF-8 in {}", what)))
}
