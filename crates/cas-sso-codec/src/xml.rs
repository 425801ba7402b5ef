//! Namespaces, the SAML request envelope and a small element tree
//!
//! CAS answers are small documents, so they are read into an owned tree and
//! queried by local name. Namespace prefixes are dropped on the way in.

use crate::error::ParseError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fmt;

/// CAS 2.0/3.0 response namespace
pub const CAS_NS: &str = "http://www.yale.edu/tp/cas";
/// SOAP 1.1 envelope namespace
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
/// SAML 1.0 protocol namespace
pub const SAML1_PROTOCOL_NS: &str = "urn:oasis:names:tc:SAML:1.0:protocol";
/// SAML 1.0 assertion namespace
pub const SAML1_ASSERTION_NS: &str = "urn:oasis:names:tc:SAML:1.0:assertion";
/// SAML 2.0 protocol namespace, used by single-logout requests
pub const SAML2_PROTOCOL_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
/// `SOAPAction` value CAS expects on `/samlValidate`
pub const SAML_SOAP_ACTION: &str = "http://www.oasis-open.org/committees/security";

/// Deepest element nesting accepted in a response. A SAML envelope, the
/// deepest legitimate answer, stays under ten levels.
pub const MAX_DEPTH: usize = 64;

/// Render the SOAP envelope posted to `/samlValidate`.
///
/// `ticket` is escaped here; `request_id` and `issue_instant` are escaped too
/// since callers may override them.
pub fn saml_validate_envelope(ticket: &str, request_id: &str, issue_instant: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="{SOAP_ENVELOPE_NS}">
    <SOAP-ENV:Header/>
    <SOAP-ENV:Body>
        <samlp:Request xmlns:samlp="{SAML1_PROTOCOL_NS}"
        MajorVersion="1" MinorVersion="1" RequestID="{}" IssueInstant="{}">
            <samlp:AssertionArtifact>{}</samlp:AssertionArtifact></samlp:Request>
    </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
        quick_xml::escape::escape(request_id),
        quick_xml::escape::escape(issue_instant),
        quick_xml::escape::escape(ticket),
    )
}

/// Element of a parsed document, keyed by local name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Self>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = attr.key.local_name();
            // xmlns declarations carry no data for us
            if attr.key.as_ref().starts_with(b"xmlns") {
                continue;
            }
            let value = attr.unescape_value().map_err(xml_error)?;
            attributes.push((
                String::from_utf8_lossy(key.as_ref()).into_owned(),
                value.into_owned(),
            ));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Trimmed text content of this element, children excluded
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Attribute by local name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child with the given local name
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Direct children with the given local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First descendant with the given local name, in document order
    pub fn descendant(&self, name: &str) -> Option<&Self> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.descendant(name)
            }
        })
    }

    /// Every descendant with the given local name, in document order
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Self> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Self>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }
}

fn xml_error(err: impl fmt::Display) -> ParseError {
    ParseError::Xml(err.to_string())
}

/// Parse a body into its root element.
pub(crate) fn parse_document(body: &[u8]) -> Result<Element, ParseError> {
    let text = std::str::from_utf8(body).map_err(|_| ParseError::Utf8)?;
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(ParseError::Xml("content after the root element".to_string()));
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(ParseError::Xml(format!(
                        "nesting too deep (more than {MAX_DEPTH} elements)"
                    )));
                }
                stack.push(Element::open(&start)?);
            }
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(raw) => {
                let value = raw.unescape().map_err(xml_error)?;
                append_text(&mut stack, &value)?;
            }
            Event::CData(raw) => {
                let value = String::from_utf8_lossy(raw.as_ref()).into_owned();
                append_text(&mut stack, &value)?;
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Xml(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or(ParseError::NoRootElement)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(ParseError::Xml("multiple root elements".to_string()))
    }
}

fn append_text(stack: &mut [Element], value: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(current) => {
            current.text.push_str(value);
            Ok(())
        }
        None if value.trim().is_empty() => Ok(()),
        None => Err(ParseError::Xml("text outside the root element".to_string())),
    }
}
