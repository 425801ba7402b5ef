//! SAML 1.1 `samlValidate` answers wrapped in a SOAP envelope

use super::{expect_root, non_empty_text};
use crate::error::{FailureCode, ParseError, ProtocolFailure};
use crate::model::{Attributes, ValidationResult};
use crate::xml::{Element, parse_document};

const SUCCESS: &str = "Success";

pub(super) fn parse(body: &[u8]) -> Result<ValidationResult, ProtocolFailure> {
    let root = parse_document(body)?;
    let response = if root.name == "Response" {
        &root
    } else {
        expect_root(&root, "Envelope")?;
        root.descendant("Response")
            .ok_or(ParseError::MissingElement("Response"))?
    };

    let status = response
        .descendant("StatusCode")
        .ok_or(ParseError::MissingElement("StatusCode"))?;
    let value = status.attr("Value").ok_or(ParseError::MissingAttribute {
        element: "StatusCode",
        attribute: "Value",
    })?;
    // "samlp:Success" and "Success" are both seen in the wild
    let code = value.rsplit_once(':').map_or(value, |(_, local)| local).trim();

    if code != SUCCESS {
        let message = response
            .descendant("StatusMessage")
            .map(Element::text)
            .unwrap_or_default();
        return Err(ProtocolFailure::new(FailureCode::from(code.to_string()), message));
    }

    let principal = response
        .descendant("NameIdentifier")
        .and_then(non_empty_text)
        .ok_or(ParseError::MissingElement("NameIdentifier"))?;

    let mut pairs = Vec::new();
    for attribute in response.descendants_named("Attribute") {
        let Some(name) = attribute.attr("AttributeName") else {
            continue;
        };
        for value in attribute.children_named("AttributeValue") {
            pairs.push((name.to_string(), value.text().to_string()));
        }
    }

    Ok(ValidationResult::new(principal).with_attributes(Attributes::from_pairs(pairs)))
}
