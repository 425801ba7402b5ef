//! CAS 2.0/3.0 `serviceResponse` documents

use super::{expect_root, failure_from, non_empty_text};
use crate::error::{ParseError, ProtocolFailure};
use crate::model::{Attributes, ValidationResult};
use crate::xml::{Element, parse_document};

pub(super) fn parse(body: &[u8]) -> Result<ValidationResult, ProtocolFailure> {
    let root = parse_document(body)?;
    expect_root(&root, "serviceResponse")?;

    if let Some(success) = root.child("authenticationSuccess") {
        return parse_success(success);
    }
    if let Some(failure) = root.child("authenticationFailure") {
        return Err(failure_from(failure, "authenticationFailure"));
    }
    Err(ParseError::MissingElement("authenticationSuccess").into())
}

fn parse_success(success: &Element) -> Result<ValidationResult, ProtocolFailure> {
    let principal = success
        .child("user")
        .and_then(non_empty_text)
        .ok_or(ParseError::MissingElement("user"))?;

    // Document order: name/value attributes may sit directly under
    // authenticationSuccess, before or after the attributes block
    let mut pairs: Vec<(String, String)> = Vec::new();
    for child in &success.children {
        match child.name.as_str() {
            "attributes" => {
                for attribute in &child.children {
                    collect_attribute(attribute, &mut pairs);
                }
            }
            "attribute" => collect_attribute(child, &mut pairs),
            _ => {}
        }
    }

    let mut result = ValidationResult::new(principal).with_attributes(Attributes::from_pairs(pairs));
    if let Some(pgt) = success.child("proxyGrantingTicket").and_then(non_empty_text) {
        result = result.with_proxy_granting_ticket(pgt);
    }
    if let Some(proxies) = success.child("proxies") {
        result = result.with_proxies(
            proxies
                .children_named("proxy")
                .filter_map(non_empty_text)
                .collect(),
        );
    }
    Ok(result)
}

fn collect_attribute(element: &Element, pairs: &mut Vec<(String, String)>) {
    if element.name == "attribute" {
        if let Some(name) = element.attr("name") {
            let value = element.attr("value").unwrap_or_else(|| element.text());
            pairs.push((name.to_string(), value.to_string()));
            return;
        }
    }
    pairs.push((element.name.clone(), element.text().to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCode;
    use crate::model::AttributeValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_success_with_roles() {
        let result = parse(
            br#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                <cas:authenticationSuccess>
                    <cas:user>alice</cas:user>
                    <cas:attributes>
                        <cas:roles>admin</cas:roles>
                        <cas:roles>editor</cas:roles>
                        <cas:email>alice@example.com</cas:email>
                    </cas:attributes>
                </cas:authenticationSuccess>
            </cas:serviceResponse>"#,
        )
        .unwrap();

        assert_eq!(result.principal, "alice");
        assert_eq!(
            result.attributes.get("roles"),
            Some(&AttributeValue::from(["admin", "editor"]))
        );
        assert_eq!(result.attributes.first("email"), Some("alice@example.com"));
        assert!(result.proxies.is_empty());
    }

    #[test]
    fn test_name_value_attribute_form() {
        let result = parse(
            br#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                <cas:authenticationSuccess>
                    <cas:user>bob</cas:user>
                    <cas:attribute name="group" value="staff"/>
                    <cas:attributes>
                        <cas:attribute name="group" value="ops"/>
                    </cas:attributes>
                </cas:authenticationSuccess>
            </cas:serviceResponse>"#,
        )
        .unwrap();

        assert_eq!(
            result.attributes.get("group"),
            Some(&AttributeValue::from(["staff", "ops"]))
        );
    }

    #[test]
    fn test_repeated_attributes_keep_document_order() {
        let result = parse(
            br#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                <cas:authenticationSuccess>
                    <cas:user>bob</cas:user>
                    <cas:attributes>
                        <cas:group>a</cas:group>
                        <cas:attribute name="group" value="b"/>
                    </cas:attributes>
                    <cas:attribute name="group" value="c"/>
                    <cas:proxyGrantingTicket>PGTIOU-1</cas:proxyGrantingTicket>
                </cas:authenticationSuccess>
            </cas:serviceResponse>"#,
        )
        .unwrap();

        assert_eq!(
            result.attributes.get("group"),
            Some(&AttributeValue::from(["a", "b", "c"]))
        );
        assert_eq!(result.attributes.len(), 1);
    }

    #[test]
    fn test_unprefixed_namespace_is_accepted() {
        let result = parse(
            br#"<serviceResponse xmlns="http://www.yale.edu/tp/cas">
                <authenticationSuccess><user>carol</user></authenticationSuccess>
            </serviceResponse>"#,
        )
        .unwrap();
        assert_eq!(result.principal, "carol");
    }

    #[test]
    fn test_missing_user_is_internal_error() {
        let failure = parse(
            br#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
                <cas:authenticationSuccess><cas:user>  </cas:user></cas:authenticationSuccess>
            </cas:serviceResponse>"#,
        )
        .unwrap_err();
        assert_eq!(failure.code, FailureCode::InternalError);
    }

    #[test]
    fn test_wrong_root_is_internal_error() {
        let failure = parse(b"<cas:other xmlns:cas=\"x\"><cas:user>a</cas:user></cas:other>").unwrap_err();
        assert_eq!(failure.code, FailureCode::InternalError);
        assert!(failure.description.contains("serviceResponse"));
    }

    #[test]
    fn test_empty_service_response() {
        let failure = parse(b"<cas:serviceResponse xmlns:cas=\"x\"/>").unwrap_err();
        assert_eq!(failure.code, FailureCode::InternalError);
    }
}
