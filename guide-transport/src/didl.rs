//! DIDL-Lite flattening
//!
//! A ContentDirectory `Browse` response carries its rows as a DIDL-Lite
//! document: one `<container>` or `<item>` element per child object. This
//! module flattens each of those elements into a [`Row`]:
//!
//! - attributes of the object element become `@name` columns (`@id`,
//!   `@parentID`),
//! - child elements become columns keyed by their qualified tag
//!   (`dc:title`, `upnp:class`),
//! - attributes of child elements become `tag@name` columns
//!   (`res@protocolInfo`).
//!
//! The flattening is schema-agnostic; which columns matter is the record
//! model's business.

use xmltree::{Element, XMLNode};

use crate::error::{Result, TransportError};
use crate::row::Row;

/// Parse a DIDL-Lite document into one row per object element.
pub(crate) fn parse_didl(xml: &str) -> Result<Vec<Row>> {
    let root = Element::parse(xml.as_bytes())
        .map_err(|e| TransportError::Parse(format!("Failed to parse DIDL-Lite: {e}")))?;

    let mut rows = Vec::new();
    for node in &root.children {
        let XMLNode::Element(element) = node else {
            continue;
        };
        if element.name == "container" || element.name == "item" {
            rows.push(flatten(element));
        }
    }
    Ok(rows)
}

/// Flatten one object element into a row.
fn flatten(object: &Element) -> Row {
    let mut row = Row::new();
    for (name, value) in &object.attributes {
        row.insert(format!("@{name}"), value.clone());
    }
    for node in &object.children {
        let XMLNode::Element(child) = node else {
            continue;
        };
        let tag = qualified_name(child);
        if let Some(text) = child.get_text() {
            row.insert(tag.clone(), text.into_owned());
        } else {
            row.insert(tag.clone(), String::new());
        }
        for (name, value) in &child.attributes {
            row.insert(format!("{tag}@{name}"), value.clone());
        }
    }
    row
}

fn qualified_name(element: &Element) -> String {
    match &element.prefix {
        Some(prefix) => format!("{prefix}:{}", element.name),
        None => element.name.clone(),
    }
}
