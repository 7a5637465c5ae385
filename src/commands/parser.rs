//! XML output of the CakePHP console.
//!
//! Two documents are understood. The command list printed by
//! `command_list --xml`:
//!
//! ```xml
//! <shells>
//!   <shell name="bake" call_as="bake" provider="CORE" help="bake -h"/>
//!   <shell name="DebugKit" call_as="DebugKit.benchmark" provider="DebugKit" help="..."/>
//! </shells>
//! ```
//!
//! and the help of a single command printed by `<cmd> --help xml`:
//!
//! ```xml
//! <shell>
//!   <command>bake</command>
//!   <description>Bake scaffolding</description>
//!   <subcommands>
//!     <command name="model" help="Bake a model."/>
//!   </subcommands>
//! </shell>
//! ```

use super::CommandDescriptor;
use crate::errors::ConsoleError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, ConsoleError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn text(&self) -> &str {
        self.text.trim()
    }
}

fn multiple_roots() -> ConsoleError {
    ConsoleError::MalformedOutput("multiple root elements".to_string())
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), ConsoleError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(multiple_roots()),
    }
    Ok(())
}

/// Build the element tree, rejecting anything that is not a single
/// well-formed root element.
fn read_tree(xml: &str) -> Result<Element, ConsoleError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(multiple_roots());
                }
                stack.push(Element::from_start(&e)?);
            }
            Event::Empty(e) => {
                let element = Element::from_start(&e)?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    ConsoleError::MalformedOutput("unexpected closing tag".to_string())
                })?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(ConsoleError::MalformedOutput(format!(
                            "text outside root element: {}",
                            truncate(text.trim(), 60)
                        )));
                    }
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConsoleError::MalformedOutput(format!(
            "unclosed element <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| ConsoleError::MalformedOutput("no root element".to_string()))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Item of a command list, or a subcommand of a help document.
fn item_descriptor(element: &Element) -> Option<CommandDescriptor> {
    let command = element
        .attr("call_as")
        .or_else(|| element.attr("name"))
        .or_else(|| element.attr("command"))?;
    let description = element
        .attr("provider")
        .or_else(|| element.attr("help"))
        .or_else(|| element.attr("description"))
        .unwrap_or_default();
    let display_name = element.attr("name").unwrap_or(command);

    Some(CommandDescriptor::new(command, description, display_name))
}

fn help_descriptor(root: &Element) -> Option<CommandDescriptor> {
    let command = root.child("command").map(Element::text).filter(|c| !c.is_empty())?;
    let description = root.child("description").map(Element::text).unwrap_or_default();

    let mut descriptor = CommandDescriptor::new(command, description, command);
    if let Some(subcommands) = root.child("subcommands") {
        descriptor.subcommands = subcommands
            .children
            .iter()
            .filter(|c| c.name == "command")
            .filter_map(|c| {
                let name = c.attr("name")?;
                Some(CommandDescriptor::new(
                    name,
                    c.attr("help").unwrap_or_default(),
                    name,
                ))
            })
            .collect();
    }
    Some(descriptor)
}

/// Parse a command list into descriptors.
///
/// Every element under the root becomes a descriptor and its own child
/// elements become subcommands. Zero descriptors is a valid result; callers
/// treat it as "nothing usable".
pub fn parse(xml: &str) -> Result<Vec<CommandDescriptor>, ConsoleError> {
    let root = read_tree(xml)?;

    Ok(root
        .children
        .iter()
        .filter_map(|child| {
            let mut descriptor = item_descriptor(child)?;
            descriptor.subcommands = child.children.iter().filter_map(item_descriptor).collect();
            Some(descriptor)
        })
        .collect())
}

/// Parse the help of a single command.
///
/// Yields at most one descriptor; a root without `<command>` text yields none.
pub fn parse_help(xml: &str) -> Result<Vec<CommandDescriptor>, ConsoleError> {
    let root = read_tree(xml)?;
    Ok(help_descriptor(&root).into_iter().collect())
}
