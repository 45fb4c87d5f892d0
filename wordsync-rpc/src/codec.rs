//! XML-RPC request encoding and response decoding.
//!
//! Responses are read with `quick_xml` into a small element tree first, then
//! interpreted. Payloads here are small (term lists, resource manifests), so
//! the tree costs nothing worth avoiding and keeps the interpretation simple.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use wordsync_core::RemoteError;

use crate::value::Value;

/// A decoded `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Fault { code: i64, message: String },
}

impl Response {
    /// Convert a fault into [`RemoteError::Fault`].
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self {
            Response::Success(value) => Ok(value),
            Response::Fault { code, message } => Err(RemoteError::Fault { code, message }),
        }
    }
}

/// Malformed or unexpected response documents.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unexpected element <{found}>, expected {expected}")]
    Unexpected { found: String, expected: &'static str },

    #[error("missing <{0}> element")]
    Missing(&'static str),

    #[error("invalid {kind} value '{text}'")]
    InvalidScalar { kind: &'static str, text: String },

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl From<CodecError> for RemoteError {
    fn from(err: CodecError) -> Self {
        RemoteError::Protocol(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Render a `<methodCall>` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");
    out
}

fn encode_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => out.push_str(&format!("<int>{i}</int>")),
        Value::Bool(b) => out.push_str(if *b {
            "<boolean>1</boolean>"
        } else {
            "<boolean>0</boolean>"
        }),
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Double(d) => out.push_str(&format!("<double>{d}</double>")),
        Value::DateTime(s) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</dateTime.iso8601>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                encode_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, name: &'static str) -> Result<&Node, CodecError> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .ok_or(CodecError::Missing(name))
    }
}

fn parse_tree(xml: &str) -> Result<Node, CodecError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Node {
                name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                ..Node::default()
            }),
            Event::Empty(e) => {
                let node = Node {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    ..Node::default()
                };
                attach(node, &mut stack, &mut root);
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    attach(node, &mut stack, &mut root);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or(CodecError::Missing("methodResponse"))
}

fn attach(node: Node, stack: &mut [Node], root: &mut Option<Node>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a `<methodResponse>` document into a value or a fault.
pub fn decode_response(xml: &str) -> Result<Response, CodecError> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(CodecError::Unexpected {
            found: root.name,
            expected: "<methodResponse>",
        });
    }

    if let Some(fault) = root.children.iter().find(|c| c.name == "fault") {
        let value = decode_value(fault.child("value")?)?;
        let code = match value.member("faultCode") {
            Some(Value::Int(code)) => *code,
            Some(Value::String(code)) => code.trim().parse().unwrap_or(0),
            _ => 0,
        };
        let message = value
            .member("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(Response::Fault { code, message });
    }

    let params = root.child("params")?;
    match params.children.iter().find(|c| c.name == "param") {
        Some(param) => Ok(Response::Success(decode_value(param.child("value")?)?)),
        // A method with no return value.
        None => Ok(Response::Success(Value::Nil)),
    }
}

fn decode_value(node: &Node) -> Result<Value, CodecError> {
    let Some(typed) = node.children.first() else {
        // Untyped <value>text</value> is a string.
        return Ok(Value::String(node.text.clone()));
    };

    let text = typed.text.trim();
    let value = match typed.name.as_str() {
        "string" => Value::String(typed.text.clone()),
        "int" | "i4" | "i8" => Value::Int(text.parse().map_err(|_| CodecError::InvalidScalar {
            kind: "int",
            text: text.to_string(),
        })?),
        "boolean" => Value::Bool(match text {
            "1" | "true" => true,
            "0" | "false" => false,
            other => {
                return Err(CodecError::InvalidScalar {
                    kind: "boolean",
                    text: other.to_string(),
                })
            }
        }),
        "double" => Value::Double(text.parse().map_err(|_| CodecError::InvalidScalar {
            kind: "double",
            text: text.to_string(),
        })?),
        "dateTime.iso8601" => Value::DateTime(text.to_string()),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            Value::Base64(STANDARD.decode(compact)?)
        }
        "nil" => Value::Nil,
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.child("name")?.text.clone();
                let value = decode_value(member.child("value")?)?;
                members.insert(name, value);
            }
            Value::Struct(members)
        }
        "array" => {
            let data = typed.child("data")?;
            let items = data
                .children
                .iter()
                .filter(|c| c.name == "value")
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(items)
        }
        other => {
            return Err(CodecError::Unexpected {
                found: other.to_string(),
                expected: "an XML-RPC value type",
            })
        }
    };
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
