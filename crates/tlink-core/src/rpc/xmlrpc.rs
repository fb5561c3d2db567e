//! XML-RPC encoding for the TestLink API.
//!
//! Calls and responses are mapped to and from [`serde_json::Value`], so the
//! client works with one value model whatever the wire format. Every
//! TestLink method takes a single struct parameter.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Number, Value};

use super::RpcError;

type XmlWriter = Writer<Vec<u8>>;

/// Encodes a `methodCall` passing `params` as its only parameter.
pub(crate) fn encode_call(method: &str, params: &Value) -> Result<String, RpcError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    start(&mut writer, "methodCall")?;
    text_element(&mut writer, "methodName", method)?;
    start(&mut writer, "params")?;
    start(&mut writer, "param")?;
    write_value(&mut writer, params)?;
    end(&mut writer, "param")?;
    end(&mut writer, "params")?;
    end(&mut writer, "methodCall")?;

    String::from_utf8(writer.into_inner()).map_err(|e| RpcError::Protocol(e.to_string()))
}

/// Decodes a `methodResponse`. A `fault` becomes [`RpcError::ApiError`].
pub(crate) fn decode_response(body: &str) -> Result<Value, RpcError> {
    let mut parser = Parser::new(body);
    parser.expect_start("methodResponse")?;
    match parser.next()? {
        Event::Start(tag) if tag.name().as_ref() == b"params" => {
            parser.expect_start("param")?;
            parser.next_value()
        }
        Event::Empty(tag) if tag.name().as_ref() == b"params" => Ok(Value::Null),
        Event::Start(tag) if tag.name().as_ref() == b"fault" => Err(fault(parser.next_value()?)),
        other => Err(unexpected("<params> or <fault>", &other)),
    }
}

fn write_value(writer: &mut XmlWriter, value: &Value) -> quick_xml::Result<()> {
    start(writer, "value")?;
    match value {
        Value::Null => text_element(writer, "string", "")?,
        Value::Bool(flag) => text_element(writer, "boolean", if *flag { "1" } else { "0" })?,
        Value::Number(n) if n.is_f64() => text_element(writer, "double", &n.to_string())?,
        Value::Number(n) => text_element(writer, "int", &n.to_string())?,
        Value::String(s) => text_element(writer, "string", s)?,
        Value::Array(items) => {
            start(writer, "array")?;
            start(writer, "data")?;
            for item in items {
                write_value(writer, item)?;
            }
            end(writer, "data")?;
            end(writer, "array")?;
        }
        Value::Object(members) => {
            start(writer, "struct")?;
            for (name, member) in members {
                start(writer, "member")?;
                text_element(writer, "name", name)?;
                write_value(writer, member)?;
                end(writer, "member")?;
            }
            end(writer, "struct")?;
        }
    }
    end(writer, "value")
}

fn start(writer: &mut XmlWriter, tag: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))
}

fn end(writer: &mut XmlWriter, tag: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(tag)))
}

fn text_element(writer: &mut XmlWriter, tag: &str, text: &str) -> quick_xml::Result<()> {
    start(writer, tag)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    end(writer, tag)
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(body: &'a str) -> Self {
        Self {
            reader: Reader::from_str(body),
        }
    }

    /// Next structural event, skipping the declaration, comments and
    /// whitespace between tags.
    fn next(&mut self) -> Result<Event<'a>, RpcError> {
        loop {
            match self.reader.read_event()? {
                Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {}
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => {
                    return Err(RpcError::ParseError("unexpected end of response".to_string()))
                }
                event => return Ok(event),
            }
        }
    }

    fn expect_start(&mut self, tag: &str) -> Result<(), RpcError> {
        match self.next()? {
            Event::Start(start) if start.name().as_ref() == tag.as_bytes() => Ok(()),
            other => Err(unexpected(&format!("<{tag}>"), &other)),
        }
    }

    fn expect_end(&mut self, tag: &str) -> Result<(), RpcError> {
        match self.next()? {
            Event::End(end) if end.name().as_ref() == tag.as_bytes() => Ok(()),
            other => Err(unexpected(&format!("</{tag}>"), &other)),
        }
    }

    /// A whole `<value>` element, which may be empty.
    fn next_value(&mut self) -> Result<Value, RpcError> {
        match self.next()? {
            Event::Start(start) if start.name().as_ref() == b"value" => self.value(),
            Event::Empty(empty) if empty.name().as_ref() == b"value" => {
                Ok(Value::String(String::new()))
            }
            other => Err(unexpected("<value>", &other)),
        }
    }

    /// Content of a `<value>` after its start tag, through its end tag.
    fn value(&mut self) -> Result<Value, RpcError> {
        // An untyped value is a string and keeps its whitespace.
        let mut untyped = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(text) => untyped.push_str(&text.unescape()?),
                Event::CData(data) => untyped.push_str(&String::from_utf8_lossy(&data)),
                Event::End(_) => return Ok(Value::String(untyped)),
                Event::Start(start) => {
                    let value = self.typed(&tag_name(start.name().as_ref()))?;
                    self.expect_end("value")?;
                    return Ok(value);
                }
                Event::Empty(empty) => {
                    let value = empty_value(&tag_name(empty.name().as_ref()))?;
                    self.expect_end("value")?;
                    return Ok(value);
                }
                Event::Comment(_) => {}
                other => return Err(unexpected("a value", &other)),
            }
        }
    }

    /// A typed element after its start tag, through its end tag.
    fn typed(&mut self, tag: &str) -> Result<Value, RpcError> {
        match tag {
            "struct" => self.members(),
            "array" => self.array(),
            _ => {
                let text = self.text()?;
                scalar(tag, text)
            }
        }
    }

    /// Text up to the enclosing end tag.
    fn text(&mut self) -> Result<String, RpcError> {
        let mut content = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(text) => content.push_str(&text.unescape()?),
                Event::CData(data) => content.push_str(&String::from_utf8_lossy(&data)),
                Event::End(_) => return Ok(content),
                Event::Comment(_) => {}
                other => return Err(unexpected("text", &other)),
            }
        }
    }

    fn members(&mut self) -> Result<Value, RpcError> {
        let mut members = Map::new();
        loop {
            match self.next()? {
                Event::Start(start) if start.name().as_ref() == b"member" => {
                    self.expect_start("name")?;
                    let name = self.text()?;
                    let value = self.next_value()?;
                    self.expect_end("member")?;
                    members.insert(name, value);
                }
                Event::End(_) => return Ok(Value::Object(members)),
                other => return Err(unexpected("<member>", &other)),
            }
        }
    }

    fn array(&mut self) -> Result<Value, RpcError> {
        let mut items = Vec::new();
        match self.next()? {
            Event::Start(data) if data.name().as_ref() == b"data" => loop {
                match self.next()? {
                    Event::Start(start) if start.name().as_ref() == b"value" => {
                        items.push(self.value()?)
                    }
                    Event::Empty(empty) if empty.name().as_ref() == b"value" => {
                        items.push(Value::String(String::new()))
                    }
                    Event::End(_) => break,
                    other => return Err(unexpected("<value>", &other)),
                }
            },
            Event::Empty(data) if data.name().as_ref() == b"data" => {}
            other => return Err(unexpected("<data>", &other)),
        }
        self.expect_end("array")?;
        Ok(Value::Array(items))
    }
}

fn scalar(tag: &str, text: String) -> Result<Value, RpcError> {
    let invalid = || RpcError::ParseError(format!("invalid <{tag}> value: {text:?}"));
    let value = match tag {
        "int" | "i4" | "i8" => Value::from(text.trim().parse::<i64>().map_err(|_| invalid())?),
        "boolean" => Value::Bool(text.trim() == "1"),
        "double" => {
            let n: f64 = text.trim().parse().map_err(|_| invalid())?;
            Number::from_f64(n).map_or(Value::Null, Value::Number)
        }
        "nil" => Value::Null,
        "string" | "dateTime.iso8601" | "base64" => Value::String(text),
        other => {
            return Err(RpcError::ParseError(format!(
                "unsupported XML-RPC type <{other}>"
            )))
        }
    };
    Ok(value)
}

fn empty_value(tag: &str) -> Result<Value, RpcError> {
    match tag {
        "struct" => Ok(Value::Object(Map::new())),
        "array" => Ok(Value::Array(Vec::new())),
        other => scalar(other, String::new()),
    }
}

fn fault(value: Value) -> RpcError {
    let code = match &value["faultCode"] {
        Value::Number(n) => n.as_i64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    };
    let message = value["faultString"].as_str().unwrap_or_default().to_string();
    RpcError::ApiError { code, message }
}

fn tag_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn unexpected(expected: &str, found: &Event<'_>) -> RpcError {
    RpcError::ParseError(format!("expected {expected}, found {found:?}"))
}

/// Encodes `result` as a successful `methodResponse`.
#[cfg(test)]
pub(crate) fn encode_response(result: &Value) -> String {
    let mut writer = Writer::new(Vec::new());
    start(&mut writer, "methodResponse").unwrap();
    start(&mut writer, "params").unwrap();
    start(&mut writer, "param").unwrap();
    write_value(&mut writer, result).unwrap();
    end(&mut writer, "param").unwrap();
    end(&mut writer, "params").unwrap();
    end(&mut writer, "methodResponse").unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
}
