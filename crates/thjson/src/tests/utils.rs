//! Shared test helpers.
//!
//! The parser hands out borrowed payloads, so tests record an owned copy of
//! every event and compare against expected sequences.

use crate::{
    parse_str, CommentKind, Error, IntegerKind, Listener, Result, Scalar, StringKind, Writer,
};

/// An owned copy of a listener callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Ev {
    Begin,
    End,
    BeginObject { key: String, class: String },
    BeginObjectValue { class: String },
    EndObject,
    BeginMap { key: String },
    BeginMapValue,
    EndMap,
    BeginList { key: String, class: String },
    BeginListValue { class: String },
    EndList,
    BeginArray { key: String },
    BeginArrayValue,
    EndArray,
    Property { key: String, value: Val },
    NullProperty { key: String },
    Value { value: Val },
    NullValue,
    Comment { text: String, kind: CommentKind },
    Directive { text: String },
}

/// An owned [`Scalar`].
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Bool(bool),
    Int(i32, IntegerKind),
    Float(f32),
    Str(String, StringKind),
    Bytes(Vec<u8>, StringKind),
}

impl Val {
    pub fn of(scalar: Scalar<'_>) -> Self {
        match scalar {
            Scalar::Bool(b) => Val::Bool(b),
            Scalar::Int(v, kind) => Val::Int(v, kind),
            Scalar::Float(v) => Val::Float(v),
            Scalar::Str(s, kind) => Val::Str(s.to_string(), kind),
            Scalar::Bytes(b, kind) => Val::Bytes(b.to_vec(), kind),
        }
    }
}

/// Shorthand constructors keep expected-event lists readable.
pub fn int(v: i32) -> Val {
    Val::Int(v, IntegerKind::Plain)
}

pub fn string(s: &str) -> Val {
    Val::Str(s.to_string(), StringKind::SingleLine)
}

pub fn multiline(s: &str) -> Val {
    Val::Str(s.to_string(), StringKind::MultiLine)
}

pub fn prop(key: &str, value: Val) -> Ev {
    Ev::Property {
        key: key.to_string(),
        value,
    }
}

pub fn val(value: Val) -> Ev {
    Ev::Value { value }
}

/// Records every event, plus the positions reported alongside them.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Ev>,
    pub positions: Vec<(u32, u32)>,
}

impl Listener for Recorder {
    fn begin(&mut self) -> Result<()> {
        self.events.push(Ev::Begin);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.events.push(Ev::End);
        Ok(())
    }

    fn begin_object(&mut self, key: &str, class: &str) -> Result<()> {
        self.events.push(Ev::BeginObject {
            key: key.to_string(),
            class: class.to_string(),
        });
        Ok(())
    }

    fn begin_object_value(&mut self, class: &str) -> Result<()> {
        self.events.push(Ev::BeginObjectValue {
            class: class.to_string(),
        });
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        self.events.push(Ev::EndObject);
        Ok(())
    }

    fn begin_map(&mut self, key: &str) -> Result<()> {
        self.events.push(Ev::BeginMap {
            key: key.to_string(),
        });
        Ok(())
    }

    fn begin_map_value(&mut self) -> Result<()> {
        self.events.push(Ev::BeginMapValue);
        Ok(())
    }

    fn end_map(&mut self) -> Result<()> {
        self.events.push(Ev::EndMap);
        Ok(())
    }

    fn begin_list(&mut self, key: &str, class: &str) -> Result<()> {
        self.events.push(Ev::BeginList {
            key: key.to_string(),
            class: class.to_string(),
        });
        Ok(())
    }

    fn begin_list_value(&mut self, class: &str) -> Result<()> {
        self.events.push(Ev::BeginListValue {
            class: class.to_string(),
        });
        Ok(())
    }

    fn end_list(&mut self) -> Result<()> {
        self.events.push(Ev::EndList);
        Ok(())
    }

    fn begin_array(&mut self, key: &str) -> Result<()> {
        self.events.push(Ev::BeginArray {
            key: key.to_string(),
        });
        Ok(())
    }

    fn begin_array_value(&mut self) -> Result<()> {
        self.events.push(Ev::BeginArrayValue);
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        self.events.push(Ev::EndArray);
        Ok(())
    }

    fn property(&mut self, key: &str, value: Scalar<'_>) -> Result<()> {
        self.events.push(Ev::Property {
            key: key.to_string(),
            value: Val::of(value),
        });
        Ok(())
    }

    fn null_property(&mut self, key: &str) -> Result<()> {
        self.events.push(Ev::NullProperty {
            key: key.to_string(),
        });
        Ok(())
    }

    fn value(&mut self, value: Scalar<'_>) -> Result<()> {
        self.events.push(Ev::Value {
            value: Val::of(value),
        });
        Ok(())
    }

    fn null_value(&mut self) -> Result<()> {
        self.events.push(Ev::NullValue);
        Ok(())
    }

    fn comment(&mut self, text: &str, kind: CommentKind) -> Result<()> {
        self.events.push(Ev::Comment {
            text: text.to_string(),
            kind,
        });
        Ok(())
    }

    fn directive(&mut self, text: &str) -> Result<()> {
        self.events.push(Ev::Directive {
            text: text.to_string(),
        });
        Ok(())
    }

    fn position(&mut self, line: u32, column: u32) -> Result<()> {
        self.positions.push((line, column));
        Ok(())
    }
}

/// Parses `doc` and returns the recorded events.
pub fn events(doc: &str) -> Vec<Ev> {
    let mut recorder = Recorder::default();
    parse_str(doc, &mut recorder).unwrap_or_else(|e| panic!("parse failed: {e}\ninput: {doc:?}"));
    recorder.events
}

/// Parses `doc`, which must fail, and returns the error.
pub fn parse_err(doc: &str) -> Error {
    let mut recorder = Recorder::default();
    match parse_str(doc, &mut recorder) {
        Ok(()) => panic!("expected a parse error\ninput: {doc:?}"),
        Err(e) => e,
    }
}

/// Replays recorded events into a writer, returning the produced text.
pub fn replay(events: &[Ev], writer: &mut Writer) {
    for ev in events {
        match ev {
            Ev::Begin => writer.begin().unwrap(),
            Ev::End => writer.end().unwrap(),
            Ev::BeginObject { key, class } => writer.begin_object(key, class).unwrap(),
            Ev::BeginObjectValue { class } => writer.begin_object_value(class).unwrap(),
            Ev::EndObject => writer.end_object().unwrap(),
            Ev::BeginMap { key } => writer.begin_map(key).unwrap(),
            Ev::BeginMapValue => writer.begin_map_value().unwrap(),
            Ev::EndMap => writer.end_map().unwrap(),
            Ev::BeginList { key, class } => writer.begin_list(key, class).unwrap(),
            Ev::BeginListValue { class } => writer.begin_list_value(class).unwrap(),
            Ev::EndList => writer.end_list().unwrap(),
            Ev::BeginArray { key } => writer.begin_array(key).unwrap(),
            Ev::BeginArrayValue => writer.begin_array_value().unwrap(),
            Ev::EndArray => writer.end_array().unwrap(),
            Ev::Property { key, value } => writer.property(key, value.as_scalar()).unwrap(),
            Ev::NullProperty { key } => writer.null_property(key).unwrap(),
            Ev::Value { value } => writer.value(value.as_scalar()).unwrap(),
            Ev::NullValue => writer.null_value().unwrap(),
            Ev::Comment { text, kind } => writer.comment(text, *kind).unwrap(),
            Ev::Directive { text } => writer.directive(text).unwrap(),
        }
    }
}

impl Val {
    pub fn as_scalar(&self) -> Scalar<'_> {
        match self {
            Val::Bool(b) => Scalar::Bool(*b),
            Val::Int(v, kind) => Scalar::Int(*v, *kind),
            Val::Float(v) => Scalar::Float(*v),
            Val::Str(s, kind) => Scalar::Str(s, *kind),
            Val::Bytes(b, kind) => Scalar::Bytes(b, *kind),
        }
    }
}
