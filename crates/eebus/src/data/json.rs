// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON binding for the data engine.
//!
//! The wire form throughout SHIP and SPINE is the "array of singletons"
//! shape: a sequence prints as an ordered array where each present child
//! contributes one `{name: value}` object. Decoding searches the array by
//! element name, encoding emits declaration order, so a round trip yields
//! the unique canonical text.

use serde_json::{json, Map, Value as Json};

use crate::data::cfg::{DataCfg, DataKind};
use crate::data::time::{Date, DateTime, EebusDuration, Time};
use crate::data::value::Value;
use crate::error::{Error, Result};

/// Parse `text` as JSON and bind it to `cfg`.
///
/// Returns `None` when the document carries no element for `cfg`.
pub fn parse(cfg: &DataCfg, text: &str) -> Result<Option<Value>> {
    let root: Json = serde_json::from_str(text).map_err(|_| Error::Parse)?;
    from_json(cfg, &root, true)
}

/// Produce the unique unformatted JSON encoding of a value.
pub fn print(cfg: &DataCfg, value: Option<&Value>) -> Result<String> {
    let mut root = Map::new();
    to_json(cfg, value, &mut JsonSink::Root(&mut root), true)?;
    serde_json::to_string(&Json::Object(root)).map_err(|_| Error::Other("json print"))
}

/// Where an encoded element lands: the root object, or a sequence's array
/// of singletons.
pub enum JsonSink<'a> {
    Root(&'a mut Map<String, Json>),
    Items(&'a mut Vec<Json>),
}

impl JsonSink<'_> {
    fn add(&mut self, name: &str, item: Json) {
        match self {
            JsonSink::Root(map) => {
                map.insert(name.to_owned(), item);
            }
            JsonSink::Items(items) => items.push(json!({ name: item })),
        }
    }
}

/// Find the element named `name`: a member of the root object, or the
/// payload of the singleton carrying that name inside a sequence array.
fn get_item<'j>(json: &'j Json, name: &str, is_root: bool) -> Option<&'j Json> {
    if is_root {
        return json.as_object()?.get(name);
    }

    json.as_array()?
        .iter()
        .find_map(|entry| entry.as_object()?.get(name))
}

/// Consume the element for `cfg` out of `json`, if present.
pub fn from_json(cfg: &DataCfg, json: &Json, is_root: bool) -> Result<Option<Value>> {
    match &cfg.kind {
        DataKind::Stub => Ok(None),
        DataKind::Choice(arms) => choice_from_json(arms, json, is_root),
        DataKind::ChoiceRoot(inner) => from_json(inner, json, is_root),
        _ => match get_item(json, cfg.name, is_root) {
            // No item in the message is fine; the field stays absent.
            None => Ok(None),
            Some(item) => from_json_item(cfg, item).map(Some),
        },
    }
}

fn choice_from_json(arms: &'static [DataCfg], json: &Json, is_root: bool) -> Result<Option<Value>> {
    for (index, arm) in arms.iter().enumerate() {
        if let Some(item) = get_item(json, arm.name, is_root) {
            let payload = if arm.is_stub() {
                None
            } else {
                Some(Box::new(from_json_item(arm, item)?))
            };
            return Ok(Some(Value::Choice {
                arm: index,
                value: payload,
            }));
        }
    }

    Ok(None)
}

/// Bind a specific JSON node to `cfg`.
pub fn from_json_item(cfg: &DataCfg, item: &Json) -> Result<Value> {
    match &cfg.kind {
        DataKind::U8 => unsigned_item(item, u64::from(u8::MAX)),
        DataKind::U16 => unsigned_item(item, u64::from(u16::MAX)),
        DataKind::U32 => unsigned_item(item, u64::from(u32::MAX)),
        DataKind::U64 => unsigned_item(item, u64::MAX),
        DataKind::I8 => signed_item(item, i64::from(i8::MIN), i64::from(i8::MAX)),
        DataKind::I16 => signed_item(item, i64::from(i16::MIN), i64::from(i16::MAX)),
        DataKind::I32 => signed_item(item, i64::from(i32::MIN), i64::from(i32::MAX)),
        DataKind::I64 => signed_item(item, i64::MIN, i64::MAX),
        DataKind::Bool => item.as_bool().map(Value::Bool).ok_or(Error::Parse),
        DataKind::String => item
            .as_str()
            .map(|s| Value::Str(s.to_owned()))
            .ok_or(Error::Parse),
        DataKind::Tag => match item.as_array() {
            Some(entries) if entries.is_empty() => Ok(Value::Tag),
            _ => Err(Error::Parse),
        },
        DataKind::Enum(table) => {
            let name = item.as_str().ok_or(Error::Parse)?;
            table.value_of(name).map(Value::Enum).ok_or(Error::Parse)
        }
        DataKind::Date => Ok(Value::Date(Date::parse(text_item(item)?)?)),
        DataKind::Time => Ok(Value::Time(Time::parse(text_item(item)?)?)),
        DataKind::Duration => Ok(Value::Duration(EebusDuration::parse(text_item(item)?)?)),
        DataKind::DateTime => Ok(Value::DateTime(DateTime::parse(text_item(item)?)?)),
        DataKind::AbsoluteOrRelativeTime => {
            let text = text_item(item)?;
            match EebusDuration::parse(text) {
                Ok(duration) => Ok(Value::Duration(duration)),
                Err(_) => Ok(Value::DateTime(DateTime::parse(text)?)),
            }
        }
        DataKind::Sequence(_) | DataKind::Container(_) => seq_from_json_item(cfg, item),
        DataKind::List(element) => {
            let entries = item.as_array().ok_or(Error::Parse)?;
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                out.push(from_json_item(element, entry)?);
            }
            Ok(Value::List(out))
        }
        DataKind::Choice(_) | DataKind::ChoiceRoot(_) | DataKind::Stub => {
            // Choices are consumed through from_json at their parent.
            Err(Error::Other("choice has no item form"))
        }
    }
}

fn seq_from_json_item(cfg: &DataCfg, item: &Json) -> Result<Value> {
    if !item.is_array() {
        return Err(Error::Parse);
    }

    let children = cfg.children().ok_or(Error::Other("sequence schema"))?;
    let mut slots = Vec::with_capacity(children.len());
    for child in children {
        slots.push(from_json(child, item, false)?);
    }

    Ok(Value::Seq(slots))
}

fn unsigned_item(item: &Json, max: u64) -> Result<Value> {
    let v = item.as_u64().ok_or(Error::Parse)?;
    if v > max {
        return Err(Error::Parse);
    }
    Ok(Value::Unsigned(v))
}

fn signed_item(item: &Json, min: i64, max: i64) -> Result<Value> {
    let v = item.as_i64().ok_or(Error::Parse)?;
    if v < min || v > max {
        return Err(Error::Parse);
    }
    Ok(Value::Signed(v))
}

fn text_item(item: &Json) -> Result<&str> {
    item.as_str().ok_or(Error::Parse)
}

/// Encode the element for `cfg` into `sink`; absent fields emit nothing.
pub fn to_json(
    cfg: &DataCfg,
    value: Option<&Value>,
    sink: &mut JsonSink<'_>,
    is_root: bool,
) -> Result<()> {
    match &cfg.kind {
        DataKind::Stub => Ok(()),
        DataKind::Choice(arms) => choice_to_json(arms, value, sink, is_root),
        DataKind::ChoiceRoot(inner) => to_json(inner, value, sink, is_root),
        _ => {
            if let Some(item) = to_json_item(cfg, value)? {
                sink.add(cfg.name, item);
            }
            Ok(())
        }
    }
}

fn choice_to_json(
    arms: &'static [DataCfg],
    value: Option<&Value>,
    sink: &mut JsonSink<'_>,
    is_root: bool,
) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };

    let Value::Choice { arm, value: payload } = value else {
        return Err(Error::Other("choice value shape"));
    };

    let arm_cfg = arms.get(*arm).ok_or(Error::InputArgumentOutOfRange)?;
    to_json(arm_cfg, payload.as_deref(), sink, is_root)
}

/// Encode a value as a bare JSON node; `None` when the field is absent.
pub fn to_json_item(cfg: &DataCfg, value: Option<&Value>) -> Result<Option<Json>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let item = match (&cfg.kind, value) {
        (
            DataKind::U8 | DataKind::U16 | DataKind::U32 | DataKind::U64,
            Value::Unsigned(v),
        ) => json!(v),
        (
            DataKind::I8 | DataKind::I16 | DataKind::I32 | DataKind::I64,
            Value::Signed(v),
        ) => json!(v),
        (DataKind::Bool, Value::Bool(v)) => json!(v),
        (DataKind::String, Value::Str(v)) => json!(v),
        (DataKind::Tag, Value::Tag) => json!([]),
        (DataKind::Enum(table), Value::Enum(v)) => {
            let name = table
                .name_of(*v)
                .ok_or(Error::InputArgumentOutOfRange)?;
            json!(name)
        }
        (DataKind::Date, Value::Date(v)) => json!(v.to_text()),
        (DataKind::Time, Value::Time(v)) => json!(v.to_text()),
        (DataKind::Duration, Value::Duration(v)) => json!(v.to_text()?),
        (DataKind::DateTime, Value::DateTime(v)) => json!(v.to_text()),
        (DataKind::AbsoluteOrRelativeTime, Value::Duration(v)) => json!(v.to_text()?),
        (DataKind::AbsoluteOrRelativeTime, Value::DateTime(v)) => json!(v.to_text()),
        (DataKind::Sequence(_) | DataKind::Container(_), Value::Seq(slots)) => {
            let children = cfg.children().ok_or(Error::Other("sequence schema"))?;
            let mut items = Vec::new();
            for (child, slot) in children.iter().zip(slots.iter()) {
                to_json(child, slot.as_ref(), &mut JsonSink::Items(&mut items), false)?;
            }
            Json::Array(items)
        }
        (DataKind::List(element), Value::List(entries)) => {
            let mut items = Vec::with_capacity(entries.len());
            for entry in entries {
                if let Some(item) = to_json_item(element, Some(entry))? {
                    items.push(item);
                }
            }
            Json::Array(items)
        }
        _ => return Err(Error::Other("value does not match schema kind")),
    };

    Ok(Some(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cfg::EnumTable;

    static COLOR_TABLE: EnumTable = EnumTable {
        name: "color",
        entries: &[("red", 0), ("green", 1)],
    };

    static ADDRESS_CFG: [DataCfg; 2] = [
        DataCfg::new("street", DataKind::String),
        DataCfg::new("city", DataKind::String),
    ];

    static PERSON_SEQ_CFG: [DataCfg; 4] = [
        DataCfg::new("name", DataKind::String),
        DataCfg::new("age", DataKind::U8),
        DataCfg::new("favorite", DataKind::Enum(&COLOR_TABLE)),
        DataCfg::new("address", DataKind::Sequence(&ADDRESS_CFG)),
    ];

    static PERSON_CFG: DataCfg = DataCfg::new("person", DataKind::Sequence(&PERSON_SEQ_CFG));

    const PERSON_TXT: &str = concat!(
        r#"{"person":[{"name":"John Doe"},{"age":43},{"favorite":"green"},"#,
        r#"{"address":[{"street":"10 Downing Street"},{"city":"London"}]}]}"#
    );

    #[test]
    fn test_parse_print_round_trip() {
        let person = parse(&PERSON_CFG, PERSON_TXT).unwrap();
        assert!(person.is_some());
        assert_eq!(print(&PERSON_CFG, person.as_ref()).unwrap(), PERSON_TXT);
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let person = parse(&PERSON_CFG, r#"{"person":[{"age":43}]}"#)
            .unwrap()
            .unwrap();
        let slots = person.as_seq().unwrap();
        assert!(slots[0].is_none());
        assert_eq!(slots[1].as_ref().unwrap().as_unsigned(), Some(43));
        assert_eq!(
            print(&PERSON_CFG, Some(&person)).unwrap(),
            r#"{"person":[{"age":43}]}"#
        );
    }

    #[test]
    fn test_element_order_is_schema_order() {
        // The wire may carry elements in any order; printing restores
        // declaration order.
        let person = parse(
            &PERSON_CFG,
            r#"{"person":[{"age":43},{"name":"John Doe"}]}"#,
        )
        .unwrap();
        assert_eq!(
            print(&PERSON_CFG, person.as_ref()).unwrap(),
            r#"{"person":[{"name":"John Doe"},{"age":43}]}"#
        );
    }

    #[test]
    fn test_numeric_width_enforced() {
        assert!(parse(&PERSON_CFG, r#"{"person":[{"age":256}]}"#).is_err());
        assert!(parse(&PERSON_CFG, r#"{"person":[{"age":-1}]}"#).is_err());
        assert!(parse(&PERSON_CFG, r#"{"person":[{"age":43}]}"#).is_ok());
    }

    #[test]
    fn test_unknown_enum_name_fails() {
        assert!(parse(&PERSON_CFG, r#"{"person":[{"favorite":"mauve"}]}"#).is_err());
    }

    #[test]
    fn test_tag_round_trip() {
        static FLAGS_SEQ: [DataCfg; 1] = [DataCfg::new("partial", DataKind::Tag)];
        static FLAGS_CFG: DataCfg = DataCfg::new("flags", DataKind::Sequence(&FLAGS_SEQ));

        let set = parse(&FLAGS_CFG, r#"{"flags":[{"partial":[]}]}"#).unwrap();
        assert_eq!(
            print(&FLAGS_CFG, set.as_ref()).unwrap(),
            r#"{"flags":[{"partial":[]}]}"#
        );

        let reset = parse(&FLAGS_CFG, r#"{"flags":[]}"#).unwrap();
        assert_eq!(print(&FLAGS_CFG, reset.as_ref()).unwrap(), r#"{"flags":[]}"#);

        assert!(parse(&FLAGS_CFG, r#"{"flags":[{"partial":[1]}]}"#).is_err());
    }

    #[test]
    fn test_list_of_unsigned() {
        static ENTITY_LIST_ELEMENT: DataCfg = DataCfg::new("", DataKind::U32);
        static ROOT_SEQ: [DataCfg; 1] = [DataCfg::new(
            "entity",
            DataKind::List(&ENTITY_LIST_ELEMENT),
        )];
        static ROOT: DataCfg = DataCfg::new("addr", DataKind::Sequence(&ROOT_SEQ));

        let v = parse(&ROOT, r#"{"addr":[{"entity":[0,1,2]}]}"#).unwrap();
        assert_eq!(
            print(&ROOT, v.as_ref()).unwrap(),
            r#"{"addr":[{"entity":[0,1,2]}]}"#
        );
    }

    #[test]
    fn test_choice_root() {
        static HELLO_SEQ: [DataCfg; 1] = [DataCfg::new("phase", DataKind::String)];
        static ARMS: [DataCfg; 2] = [
            DataCfg::new("connectionHello", DataKind::Sequence(&HELLO_SEQ)),
            DataCfg::new("connectionClose", DataKind::Sequence(&HELLO_SEQ)),
        ];
        static CHOICE: DataCfg = DataCfg::new("", DataKind::Choice(&ARMS));
        static ROOT: DataCfg = DataCfg::new("", DataKind::ChoiceRoot(&CHOICE));

        let v = parse(&ROOT, r#"{"connectionClose":[{"phase":"announce"}]}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(v, Value::Choice { arm: 1, .. }));
        assert_eq!(
            print(&ROOT, Some(&v)).unwrap(),
            r#"{"connectionClose":[{"phase":"announce"}]}"#
        );

        assert_eq!(parse(&ROOT, r#"{"unknownMessage":[]}"#).unwrap(), None);
    }
}
