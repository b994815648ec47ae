//! Folding callback events into a snapshot.
//!
//! [`aggregate`] is a pure function of the compiled schema, the ordered
//! events one status command produced, and an object resolver for nested
//! proxy fields. Every declared field starts at its empty value; events are
//! applied strictly in emission order.

use boxwire_types::{CallbackEvent, ObjectId, Value};
use serde::Deserialize;

use crate::error::{ProtocolError, Result};
use crate::proxy::ProxyRef;
use crate::schema::{Coerce, Schema, Slot};
use crate::snapshot::{FieldValue, Snapshot};

/// Turns an identity into a live proxy while decoding object fields.
pub trait ObjectResolver {
    fn resolve(&self, id: ObjectId) -> Result<ProxyRef>;
}

/// Treatment of single-argument events that match no declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unmatched {
    /// Store under the event's key as an extra field.
    #[default]
    Absorb,
    /// Store, and log a warning naming the key.
    Warn,
    /// Discard.
    Drop,
}

pub fn aggregate(
    schema: &Schema,
    events: &[CallbackEvent],
    resolver: &dyn ObjectResolver,
    unmatched: Unmatched,
) -> Result<Snapshot> {
    let mut snap = Snapshot::new(schema.class());
    for f in schema.fields() {
        let empty = match f.slot {
            Slot::Scalar(_) => FieldValue::None,
            Slot::List(_) => FieldValue::List(Vec::new()),
            Slot::Dict { .. } => FieldValue::Dict(Vec::new()),
        };
        snap.init(&f.name, empty);
    }

    for ev in events {
        let key = ev.key();
        let Some(field) = schema.by_wire_key(key) else {
            absorb_unmatched(&mut snap, schema.class(), ev, unmatched);
            continue;
        };
        let ctx = Decoder {
            field: &field.name,
            resolver,
        };
        let Some(slot) = snap.slot_mut(&field.name) else {
            continue;
        };
        match (&field.slot, slot) {
            (Slot::Scalar(c), slot) => *slot = ctx.args(c, &ev.args)?,
            (Slot::List(c), FieldValue::List(items)) => items.push(ctx.args(c, &ev.args)?),
            (Slot::Dict { key, value }, FieldValue::Dict(entries)) => {
                let Some((k, rest)) = ev.args.split_first() else {
                    return Err(ctx.error("keyed event without a key"));
                };
                let k = match ctx.one(key, k)? {
                    FieldValue::Value(v) => v,
                    _ => return Err(ctx.error("dict key did not decode to a plain value")),
                };
                let v = ctx.args(value, rest)?;
                FieldValue::dict_insert(entries, k, v);
            }
            _ => return Err(ctx.error("slot/value shape mismatch")),
        }
    }
    Ok(snap)
}

fn absorb_unmatched(snap: &mut Snapshot, class: &str, ev: &CallbackEvent, policy: Unmatched) {
    match (ev.args.as_slice(), policy) {
        ([_], Unmatched::Drop) | ([], _) => {
            log::trace!(target: "aggregate", "{}: dropped unmatched {}", class, ev.path);
        }
        ([v], policy) => {
            if policy == Unmatched::Warn {
                log::warn!(target: "aggregate", "{}: undeclared status field '{}'", class, ev.key());
            } else {
                log::debug!(target: "aggregate", "{}: absorbed undeclared '{}'", class, ev.key());
            }
            snap.set_extra(ev.key(), v.clone());
        }
        (_, _) => {
            log::trace!(
                target: "aggregate",
                "{}: dropped unmatched {} with {} args",
                class,
                ev.path,
                ev.args.len()
            );
        }
    }
}

struct Decoder<'a> {
    field: &'a str,
    resolver: &'a dyn ObjectResolver,
}

impl Decoder<'_> {
    fn error(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::Coerce {
            field: self.field.to_string(),
            reason: reason.into(),
        }
    }

    /// Decode a whole argument list: tuples positionally, a single argument
    /// as a bare value, several untyped arguments as a tuple.
    fn args(&self, c: &Coerce, args: &[Value]) -> Result<FieldValue> {
        match (c, args) {
            (Coerce::Tuple(items), _) => {
                if items.len() != args.len() {
                    return Err(self.error(format!(
                        "expected {} values, got {}",
                        items.len(),
                        args.len()
                    )));
                }
                items
                    .iter()
                    .zip(args)
                    .map(|(c, a)| self.one(c, a))
                    .collect::<Result<Vec<_>>>()
                    .map(FieldValue::Tuple)
            }
            (_, []) => Ok(FieldValue::None),
            (c, [single]) => self.one(c, single),
            (c, many) => many
                .iter()
                .map(|a| self.one(c, a))
                .collect::<Result<Vec<_>>>()
                .map(FieldValue::Tuple),
        }
    }

    fn one(&self, c: &Coerce, v: &Value) -> Result<FieldValue> {
        let mismatch = |want: &str| self.error(format!("expected {}, got {}", want, v));
        Ok(match c {
            Coerce::Any => FieldValue::Value(v.clone()),
            Coerce::Int => match v {
                Value::Int(_) => FieldValue::Value(v.clone()),
                _ => return Err(mismatch("int")),
            },
            Coerce::Float => match v.as_float() {
                Some(f) => FieldValue::Value(Value::Float(f)),
                None => return Err(mismatch("float")),
            },
            Coerce::Str => match v {
                Value::Str(_) => FieldValue::Value(v.clone()),
                _ => return Err(mismatch("string")),
            },
            Coerce::Bool => match v {
                Value::Int(i) => FieldValue::Bool(*i != 0),
                _ => return Err(mismatch("int 0/1")),
            },
            Coerce::Blob => match v {
                Value::Blob(_) => FieldValue::Value(v.clone()),
                _ => return Err(mismatch("blob")),
            },
            Coerce::Uuid => match v.as_uuid() {
                Some(id) => FieldValue::Value(Value::Uuid(id)),
                None => return Err(mismatch("uuid")),
            },
            Coerce::Object(_) => match v.as_uuid() {
                Some(id) if id.is_nil() => FieldValue::None,
                Some(id) => FieldValue::Object(self.resolver.resolve(id)?),
                None => return Err(mismatch("object id")),
            },
            Coerce::Tuple(_) => return Err(self.error("nested tuple")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{compile, field, TypeDecl};

    struct NoObjects;

    impl ObjectResolver for NoObjects {
        fn resolve(&self, id: ObjectId) -> Result<ProxyRef> {
            Err(ProtocolError::UnknownClass {
                id,
                class: String::new(),
            })
        }
    }

    fn ev(path: &str, args: Vec<Value>) -> CallbackEvent {
        CallbackEvent::new(path, args)
    }

    fn schema() -> Schema {
        let decl = vec![
            field("name", TypeDecl::Str),
            field("pos", TypeDecl::Any),
            field("enable", TypeDecl::Bool),
            field("timesig", TypeDecl::Tuple(vec![TypeDecl::Int, TypeDecl::Int])),
            field("points", TypeDecl::list(TypeDecl::Any)),
            field("ranges", TypeDecl::dict(TypeDecl::Str, vec![TypeDecl::Int, TypeDecl::Int]))
                .renamed("range"),
            field("current", TypeDecl::Object("thing")),
        ];
        compile("thing", &decl, &|c| c == "thing").unwrap()
    }

    fn run(events: Vec<CallbackEvent>) -> Result<Snapshot> {
        aggregate(&schema(), &events, &NoObjects, Unmatched::Absorb)
    }

    #[test]
    fn test_fields_start_empty() {
        let snap = run(vec![]).unwrap();
        assert!(snap.get("name").unwrap().is_none());
        assert!(snap.list("points").is_empty());
        assert!(snap.dict("ranges").is_empty());
    }

    #[test]
    fn test_scalar_assignment_and_tuple() {
        let snap = run(vec![
            ev("/name", vec!["lead".into()]),
            ev("/pos", vec![Value::Int(1), Value::Int(2)]),
            ev("/timesig", vec![Value::Int(3), Value::Int(4)]),
        ])
        .unwrap();
        assert_eq!(snap.str("name"), Some("lead"));
        assert_eq!(snap.get("pos"), Some(&FieldValue::from((1, 2))));
        assert_eq!(snap.get("timesig"), Some(&FieldValue::from((3, 4))));
    }

    #[test]
    fn test_later_scalar_overwrites() {
        let snap = run(vec![
            ev("/name", vec!["a".into()]),
            ev("/name", vec!["b".into()]),
        ])
        .unwrap();
        assert_eq!(snap.str("name"), Some("b"));
    }

    #[test]
    fn test_list_accumulates_in_emission_order() {
        let snap = run(vec![
            ev("/point", vec![Value::Int(1), Value::Int(2)]),
            ev("/point", vec![Value::Int(3), Value::Int(4)]),
            ev("/point", vec![Value::Int(5)]),
        ])
        .unwrap();
        assert_eq!(
            snap.list("points"),
            &[
                FieldValue::from((1, 2)),
                FieldValue::from((3, 4)),
                FieldValue::from(5),
            ]
        );
    }

    #[test]
    fn test_dict_inserts_and_overwrites() {
        let snap = run(vec![
            ev("/range", vec!["a".into(), Value::Int(1), Value::Int(2)]),
            ev("/range", vec!["b".into(), Value::Int(3), Value::Int(4)]),
            ev("/range", vec!["a".into(), Value::Int(5), Value::Int(6)]),
        ])
        .unwrap();
        let ranges = snap.get("ranges").unwrap();
        assert_eq!(snap.dict("ranges").len(), 2);
        assert_eq!(ranges.dict_get(&"a".into()), Some(&FieldValue::from((5, 6))));
        assert_eq!(ranges.dict_get(&"b".into()), Some(&FieldValue::from((3, 4))));
    }

    #[test]
    fn test_unrenamed_es_plural_misses_its_events() {
        let decl = vec![field(
            "ranges",
            TypeDecl::dict(TypeDecl::Str, vec![TypeDecl::Int, TypeDecl::Int]),
        )];
        let schema = compile("thing", &decl, &|_| false).unwrap();
        assert_eq!(schema.field("ranges").unwrap().wire_key, "rang");

        let events = vec![ev("/range", vec!["a".into(), Value::Int(1), Value::Int(2)])];
        let snap = aggregate(&schema, &events, &NoObjects, Unmatched::Absorb).unwrap();
        assert!(snap.dict("ranges").is_empty());
    }

    #[test]
    fn test_tuple_debug_lists_each_item() {
        let v = FieldValue::from((5, 6));
        assert_eq!(format!("{:?}", v), "(5, 6)");
    }

    #[test]
    fn test_bool_decodes_from_int() {
        let snap = run(vec![ev("/enable", vec![Value::Int(1)])]).unwrap();
        assert_eq!(snap.bool("enable"), Some(true));
        let snap = run(vec![ev("/enable", vec![Value::Int(0)])]).unwrap();
        assert_eq!(snap.bool("enable"), Some(false));
    }

    #[test]
    fn test_nil_object_id_is_no_object() {
        let snap = run(vec![ev("/current", vec![Value::Uuid(ObjectId::NIL)])]).unwrap();
        assert!(snap.get("current").unwrap().is_none());
    }

    #[test]
    fn test_object_resolution_failure_propagates() {
        let err = run(vec![ev("/current", vec![Value::Uuid(ObjectId::from_u128(5))])]);
        assert!(matches!(err, Err(ProtocolError::UnknownClass { .. })));
    }

    #[test]
    fn test_unmatched_single_arg_is_absorbed() {
        let snap = run(vec![
            ev("/future_field", vec![Value::Int(9)]),
            ev("/future_pair", vec![Value::Int(1), Value::Int(2)]),
        ])
        .unwrap();
        assert_eq!(snap.extra("future_field"), Some(&Value::Int(9)));
        assert_eq!(snap.extra("future_pair"), None);
        assert!(snap.get("future_field").is_none());
    }

    #[test]
    fn test_drop_policy_discards_unmatched() {
        let snap = aggregate(
            &schema(),
            &[ev("/future_field", vec![Value::Int(9)])],
            &NoObjects,
            Unmatched::Drop,
        )
        .unwrap();
        assert_eq!(snap.extra("future_field"), None);
    }

    #[test]
    fn test_tuple_arity_mismatch_is_an_error() {
        let err = run(vec![ev("/timesig", vec![Value::Int(4)])]);
        assert!(matches!(err, Err(ProtocolError::Coerce { .. })));
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let err = run(vec![ev("/name", vec![Value::Int(4)])]);
        assert!(matches!(err, Err(ProtocolError::Coerce { .. })));
    }
}
