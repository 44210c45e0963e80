//! Integration tests for Value types
//!
//! Tests Value variants, reference discovery, and broken reference handling.

use std::collections::BTreeSet;

use worldkeep_foundation::{EntityId, Value};

fn e(index: u64) -> EntityId {
    EntityId::new(index)
}

// =============================================================================
// Construction and Display
// =============================================================================

#[test]
fn value_conversions() {
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(7_i64).as_int(), Some(7));
    assert_eq!(Value::from("torch").as_str(), Some("torch"));
    assert_eq!(Value::from(e(3)).as_entity(), Some(e(3)));
    assert!(Value::Nil.is_nil());
}

#[test]
fn value_display() {
    let list = Value::List(vec![Value::Int(1), Value::from("a"), Value::Nil]);
    assert_eq!(list.to_string(), "[1 \"a\" nil]");
    assert_eq!(Value::from(e(4)).to_string(), "Entity(4)");
}

// =============================================================================
// References
// =============================================================================

#[test]
fn nested_references_are_discovered() {
    let value = Value::List(vec![
        e(1).into(),
        Value::List(vec![e(2).into(), Value::Int(5)]),
        e(1).into(),
    ]);
    assert_eq!(value.referenced_entities(), BTreeSet::from([e(1), e(2)]));
}

#[test]
fn scalar_values_reference_nothing() {
    assert!(Value::from("e(1)").referenced_entities().is_empty());
    assert!(Value::Float(1.5).referenced_entities().is_empty());
}

#[test]
fn retain_references_nils_rejected_ids() {
    let mut value = Value::List(vec![e(1).into(), Value::List(vec![e(2).into()])]);
    let broken = value.retain_references(&|id| id == e(1));

    assert_eq!(broken, 1);
    assert_eq!(
        value,
        Value::List(vec![e(1).into(), Value::List(vec![Value::Nil])])
    );
}

#[test]
fn retain_references_keeps_everything_when_all_resolve() {
    let mut value = Value::from(e(9));
    assert_eq!(value.retain_references(&|_| true), 0);
    assert_eq!(value.as_entity(), Some(e(9)));
}
