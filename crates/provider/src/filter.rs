//! MongoDB-style `where`-clause matching.
//!
//! Per §1/§6, the natural-language query layer is out of scope except for
//! this one non-trivial behavior: applying a Mongo-shaped filter document
//! against a record. `list`/`find` opts carry a `where` value of this
//! shape; [`matches`] is what the in-memory provider (and any real adapter)
//! uses to implement it.

use serde_json::Value;

use crate::record::Record;

/// Does `record` satisfy `where_clause`?
///
/// An object with multiple keys is an implicit AND. A key whose value is
/// itself an object of operator keys (`$eq`, `$ne`, `$gt`, `$gte`, `$lt`,
/// `$lte`, `$in`, `$nin`, `$exists`) applies those operators to the field;
/// any other value is shorthand for `$eq`. `$and`/`$or` combine
/// sub-clauses explicitly.
pub fn matches(record: &Record, where_clause: &Value) -> bool {
    let Value::Object(map) = where_clause else {
        return true;
    };

    for (key, expected) in map {
        let ok = match key.as_str() {
            "$and" => expected
                .as_array()
                .map(|clauses| clauses.iter().all(|c| matches(record, c)))
                .unwrap_or(true),
            "$or" => expected
                .as_array()
                .map(|clauses| clauses.iter().any(|c| matches(record, c)))
                .unwrap_or(false),
            field => {
                let actual = record.get(field);
                match_field(actual, expected)
            }
        };
        if !ok {
            return false;
        }
    }
    true
}

fn match_field(actual: Option<&Value>, expected: &Value) -> bool {
    match expected {
        Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) => {
            ops.iter().all(|(op, operand)| match_op(actual, op, operand))
        }
        // Real Mongo semantics: {field: scalar} against an array-valued
        // field matches when any element equals the scalar — needed by
        // the hydrator's backward-relation lookups (`where: {backref: id}`
        // against a forward array field storing a list of ids).
        _ => match actual {
            Some(Value::Array(items)) => items.contains(expected),
            other => other == Some(expected),
        },
    }
}

fn match_op(actual: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$eq" => actual == Some(operand),
        "$ne" => actual != Some(operand),
        "$exists" => actual.is_some() == operand.as_bool().unwrap_or(true),
        "$in" => operand
            .as_array()
            .map(|arr| actual.map(|a| arr.contains(a)).unwrap_or(false))
            .unwrap_or(false),
        "$nin" => operand
            .as_array()
            .map(|arr| actual.map(|a| !arr.contains(a)).unwrap_or(true))
            .unwrap_or(true),
        "$gt" | "$gte" | "$lt" | "$lte" => compare_numeric(actual, operand, op),
        _ => false,
    }
}

fn compare_numeric(actual: Option<&Value>, operand: &Value, op: &str) -> bool {
    let (Some(a), Some(b)) = (actual.and_then(Value::as_f64), operand.as_f64()) else {
        return false;
    };
    match op {
        "$gt" => a > b,
        "$gte" => a >= b,
        "$lt" => a < b,
        "$lte" => a <= b,
        _ => false,
    }
}
