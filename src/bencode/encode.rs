use bytes::Bytes;

use super::value::Value;

// One unit of pending output on the explicit work stack.
enum Task<'a> {
    Value(&'a Value),
    Key(&'a Bytes),
    End,
}

/// Encodes a value to canonical bencoding.
///
/// The output is deterministic: dictionary keys appear in ascending raw byte
/// order (guaranteed by the `BTreeMap` key ordering) and integers are printed
/// in minimal ASCII form. The encoder drives an explicit work stack instead
/// of recursing, so deeply nested values cannot overflow the call stack.
///
/// # Examples
///
/// ```
/// use lodestone::bencode::{decode, encode};
///
/// let value = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
/// assert_eq!(encode(&value), b"d3:cow3:moo4:spam4:eggse");
/// ```
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    let mut stack = vec![Task::Value(value)];

    while let Some(task) = stack.pop() {
        match task {
            Task::Value(Value::Integer(i)) => {
                out.push(b'i');
                out.extend_from_slice(i.to_string().as_bytes());
                out.push(b'e');
            }
            Task::Value(Value::Bytes(b)) => {
                push_bytes(&mut out, b);
            }
            Task::Value(Value::List(items)) => {
                out.push(b'l');
                stack.push(Task::End);
                for item in items.iter().rev() {
                    stack.push(Task::Value(item));
                }
            }
            Task::Value(Value::Dict(dict)) => {
                out.push(b'd');
                stack.push(Task::End);
                for (key, val) in dict.iter().rev() {
                    stack.push(Task::Value(val));
                    stack.push(Task::Key(key));
                }
            }
            Task::Key(key) => {
                push_bytes(&mut out, key);
            }
            Task::End => {
                out.push(b'e');
            }
        }
    }

    out
}

fn push_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(bytes);
}
