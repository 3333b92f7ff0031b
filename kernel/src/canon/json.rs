//! Canonical JSON for the kernel (spec.md §4.1).
//!
//! This is the most fork-prone layer of the kernel: any serialization
//! divergence between two replays of the same event log produces a
//! different state hash. Loosely modeled on RFC 8785 (JCS), with the
//! kernel's own additional constraints layered on top.
//!
//! # Rules (frozen)
//!
//! 1. Object keys MUST be sorted by byte-order of their canonical UTF-8
//!    representation.
//! 2. Object keys MUST match `^[a-z][a-z0-9_]*$` (lowercase ASCII, no
//!    leading digit/underscore).
//! 3. Duplicate keys are FORBIDDEN → `KernelError::BadSchema`.
//! 4. JSON number literals are FORBIDDEN → `KernelError::BadSchema`. All
//!    numeric values MUST be encoded as JSON strings matching
//!    `^-?(0|[1-9][0-9]*)$` (no leading zeros, no decimal, no exponent;
//!    a leading `-` is permitted for signed fixed-point values).
//! 5. Maximum nesting depth: `MAX_DEPTH` (32).
//! 6. Maximum fields per object: `MAX_OBJECT_FIELDS` (64).
//! 7. Maximum items per array: `MAX_ARRAY_ITEMS` (4096).
//! 8. Maximum input size: `MAX_INPUT_BYTES` (1 MiB).
//! 9. BOM is rejected. Trailing content after the root value is rejected.
//! 10. Raw control characters (U+0000..U+001F) in string values are rejected.
//!
//! # Architecture
//!
//! `canonicalize(input)` → `Result<Vec<u8>, KernelError>`. Internally: parse
//! (hand-written recursive-descent parser → `Value` tree, validating all
//! constraints during parse), then emit (deterministic byte emitter with
//! sorted object keys). This same parser decodes both incoming event
//! envelopes (spec.md §6) and the kernel's own canonical state bytes
//! (spec.md §4.1) — one constitutional parser, not two.

use crate::error::KernelError;

pub const MAX_DEPTH: usize = 32;
pub const MAX_OBJECT_FIELDS: usize = 64;
pub const MAX_ARRAY_ITEMS: usize = 4_096;
pub const MAX_INPUT_BYTES: usize = 1_048_576;

fn bad_schema(detail: impl Into<String>) -> KernelError {
    KernelError::BadSchema { detail: detail.into() }
}

/// A parsed JSON value. Number literals are absent — they are forbidden;
/// numeric content always arrives as `Str`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Str(String),
    Array(Vec<Value>),
    /// `(key, value)` pairs in insertion order; the emitter sorts them.
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Look up a field by key in an object value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn object(pairs: Vec<(&str, Value)>) -> Value {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a [u8]) -> Self {
        Parser { src, pos: 0, depth: 0 }
    }

    #[inline(always)]
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    #[inline(always)]
    fn advance(&mut self) -> Option<u8> {
        let b = self.src.get(self.pos).copied();
        self.pos += 1;
        b
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), KernelError> {
        match self.advance() {
            Some(b) if b == expected => Ok(()),
            _ => Err(bad_schema(format!("expected '{}' at byte {}", expected as char, self.pos))),
        }
    }

    fn parse_value(&mut self) -> Result<Value, KernelError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'"') => self.parse_string().map(Value::Str),
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b't') if self.src.get(self.pos..self.pos + 4) == Some(b"true") => {
                self.pos += 4;
                Ok(Value::Bool(true))
            }
            Some(b'f') if self.src.get(self.pos..self.pos + 5) == Some(b"false") => {
                self.pos += 5;
                Ok(Value::Bool(false))
            }
            Some(b'n') if self.src.get(self.pos..self.pos + 4) == Some(b"null") => {
                self.pos += 4;
                Ok(Value::Null)
            }
            // JSON number literals: forbidden. Numbers travel as strings.
            Some(b'0'..=b'9') | Some(b'-') => {
                Err(bad_schema("JSON number literals are forbidden; use a string"))
            }
            other => Err(bad_schema(format!("unexpected token at byte {}: {:?}", self.pos, other))),
        }
    }

    fn parse_string(&mut self) -> Result<String, KernelError> {
        self.expect(b'"')?;
        let mut out: Vec<u8> = Vec::new();
        loop {
            match self.advance() {
                None => return Err(bad_schema("unterminated string")),
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b'"') => out.push(b'"'),
                    Some(b'\\') => out.push(b'\\'),
                    Some(b'/') => out.push(b'/'),
                    Some(b'b') => out.push(0x08),
                    Some(b'f') => out.push(0x0C),
                    Some(b'n') => out.push(b'\n'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'u') => {
                        let hex = self
                            .src
                            .get(self.pos..self.pos + 4)
                            .ok_or_else(|| bad_schema("truncated \\u escape"))?;
                        let s = std::str::from_utf8(hex).map_err(|_| bad_schema("bad \\u escape"))?;
                        let codepoint =
                            u32::from_str_radix(s, 16).map_err(|_| bad_schema("bad \\u escape"))?;
                        self.pos += 4;
                        let ch = char::from_u32(codepoint).ok_or_else(|| bad_schema("bad \\u escape"))?;
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                    }
                    _ => return Err(bad_schema("bad escape sequence")),
                },
                Some(b) => {
                    if b < 0x20 {
                        return Err(bad_schema("raw control character in string"));
                    }
                    out.push(b);
                }
            }
        }
        String::from_utf8(out).map_err(|_| bad_schema("string is not valid UTF-8"))
    }

    fn parse_object(&mut self) -> Result<Value, KernelError> {
        self.expect(b'{')?;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(bad_schema("max nesting depth exceeded"));
        }

        let mut pairs: Vec<(String, Value)> = Vec::new();
        self.skip_whitespace();

        if self.peek() == Some(b'}') {
            self.advance();
            self.depth -= 1;
            return Ok(Value::Object(pairs));
        }

        loop {
            if pairs.len() >= MAX_OBJECT_FIELDS {
                return Err(bad_schema("max object fields exceeded"));
            }
            self.skip_whitespace();
            let key = self.parse_string()?;

            if key.is_empty() {
                return Err(bad_schema("empty object key"));
            }
            let kb = key.as_bytes();
            if !matches!(kb[0], b'a'..=b'z') {
                return Err(bad_schema(format!("key '{key}' must start with a-z")));
            }
            for &b in &kb[1..] {
                if !matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_') {
                    return Err(bad_schema(format!("key '{key}' has invalid character")));
                }
            }
            if pairs.iter().any(|(k, _)| k == &key) {
                return Err(bad_schema(format!("duplicate key '{key}'")));
            }

            self.skip_whitespace();
            self.expect(b':')?;
            self.skip_whitespace();
            let value = self.parse_value()?;
            pairs.push((key, value));
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => {
                    self.advance();
                }
                Some(b'}') => {
                    self.advance();
                    break;
                }
                _ => return Err(bad_schema("expected ',' or '}' in object")),
            }
        }

        self.depth -= 1;
        Ok(Value::Object(pairs))
    }

    fn parse_array(&mut self) -> Result<Value, KernelError> {
        self.expect(b'[')?;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(bad_schema("max nesting depth exceeded"));
        }

        let mut items: Vec<Value> = Vec::new();
        self.skip_whitespace();

        if self.peek() == Some(b']') {
            self.advance();
            self.depth -= 1;
            return Ok(Value::Array(items));
        }

        loop {
            if items.len() >= MAX_ARRAY_ITEMS {
                return Err(bad_schema("max array items exceeded"));
            }
            self.skip_whitespace();
            items.push(self.parse_value()?);
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => {
                    self.advance();
                }
                Some(b']') => {
                    self.advance();
                    break;
                }
                _ => return Err(bad_schema("expected ',' or ']' in array")),
            }
        }

        self.depth -= 1;
        Ok(Value::Array(items))
    }
}

const HEX_LOWER: [u8; 16] = *b"0123456789abcdef";

fn emit_string_content(s: &str, out: &mut Vec<u8>) {
    for &b in s.as_bytes() {
        match b {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0C => out.extend_from_slice(b"\\f"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x00..=0x1F => {
                out.extend_from_slice(b"\\u00");
                out.push(HEX_LOWER[(b >> 4) as usize]);
                out.push(HEX_LOWER[(b & 0xF) as usize]);
            }
            _ => out.push(b),
        }
    }
}

fn emit(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Str(s) => {
            out.push(b'"');
            emit_string_content(s, out);
            out.push(b'"');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                emit(item, out);
            }
            out.push(b']');
        }
        Value::Object(pairs) => {
            let mut indices: Vec<usize> = (0..pairs.len()).collect();
            indices.sort_by(|&a, &b| pairs[a].0.cmp(&pairs[b].0));
            out.push(b'{');
            for (i, &idx) in indices.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                let (key, val) = &pairs[idx];
                out.push(b'"');
                emit_string_content(key, out);
                out.push(b'"');
                out.push(b':');
                emit(val, out);
            }
            out.push(b'}');
        }
    }
}

/// Parse `input` into a `Value` tree, enforcing every grammar rule above.
pub fn parse(input: &[u8]) -> Result<Value, KernelError> {
    if input.len() > MAX_INPUT_BYTES {
        return Err(bad_schema("input exceeds max size"));
    }
    if input.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Err(bad_schema("BOM is forbidden"));
    }
    let mut parser = Parser::new(input);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos != parser.src.len() {
        return Err(bad_schema("trailing content after root value"));
    }
    Ok(value)
}

/// Serialize a `Value` into canonical bytes (sorted keys, no whitespace).
pub fn serialize(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    emit(value, &mut out);
    out
}

/// Canonicalize raw JSON bytes: parse, then re-emit in canonical form.
pub fn canonicalize(input: &[u8]) -> Result<Vec<u8>, KernelError> {
    let value = parse(input)?;
    Ok(serialize(&value))
}

/// Validate that an object value contains exactly the set of `allowed_keys`
/// — no extras, none missing.
pub fn validate_schema(value: &Value, allowed_keys: &[&str]) -> Result<(), KernelError> {
    let pairs = value.as_object().ok_or_else(|| bad_schema("expected a JSON object"))?;
    for (key, _) in pairs {
        if !allowed_keys.contains(&key.as_str()) {
            return Err(bad_schema(format!("unknown field '{key}'")));
        }
    }
    for &expected in allowed_keys {
        if !pairs.iter().any(|(k, _)| k == expected) {
            return Err(bad_schema(format!("missing required field '{expected}'")));
        }
    }
    Ok(())
}

/// Validate that an object contains every key in `required_keys`, at most
/// the keys in `required_keys ∪ optional_keys`, and nothing else.
pub fn validate_schema_partial(
    value: &Value,
    required_keys: &[&str],
    optional_keys: &[&str],
) -> Result<(), KernelError> {
    let pairs = value.as_object().ok_or_else(|| bad_schema("expected a JSON object"))?;
    for (key, _) in pairs {
        if !required_keys.contains(&key.as_str()) && !optional_keys.contains(&key.as_str()) {
            return Err(bad_schema(format!("unknown field '{key}'")));
        }
    }
    for &expected in required_keys {
        if !pairs.iter().any(|(k, _)| k == expected) {
            return Err(bad_schema(format!("missing required field '{expected}'")));
        }
    }
    Ok(())
}

/// Validate the numeric-string grammar: `^-?(0|[1-9][0-9]*)$`.
pub fn validate_numeric_string(s: &str) -> Result<(), KernelError> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() {
        return Err(bad_schema("empty numeric string"));
    }
    if digits == "0" {
        return if s == "0" {
            Ok(())
        } else {
            Err(bad_schema("negative zero is forbidden"))
        };
    }
    if !matches!(digits.as_bytes()[0], b'1'..=b'9') {
        return Err(bad_schema("numeric string has a leading zero"));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_schema("numeric string has a non-digit character"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_canonical() {
        assert_eq!(canonicalize(b"{}").unwrap(), b"{}");
    }

    #[test]
    fn scrambled_object_sorts_keys() {
        let input = br#"{"b":"2","a":"1"}"#;
        assert_eq!(canonicalize(input).unwrap(), br#"{"a":"1","b":"2"}"#);
    }

    #[test]
    fn three_key_sort_is_lexicographic() {
        let input = br#"{"epoch":"3","bond":"2","amount":"1"}"#;
        assert_eq!(
            canonicalize(input).unwrap(),
            br#"{"amount":"1","bond":"2","epoch":"3"}"#
        );
    }

    #[test]
    fn whitespace_in_input_is_stripped() {
        let input = b"{ \"z\" : \"1\" , \"a\" : \"2\" }";
        assert_eq!(canonicalize(input).unwrap(), br#"{"a":"2","z":"1"}"#);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let input = br#"{"a":"1","a":"2"}"#;
        assert!(matches!(canonicalize(input), Err(KernelError::BadSchema { .. })));
    }

    #[test]
    fn duplicate_key_at_depth_is_rejected() {
        let input = br#"{"outer":{"x":"1","x":"2"}}"#;
        assert!(canonicalize(input).is_err());
    }

    #[test]
    fn json_number_literal_is_rejected() {
        assert!(canonicalize(br#"{"amount":1000}"#).is_err());
    }

    #[test]
    fn negative_number_literal_is_rejected() {
        assert!(canonicalize(br#"{"x":-1}"#).is_err());
    }

    #[test]
    fn float_literal_is_rejected() {
        assert!(canonicalize(br#"{"x":1.5}"#).is_err());
    }

    #[test]
    fn unknown_field_is_rejected_by_schema_validator() {
        let v = parse(br#"{"allowed":"1","rogue":"2"}"#).unwrap();
        assert!(validate_schema(&v, &["allowed"]).is_err());
    }

    #[test]
    fn missing_required_field_rejected_by_schema_validator() {
        let v = parse(br#"{"a":"1"}"#).unwrap();
        assert!(validate_schema(&v, &["a", "b"]).is_err());
    }

    #[test]
    fn exact_schema_match_passes() {
        let v = parse(br#"{"b":"2","a":"1"}"#).unwrap();
        assert!(validate_schema(&v, &["a", "b"]).is_ok());
    }

    #[test]
    fn uppercase_key_is_rejected() {
        assert!(canonicalize(br#"{"A":"1"}"#).is_err());
    }

    #[test]
    fn key_with_leading_digit_is_rejected() {
        assert!(canonicalize(br#"{"1key":"1"}"#).is_err());
    }

    #[test]
    fn key_with_leading_underscore_is_rejected() {
        assert!(canonicalize(br#"{"_key":"1"}"#).is_err());
    }

    #[test]
    fn numeric_string_zero_is_valid() {
        assert!(validate_numeric_string("0").is_ok());
    }

    #[test]
    fn numeric_string_negative_is_valid() {
        assert!(validate_numeric_string("-42").is_ok());
    }

    #[test]
    fn numeric_string_leading_zero_rejected() {
        assert!(validate_numeric_string("01").is_err());
    }

    #[test]
    fn numeric_string_negative_zero_rejected() {
        assert!(validate_numeric_string("-0").is_err());
    }

    #[test]
    fn numeric_string_decimal_rejected() {
        assert!(validate_numeric_string("1.5").is_err());
    }

    #[test]
    fn nesting_beyond_max_depth_rejected() {
        let mut s: Vec<u8> = Vec::new();
        for _ in 0..MAX_DEPTH + 1 {
            s.extend_from_slice(br#"{"a":"#);
        }
        s.extend_from_slice(b"\"v\"");
        for _ in 0..MAX_DEPTH + 1 {
            s.push(b'}');
        }
        assert!(canonicalize(&s).is_err());
    }

    #[test]
    fn object_at_max_depth_is_accepted() {
        let mut s: Vec<u8> = Vec::new();
        for _ in 0..MAX_DEPTH - 1 {
            s.extend_from_slice(br#"{"a":"#);
        }
        s.extend_from_slice(b"\"v\"");
        for _ in 0..MAX_DEPTH - 1 {
            s.push(b'}');
        }
        assert!(canonicalize(&s).is_ok());
    }

    #[test]
    fn raw_control_char_in_string_is_rejected() {
        let input = b"\"hello\nworld\"";
        assert!(canonicalize(input).is_err());
    }

    #[test]
    fn escaped_newline_is_preserved_in_canonical_form() {
        let input = br#""hello\nworld""#;
        assert_eq!(canonicalize(input).unwrap(), br#""hello\nworld""#);
    }

    #[test]
    fn trailing_content_is_rejected() {
        assert!(canonicalize(b"{}{}").is_err());
        assert!(canonicalize(b"\"x\" garbage").is_err());
    }

    #[test]
    fn bom_is_rejected() {
        assert!(canonicalize(b"\xEF\xBB\xBF{}").is_err());
    }

    #[test]
    fn nested_object_with_scrambled_keys_at_each_level() {
        let input = br#"{"outer_z":{"b":"2","a":"1"},"outer_a":{"y":"9","x":"8"}}"#;
        assert_eq!(
            canonicalize(input).unwrap(),
            br#"{"outer_a":{"x":"8","y":"9"},"outer_z":{"a":"1","b":"2"}}"#
        );
    }

    #[test]
    fn partial_schema_allows_missing_optional_field() {
        let v = parse(br#"{"a":"1"}"#).unwrap();
        assert!(validate_schema_partial(&v, &["a"], &["b"]).is_ok());
    }

    #[test]
    fn partial_schema_rejects_unknown_field() {
        let v = parse(br#"{"a":"1","rogue":"2"}"#).unwrap();
        assert!(validate_schema_partial(&v, &["a"], &["b"]).is_err());
    }

    #[test]
    fn partial_schema_rejects_missing_required_field() {
        let v = parse(br#"{"b":"1"}"#).unwrap();
        assert!(validate_schema_partial(&v, &["a"], &["b"]).is_err());
    }

    #[test]
    fn array_preserves_insertion_order() {
        let input = br#"{"items":["b","a","c"]}"#;
        assert_eq!(canonicalize(input).unwrap(), input);
    }
}
