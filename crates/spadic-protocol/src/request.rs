//! Interpretation of decoded request values.
//!
//! The codec yields untyped JSON values; the functions here turn them into
//! typed commands or reject them with a [`ProtocolError`].

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::errors::ProtocolError;

/// Value held by a single register.
pub type RegisterValue = u64;

/// Register names mapped to their values, ordered by name.
pub type RegisterMap = BTreeMap<String, RegisterValue>;

/// Request accepted by the register services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterCommand {
    /// Store every value of the map.
    Write(RegisterMap),
    /// Report the selected registers.
    Read(RegisterSelection),
}

/// Registers requested by a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterSelection {
    /// Every register held by the store.
    All,
    /// Only the named registers.
    Names(Vec<String>),
}

impl RegisterCommand {
    /// Parses a `[command, payload]` pair.
    ///
    /// The command tag is `"w"` or `"r"` in either case. A write payload maps
    /// names to unsigned integers; a read payload is `"all"` (any case) or a
    /// list of names.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] describing the first shape violation.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Array(items) = value else {
            return Err(ProtocolError::NotAPair {
                found: describe(&value),
            });
        };
        let [command, payload]: [Value; 2] =
            items.try_into().map_err(|rejected: Vec<Value>| ProtocolError::NotAPair {
                found: format!("an array of {} elements", rejected.len()),
            })?;

        let Value::String(tag) = command else {
            return Err(ProtocolError::CommandNotString {
                found: describe(&command),
            });
        };

        match tag.to_ascii_lowercase().as_str() {
            "w" => parse_write(payload).map(Self::Write),
            "r" => parse_selection(payload).map(Self::Read),
            _ => Err(ProtocolError::UnknownCommand { command: tag }),
        }
    }
}

impl RegisterSelection {
    /// Restricts a full register read to this selection.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownRegister`] when a requested name is
    /// absent from `contents`.
    pub fn apply(&self, contents: RegisterMap) -> Result<RegisterMap, ProtocolError> {
        match self {
            Self::All => Ok(contents),
            Self::Names(names) => names
                .iter()
                .map(|name| {
                    contents
                        .get(name)
                        .map(|value| (name.clone(), *value))
                        .ok_or_else(|| ProtocolError::unknown_register(name))
                })
                .collect(),
        }
    }
}

/// Parses the message accepted by the signal service.
///
/// # Errors
///
/// Returns [`ProtocolError::NotANumber`] for anything but a JSON number.
pub fn parse_signal(value: Value) -> Result<Number, ProtocolError> {
    match value {
        Value::Number(number) => Ok(number),
        other => Err(ProtocolError::NotANumber {
            found: describe(&other),
        }),
    }
}

fn parse_write(payload: Value) -> Result<RegisterMap, ProtocolError> {
    let Value::Object(entries) = payload else {
        return Err(ProtocolError::InvalidWritePayload {
            found: describe(&payload),
        });
    };
    entries
        .into_iter()
        .map(|(name, value)| match value.as_u64() {
            Some(register) => Ok((name, register)),
            None => Err(ProtocolError::InvalidRegisterValue { name }),
        })
        .collect()
}

fn parse_selection(payload: Value) -> Result<RegisterSelection, ProtocolError> {
    match payload {
        Value::String(keyword) if keyword.eq_ignore_ascii_case("all") => Ok(RegisterSelection::All),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                other => Err(ProtocolError::InvalidReadPayload {
                    found: format!("a list containing {}", describe(&other)),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(RegisterSelection::Names),
        other => Err(ProtocolError::InvalidReadPayload {
            found: describe(&other),
        }),
    }
}

/// Short human-readable description of a JSON value for error messages.
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(_) => "a boolean".to_owned(),
        Value::Number(_) => "a number".to_owned(),
        Value::String(text) => format!("the string {text:?}"),
        Value::Array(items) => format!("an array of {} elements", items.len()),
        Value::Object(_) => "an object".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn registers(entries: &[(&str, RegisterValue)]) -> RegisterMap {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_owned(), *value))
            .collect()
    }

    #[rstest]
    #[case("w")]
    #[case("W")]
    fn parses_write_in_either_case(#[case] tag: &str) {
        let command = RegisterCommand::from_value(json!([tag, {"x": 5, "y": 7}])).expect("parse");
        assert_eq!(
            command,
            RegisterCommand::Write(registers(&[("x", 5), ("y", 7)]))
        );
    }

    #[rstest]
    #[case(json!(["r", "all"]))]
    #[case(json!(["R", "ALL"]))]
    #[case(json!(["r", "All"]))]
    fn parses_read_all_in_either_case(#[case] value: Value) {
        let command = RegisterCommand::from_value(value).expect("parse");
        assert_eq!(command, RegisterCommand::Read(RegisterSelection::All));
    }

    #[test]
    fn parses_selective_read() {
        let command = RegisterCommand::from_value(json!(["r", ["a", "c"]])).expect("parse");
        assert_eq!(
            command,
            RegisterCommand::Read(RegisterSelection::Names(vec![
                "a".to_owned(),
                "c".to_owned()
            ]))
        );
    }

    #[test]
    fn rejects_unknown_command_tag() {
        let result = RegisterCommand::from_value(json!(["x", "all"]));
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownCommand { command }) if command == "x"
        ));
    }

    #[rstest]
    #[case(json!(42))]
    #[case(json!(["r"]))]
    #[case(json!(["r", "all", "extra"]))]
    fn rejects_values_that_are_not_pairs(#[case] value: Value) {
        let result = RegisterCommand::from_value(value);
        assert!(matches!(result, Err(ProtocolError::NotAPair { .. })));
    }

    #[test]
    fn rejects_non_string_command() {
        let result = RegisterCommand::from_value(json!([1, "all"]));
        assert!(matches!(result, Err(ProtocolError::CommandNotString { .. })));
    }

    #[rstest]
    #[case(json!(["w", ["x"]]))]
    #[case(json!(["w", "all"]))]
    fn rejects_write_without_mapping(#[case] value: Value) {
        let result = RegisterCommand::from_value(value);
        assert!(matches!(result, Err(ProtocolError::InvalidWritePayload { .. })));
    }

    #[rstest]
    #[case(json!(["w", {"x": -1}]))]
    #[case(json!(["w", {"x": 1.5}]))]
    #[case(json!(["w", {"x": "5"}]))]
    fn rejects_non_integer_register_values(#[case] value: Value) {
        let result = RegisterCommand::from_value(value);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidRegisterValue { name }) if name == "x"
        ));
    }

    #[rstest]
    #[case(json!(["r", "some"]))]
    #[case(json!(["r", {"a": 1}]))]
    #[case(json!(["r", ["a", 2]]))]
    fn rejects_malformed_read_payloads(#[case] value: Value) {
        let result = RegisterCommand::from_value(value);
        assert!(matches!(result, Err(ProtocolError::InvalidReadPayload { .. })));
    }

    #[test]
    fn selection_keeps_only_requested_names() {
        let contents = registers(&[("a", 1), ("b", 2), ("c", 3)]);
        let selection = RegisterSelection::Names(vec!["a".to_owned(), "c".to_owned()]);
        let selected = selection.apply(contents).expect("apply selection");
        assert_eq!(selected, registers(&[("a", 1), ("c", 3)]));
    }

    #[test]
    fn selection_rejects_unknown_names() {
        let contents = registers(&[("a", 1)]);
        let selection = RegisterSelection::Names(vec!["missing".to_owned()]);
        let result = selection.apply(contents);
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownRegister { name }) if name == "missing"
        ));
    }

    #[rstest]
    #[case(json!(42), Number::from(42))]
    #[case(json!(0), Number::from(0))]
    fn signal_accepts_numbers(#[case] value: Value, #[case] expected: Number) {
        assert_eq!(parse_signal(value).expect("parse signal"), expected);
    }

    #[rstest]
    #[case(json!("42"))]
    #[case(json!([42]))]
    #[case(json!(null))]
    fn signal_rejects_everything_else(#[case] value: Value) {
        assert!(matches!(
            parse_signal(value),
            Err(ProtocolError::NotANumber { .. })
        ));
    }
}
