//! Wire envelopes for the relay line protocol.
//!
//! Every message on the wire is one JSON object per line, identified by a
//! `type` field. The client emits `register` and `telemetry` envelopes and
//! consumes `command` envelopes.
//!
//! # Wire Format
//!
//! ```text
//! {"type":"register","client_id":"<id>"}\n
//! {"type":"telemetry","client_id":"<id>","data":<object>}\n
//! {"type":"command","command_name":"<name>","parameters":"<string>"}\n
//! ```
//!
//! Outbound envelopes are serde structs, so field order on the wire is
//! fixed; the telemetry payload is a [`RawValue`] and is inserted verbatim.
//!
//! Inbound lines are NOT run through a JSON parser. The envelope shape is
//! flat, so a minimal key scan extracts the few scalar fields the client
//! consumes. The scanner does not handle nested objects or arrays as values
//! of scanned keys, nor escaped quotes inside strings; upgrading it to full
//! JSON fidelity is a protocol change, not a cleanup.

use serde::Serialize;
use serde_json::value::RawValue;

/// A command notification pushed by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, e.g. `"Command_A"`.
    pub name: String,
    /// Free-form parameter string; empty when the relay sent none.
    pub parameters: String,
}

#[derive(Serialize)]
struct RegisterEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    client_id: &'a str,
}

#[derive(Serialize)]
struct TelemetryEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    client_id: &'a str,
    data: &'a RawValue,
}

/// Encode a register envelope, newline-terminated.
pub fn register_line(client_id: &str) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(&RegisterEnvelope {
        kind: "register",
        client_id,
    })?;
    line.push('\n');
    Ok(line)
}

/// Encode a telemetry envelope, newline-terminated.
///
/// `data` is written to the wire verbatim.
pub fn telemetry_line(client_id: &str, data: &RawValue) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(&TelemetryEnvelope {
        kind: "telemetry",
        client_id,
        data,
    })?;
    line.push('\n');
    Ok(line)
}

/// Decode one line into a command, if it is one.
///
/// Returns `None` for anything that should not dispatch: a missing or
/// non-`command` `type`, or a command without a `command_name`. An absent
/// `parameters` field decodes as the empty string.
pub fn decode_command(line: &str) -> Option<Command> {
    if scan_field(line, "type")? != "command" {
        return None;
    }

    let name = scan_field(line, "command_name")?;
    let parameters = scan_field(line, "parameters").unwrap_or("");

    Some(Command {
        name: name.to_owned(),
        parameters: parameters.to_owned(),
    })
}

/// Extract the value of a top-level scalar field.
///
/// Finds `"<key>":`, skips spaces and tabs, then reads either a quoted
/// string (terminated by the next quote) or an unquoted token (terminated
/// by `,`, `}` or newline) with trailing spaces and tabs trimmed.
fn scan_field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("\"{key}\":");
    let start = line.find(&needle)? + needle.len();
    let rest = line[start..].trim_start_matches([' ', '\t']);

    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"')?;
        Some(&quoted[..end])
    } else {
        let end = rest.find([',', '}', '\n']).unwrap_or(rest.len());
        Some(rest[..end].trim_end_matches([' ', '\t']))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn register_line_exact_bytes() {
        let line = register_line("sensor-01").unwrap();
        assert_eq!(line, "{\"type\":\"register\",\"client_id\":\"sensor-01\"}\n");
    }

    #[test]
    fn telemetry_line_exact_bytes() {
        let data = RawValue::from_string("{\"temperature\":25.5}".to_owned()).unwrap();
        let line = telemetry_line("abc", &data).unwrap();
        assert_eq!(
            line,
            "{\"type\":\"telemetry\",\"client_id\":\"abc\",\"data\":{\"temperature\":25.5}}\n"
        );
    }

    #[test]
    fn telemetry_data_inserted_verbatim() {
        // Whatever formatting the caller produced is preserved on the wire.
        let data = RawValue::from_string("{\"a\": 1,  \"b\": [2, 3]}".to_owned()).unwrap();
        let line = telemetry_line("x", &data).unwrap();
        assert_eq!(
            line,
            "{\"type\":\"telemetry\",\"client_id\":\"x\",\"data\":{\"a\": 1,  \"b\": [2, 3]}}\n"
        );
    }

    #[test]
    fn decode_command_with_parameters() {
        let cmd = decode_command(
            r#"{"type":"command","command_name":"Command_A","parameters":"42"}"#,
        )
        .unwrap();
        assert_eq!(cmd.name, "Command_A");
        assert_eq!(cmd.parameters, "42");
    }

    #[test]
    fn decode_command_without_parameters_defaults_to_empty() {
        let cmd = decode_command(r#"{"type":"command","command_name":"reboot"}"#).unwrap();
        assert_eq!(cmd.name, "reboot");
        assert_eq!(cmd.parameters, "");
    }

    #[test]
    fn decode_command_missing_name_does_not_dispatch() {
        assert_eq!(decode_command(r#"{"type":"command","parameters":"42"}"#), None);
    }

    #[test]
    fn decode_non_command_types_do_not_dispatch() {
        assert_eq!(
            decode_command(r#"{"type":"telemetry","client_id":"x","data":{}}"#),
            None
        );
        assert_eq!(decode_command(r#"{"type":"response","status":"ok"}"#), None);
        assert_eq!(decode_command(r#"{"status":"ok"}"#), None);
    }

    #[test]
    fn decode_tolerates_whitespace_after_colon() {
        let cmd = decode_command(
            "{\"type\": \t\"command\",\"command_name\": \"ping\",\"parameters\": \"now\"}",
        )
        .unwrap();
        assert_eq!(cmd.name, "ping");
        assert_eq!(cmd.parameters, "now");
    }

    #[test]
    fn scan_field_reads_unquoted_token() {
        let line = r#"{"type":"command","command_name":"set","parameters":"x","retry": 3 }"#;
        assert_eq!(scan_field(line, "retry"), Some("3"));
    }

    #[test]
    fn scan_field_missing_key() {
        assert_eq!(scan_field(r#"{"type":"command"}"#, "parameters"), None);
    }

    #[test]
    fn decode_garbage_line_is_ignored() {
        assert_eq!(decode_command("not json at all"), None);
        assert_eq!(decode_command(""), None);
    }
}
