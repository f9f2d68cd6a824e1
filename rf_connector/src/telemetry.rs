use std::collections::HashMap;

use tracing::{event, Level};

use crate::realflightdatamap::FieldTable;
use crate::types::AircraftState;

/// Decodes an `ExchangeData` reply into `state`, one table entry at a time.
///
/// Every field is written: a tag that cannot be found, or whose value does
/// not parse, sets its field to 0.0. Entries that share a tag bind
/// positionally, the n-th entry with a tag takes the n-th occurrence of that
/// tag in the reply. Never fails, whatever the reply looks like.
pub fn decode(reply: &str, table: &FieldTable, state: &mut AircraftState) {
    // per tag, where the next search for that tag starts
    let mut cursors: HashMap<&str, usize> = HashMap::new();
    let mut missing: usize = 0;

    for field in table.fields() {
        let cursor = cursors.entry(field.tag).or_insert(0);

        let value = match extract_value(reply, field.tag, *cursor) {
            Some((value, next)) => {
                *cursor = next;
                value
            }
            None => {
                missing += 1;
                0.0
            }
        };

        *(field.target)(state) = value;
    }

    if missing > 0 {
        event!(
            Level::TRACE,
            "{} of {} telemetry fields not found in reply",
            missing,
            table.len()
        );
    }
}

// finds <tag>value</tag> at or after `from`, returns the parsed value and where the match ended
fn extract_value(reply: &str, tag: &str, from: usize) -> Option<(f64, usize)> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let rest = reply.get(from..)?;
    let start = from + rest.find(&open)? + open.len();
    let end = start + reply[start..].find(&close)?;

    Some((parse_value(&reply[start..end]), end + close.len()))
}

// "true" / "false" map to 1 / 0, anything unparsable to 0
pub fn parse_value(text: &str) -> f64 {
    match text.trim() {
        "true" => 1.0,
        "false" => 0.0,
        other => other.parse::<f64>().unwrap_or(0.0),
    }
}
