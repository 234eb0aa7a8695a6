/// Line terminator used for the wire form of a payload.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// One line of a protocol payload: a field name and a field value.
///
/// The first line of a payload carries the request line (method token plus
/// the rest of the request line as its value); subsequent lines are header
/// fields such as `Host:` with their values. Values are raw bytes because
/// mutation deliberately produces non-UTF-8 content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLine {
    pub name: String,
    pub value: Vec<u8>,
}

impl FieldLine {
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An ordered sequence of field lines, reconstructable to wire format.
///
/// Payloads are immutable once built; mutation and crossover always produce
/// new instances. Reconstruction is lossless for any payload produced by
/// this crate: field names never contain the line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    lines: Vec<FieldLine>,
}

impl Payload {
    pub fn new(lines: Vec<FieldLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[FieldLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Serializes the payload to its wire form: each line is the field name,
    /// a single space, and the value (value-less lines omit the space), with
    /// every line followed by the terminator.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = Vec::new();
        for line in &self.lines {
            wire.extend_from_slice(line.name.as_bytes());
            if !line.value.is_empty() {
                wire.push(b' ');
                wire.extend_from_slice(&line.value);
            }
            wire.extend_from_slice(LINE_TERMINATOR);
        }
        wire
    }

    /// Parses wire-format bytes back into field lines. Empty lines are
    /// skipped; a line without a space becomes a name with an empty value.
    pub fn parse(wire: &[u8]) -> Self {
        let mut lines = Vec::new();
        for raw_line in wire.split(|&b| b == b'\n') {
            let raw_line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
            if raw_line.is_empty() {
                continue;
            }
            match raw_line.iter().position(|&b| b == b' ') {
                Some(space_idx) => {
                    let name = String::from_utf8_lossy(&raw_line[..space_idx]).into_owned();
                    lines.push(FieldLine::new(name, raw_line[space_idx + 1..].to_vec()));
                }
                None => {
                    let name = String::from_utf8_lossy(raw_line).into_owned();
                    lines.push(FieldLine::new(name, Vec::new()));
                }
            }
        }
        Self { lines }
    }

    /// Builds a new payload with the value of one line replaced. Out-of-range
    /// indices return an unchanged clone.
    pub fn with_value(&self, line_index: usize, value: Vec<u8>) -> Self {
        let mut lines = self.lines.clone();
        if let Some(line) = lines.get_mut(line_index) {
            line.value = value;
        }
        Self { lines }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Payload {
        Payload::new(vec![
            FieldLine::new("GET", b"/ HTTP/1.1".to_vec()),
            FieldLine::new("Host:", b"localhost".to_vec()),
            FieldLine::new("Accept:", b"*/*".to_vec()),
        ])
    }

    #[test]
    fn wire_form_uses_crlf_terminators() {
        let wire = sample().to_wire();
        assert_eq!(
            wire,
            b"GET / HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\n".to_vec()
        );
    }

    #[test]
    fn parse_round_trips_wire_form() {
        let payload = sample();
        let reparsed = Payload::parse(&payload.to_wire());
        assert_eq!(payload, reparsed);
    }

    #[test]
    fn empty_value_omits_separator_and_round_trips() {
        let payload = Payload::new(vec![
            FieldLine::new("GET", b"/ HTTP/1.1".to_vec()),
            FieldLine::new("Host:", Vec::new()),
        ]);
        let wire = payload.to_wire();
        assert_eq!(wire, b"GET / HTTP/1.1\r\nHost:\r\n".to_vec());
        assert_eq!(Payload::parse(&wire), payload);
    }

    #[test]
    fn parse_skips_blank_lines() {
        let payload = Payload::parse(b"GET / HTTP/1.1\r\n\r\nHost: a\r\n");
        assert_eq!(payload.line_count(), 2);
        assert_eq!(payload.lines()[1].name, "Host:");
    }

    #[test]
    fn with_value_replaces_only_the_requested_line() {
        let payload = sample();
        let updated = payload.with_value(1, b"example.org".to_vec());
        assert_eq!(updated.lines()[1].value, b"example.org".to_vec());
        assert_eq!(updated.lines()[0], payload.lines()[0]);
        assert_eq!(updated.lines()[2], payload.lines()[2]);

        let unchanged = payload.with_value(99, b"x".to_vec());
        assert_eq!(unchanged, payload);
    }
}
