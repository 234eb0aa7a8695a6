use std::collections::HashMap;

/// TCP flag letters recognized in a capture's flag string.
const FLAG_NAMES: [(char, &str); 8] = [
    ('S', "SYN"),
    ('A', "ACK"),
    ('F', "FIN"),
    ('R', "RST"),
    ('P', "PSH"),
    ('U', "URG"),
    ('E', "ECE"),
    ('C', "CWR"),
];

/// Threshold bucket for sequence numbers and payload sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

/// Threshold bucket for TTL values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlClass {
    Low,
    Medium,
    High,
}

/// Attributes of one captured packet around a crash.
#[derive(Debug, Clone)]
pub struct CrashObservation {
    /// Flag string as captured, e.g. "SA" for SYN+ACK.
    pub flags: String,
    pub sequence_number: u32,
    pub payload_size: usize,
    pub ttl: u8,
}

/// Aggregated attribute counts over a batch of crash observations.
#[derive(Debug, Default, Clone)]
pub struct TrafficSummary {
    pub flag_counts: HashMap<&'static str, usize>,
    pub sequence_sizes: HashMap<SizeClass, usize>,
    pub payload_sizes: HashMap<SizeClass, usize>,
    pub ttl_classes: HashMap<TtlClass, usize>,
}

pub fn classify_sequence(sequence_number: u32) -> SizeClass {
    match sequence_number {
        0..1_000 => SizeClass::Small,
        1_000..10_000 => SizeClass::Medium,
        _ => SizeClass::Large,
    }
}

pub fn classify_payload_size(payload_size: usize) -> SizeClass {
    match payload_size {
        0..100 => SizeClass::Small,
        100..1_000 => SizeClass::Medium,
        _ => SizeClass::Large,
    }
}

pub fn classify_ttl(ttl: u8) -> TtlClass {
    match ttl {
        0..32 => TtlClass::Low,
        32..64 => TtlClass::Medium,
        _ => TtlClass::High,
    }
}

/// Names of the flags set in a capture's flag string.
pub fn flags_present(flags: &str) -> Vec<&'static str> {
    FLAG_NAMES
        .iter()
        .filter(|(letter, _)| flags.contains(*letter))
        .map(|(_, name)| *name)
        .collect()
}

/// Buckets every observation's attributes and sums the counts.
pub fn summarize(observations: &[CrashObservation]) -> TrafficSummary {
    let mut summary = TrafficSummary::default();
    for observation in observations {
        for flag in flags_present(&observation.flags) {
            *summary.flag_counts.entry(flag).or_insert(0) += 1;
        }
        *summary
            .sequence_sizes
            .entry(classify_sequence(observation.sequence_number))
            .or_insert(0) += 1;
        *summary
            .payload_sizes
            .entry(classify_payload_size(observation.payload_size))
            .or_insert(0) += 1;
        *summary
            .ttl_classes
            .entry(classify_ttl(observation.ttl))
            .or_insert(0) += 1;
    }
    summary
}
