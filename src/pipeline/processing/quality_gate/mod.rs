use crate::types::CanonicalRecord;

/// Quality Gate decision for a candidate record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityDecision {
    /// Record carries identifying data and proceeds downstream
    Accept,
    /// Record has neither a registration code nor an address
    Reject,
}

/// Accepts a record iff it can be identified by its EDRPOU code or located by address.
///
/// The same gate runs for every source format.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordValidator;

impl RecordValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, record: &CanonicalRecord) -> QualityDecision {
        if !record.edrpou.trim().is_empty() || !record.address.trim().is_empty() {
            QualityDecision::Accept
        } else {
            QualityDecision::Reject
        }
    }

    pub fn accept(&self, record: &CanonicalRecord) -> bool {
        self.assess(record) == QualityDecision::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(edrpou: &str, address: &str) -> CanonicalRecord {
        CanonicalRecord {
            name: "ОСББ".to_string(),
            edrpou: edrpou.to_string(),
            address: address.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_accepts_code_or_address() {
        let gate = RecordValidator::new();
        assert!(gate.accept(&record("12345678", "")));
        assert!(gate.accept(&record("", "вул. Франка 1")));
        assert!(gate.accept(&record("12345678", "вул. Франка 1")));
    }

    #[test]
    fn test_rejects_record_without_identifying_data() {
        let gate = RecordValidator::new();
        assert_eq!(gate.assess(&record("", "")), QualityDecision::Reject);
        assert!(!gate.accept(&record(" ", "\t")));
    }
}
