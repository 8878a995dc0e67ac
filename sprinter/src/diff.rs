use crate::outcome::ResponseOutcome;

/// One observable field of a response, for baseline comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffField<'a> {
    Status,
    BodyLength,
    Body,
    /// Value equality for one header name; absence counts as a value of its
    /// own, distinct from any present value.
    Header(&'a str),
}

/// Whether `candidate` differs from `baseline` in the given field.
///
/// Pure and deterministic; header comparison goes through the maps by name,
/// so it does not depend on any iteration order.
pub fn differs(baseline: &ResponseOutcome, candidate: &ResponseOutcome, field: DiffField<'_>) -> bool {
    match field {
        DiffField::Status => baseline.status != candidate.status,
        DiffField::BodyLength => baseline.body_length != candidate.body_length,
        DiffField::Body => baseline.body != candidate.body,
        DiffField::Header(name) => baseline.headers.get(name) != candidate.headers.get(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: i32, body: &str, headers: &[(&str, &str)]) -> ResponseOutcome {
        ResponseOutcome {
            status,
            body_length: body.len() as u64,
            body: body.to_owned(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            elapsed_ms: 0,
            error: None,
        }
    }

    #[test]
    fn test_identical_outcomes_never_differ() {
        let a = outcome(200, "A", &[("X", "1")]);
        assert!(!differs(&a, &a, DiffField::Status));
        assert!(!differs(&a, &a, DiffField::BodyLength));
        assert!(!differs(&a, &a, DiffField::Body));
        assert!(!differs(&a, &a, DiffField::Header("X")));
    }

    #[test]
    fn test_status_change_flags_only_status() {
        let baseline = outcome(200, "A", &[("X", "1")]);
        let candidate = outcome(429, "A", &[("X", "1")]);

        assert!(differs(&baseline, &candidate, DiffField::Status));
        assert!(!differs(&baseline, &candidate, DiffField::BodyLength));
        assert!(!differs(&baseline, &candidate, DiffField::Body));
        assert!(!differs(&baseline, &candidate, DiffField::Header("X")));
    }

    #[test]
    fn test_same_length_different_body() {
        let baseline = outcome(200, "aa", &[]);
        let candidate = outcome(200, "ab", &[]);

        assert!(!differs(&baseline, &candidate, DiffField::BodyLength));
        assert!(differs(&baseline, &candidate, DiffField::Body));
    }

    #[test]
    fn test_absent_header_differs_from_present() {
        let baseline = outcome(200, "A", &[("X", "1")]);
        let candidate = outcome(200, "A", &[]);

        assert!(differs(&baseline, &candidate, DiffField::Header("X")));
        assert!(differs(&candidate, &baseline, DiffField::Header("X")));
        assert!(!differs(&baseline, &candidate, DiffField::Header("Y")));
    }

    #[test]
    fn test_header_names_are_case_sensitive_as_received() {
        let baseline = outcome(200, "A", &[("X-Token", "1")]);
        let candidate = outcome(200, "A", &[("x-token", "1")]);

        assert!(differs(&baseline, &candidate, DiffField::Header("X-Token")));
    }
}
