use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::diff::{DiffField, differs};
use crate::dispatch::{BurstConfig, BurstDispatcher};
use crate::error::SessionError;
use crate::outcome::ResponseOutcome;
use crate::report::CycleReport;
use crate::template::RequestTemplate;
use crate::transport::Transport;

/// One burst-testing session: the ordered request set, the outcome sequence
/// from the most recent cycle, and the dispatcher that ties them together.
///
/// The request copies and outcomes are index-aligned at all times: every
/// builder operation touches both sequences together, and `send` replaces
/// the outcome sequence wholesale, never incrementally. The `&mut self`
/// API leaves serialization of builder mutations against in-flight cycles
/// to the host: a cycle exclusively borrows the session for its whole
/// duration, so readers only ever observe complete sequences.
pub struct Session<T: Transport> {
    dispatcher: BurstDispatcher<T>,
    requests: Vec<RequestTemplate>,
    outcomes: Vec<ResponseOutcome>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, BurstConfig::default())
    }

    pub fn with_config(transport: T, config: BurstConfig) -> Self {
        Self {
            dispatcher: BurstDispatcher::with_config(transport, config),
            requests: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Replaces the whole session state with a single-element set holding
    /// `template` and one placeholder outcome.
    pub fn load(&mut self, template: RequestTemplate) {
        self.requests = vec![template];
        self.outcomes = vec![ResponseOutcome::placeholder()];
        debug!("template loaded, request set reset to 1");
    }

    /// Loads the first request out of a selection of captured exchanges,
    /// e.g. the user's pick from a proxy history. An empty selection leaves
    /// the session untouched.
    pub fn load_from_selection<I>(&mut self, selection: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = RequestTemplate>,
    {
        let template = selection
            .into_iter()
            .next()
            .ok_or(SessionError::EmptySelection)?;
        self.load(template);
        Ok(())
    }

    /// Appends a byte-exact copy of the last request plus one placeholder
    /// outcome.
    pub fn duplicate(&mut self) -> Result<(), SessionError> {
        let Some(last) = self.requests.last() else {
            return Err(SessionError::NoTemplate);
        };
        self.requests.push(last.clone());
        self.outcomes.push(ResponseOutcome::placeholder());
        Ok(())
    }

    /// Runs [`duplicate`](Self::duplicate) exactly `n` times. The UI caps
    /// this at 100; the session accepts any count.
    pub fn duplicate_n(&mut self, n: usize) -> Result<(), SessionError> {
        for _ in 0..n {
            self.duplicate()?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.requests.clear();
        self.outcomes.clear();
    }

    /// Runs one dispatch cycle over the current request set.
    ///
    /// On return the outcome sequence has been replaced with exactly one
    /// result per request and the aggregate analysis has been logged.
    /// Per-request failures are inside the sequence, not in the error.
    pub async fn send(&mut self) -> Result<(), SessionError> {
        if self.requests.is_empty() {
            return Err(SessionError::EmptySet);
        }

        let outcomes = self.dispatcher.dispatch(&self.requests).await;
        debug_assert_eq!(outcomes.len(), self.requests.len());

        if let Some(report) = CycleReport::from_outcomes(&outcomes) {
            info!("{report}");
        }
        self.outcomes = outcomes;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn request(&self, index: usize) -> Option<&RequestTemplate> {
        self.requests.get(index)
    }

    pub fn request_bytes(&self, index: usize) -> Option<&[u8]> {
        self.requests.get(index).map(RequestTemplate::raw)
    }

    pub fn outcome(&self, index: usize) -> Option<&ResponseOutcome> {
        self.outcomes.get(index)
    }

    pub fn outcomes(&self) -> &[ResponseOutcome] {
        &self.outcomes
    }

    pub fn report(&self) -> Option<CycleReport> {
        CycleReport::from_outcomes(&self.outcomes)
    }

    /// Whether the outcome at `index` differs from the baseline (index 0)
    /// in the given field. The baseline is never flagged against itself,
    /// and nothing is flagged while fewer than two outcomes exist.
    pub fn diff_flag(&self, index: usize, field: DiffField<'_>) -> bool {
        if index == 0 || self.outcomes.len() < 2 {
            return false;
        }
        let (Some(baseline), Some(candidate)) = (self.outcomes.first(), self.outcomes.get(index))
        else {
            return false;
        };
        differs(baseline, candidate, field)
    }

    /// Every distinct header name seen across the baseline and the outcome
    /// at `index`, sorted: the set of header diff queries worth asking.
    pub fn header_names(&self, index: usize) -> Vec<String> {
        let mut names = BTreeSet::new();
        for slot in [0, index] {
            if let Some(outcome) = self.outcomes.get(slot) {
                names.extend(outcome.headers.keys().cloned());
            }
        }
        names.into_iter().collect()
    }
}
