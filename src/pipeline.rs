//! Sequential scanner orchestration.
//!
//! One pipeline run drives the three scanners in fixed order, tracking a
//! two-phase (upload, processing) progression per stage. The first
//! failure aborts the run: later stages are never invoked and no
//! combined report is produced. Aggregation happens once, after the last
//! scanner completes.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::report::finding::CombinedReport;
use crate::report::merger::{self, ScannerRun};
use crate::rules::CustomRules;
use crate::scanner::{Artifact, ScannerClient, ScannerKind, TransportError};
use crate::store::ReportStore;

/// The pipeline's current position as a single value. Invalid flag
/// combinations (e.g. two stages uploading at once) are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Uploading(ScannerKind),
    Processing(ScannerKind),
    Aggregating,
    Done,
    Failed,
}

impl PipelineState {
    /// The stage this state belongs to, if any.
    pub fn stage(&self) -> Option<ScannerKind> {
        match self {
            PipelineState::Uploading(kind) | PipelineState::Processing(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    pub fn label(&self) -> String {
        match self {
            PipelineState::Idle => "idle".to_string(),
            PipelineState::Uploading(kind) => format!("uploading to {kind}"),
            PipelineState::Processing(kind) => format!("waiting for {kind}"),
            PipelineState::Aggregating => "aggregating results".to_string(),
            PipelineState::Done => "done".to_string(),
            PipelineState::Failed => "failed".to_string(),
        }
    }
}

/// Drives the scanners sequentially and hands their raw outputs to the
/// aggregator. Holds the only mutable pipeline state; a new `run` call
/// unconditionally supersedes whatever the previous run left behind.
pub struct Pipeline<C: ScannerClient> {
    client: C,
    store: Box<dyn ReportStore>,
    settle: Duration,
    state: PipelineState,
    observer: Option<Box<dyn FnMut(&PipelineState)>>,
}

impl<C: ScannerClient> Pipeline<C> {
    pub fn new(client: C, store: Box<dyn ReportStore>, settle: Duration) -> Self {
        Pipeline {
            client,
            store,
            settle,
            state: PipelineState::Idle,
            observer: None,
        }
    }

    /// Attach a callback invoked on every state transition. Display
    /// layers hang off this; the pipeline itself only logs.
    pub fn with_observer(mut self, observer: impl FnMut(&PipelineState) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the full pipeline against one artifact. Custom rules apply to
    /// the Semgrep stage only and are validated before any network call.
    pub fn run(
        &mut self,
        artifact: &Artifact,
        raw_rules: Option<&str>,
    ) -> Result<CombinedReport, PipelineError> {
        // A fresh run discards any prior run's state and error.
        self.transition(PipelineState::Idle);

        let rules = match raw_rules.map(CustomRules::parse).transpose() {
            Ok(rules) => rules,
            Err(e) => {
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        let mut runs: Vec<ScannerRun> = Vec::with_capacity(ScannerKind::ORDER.len());

        for (index, kind) in ScannerKind::ORDER.into_iter().enumerate() {
            if index > 0 && !self.settle.is_zero() {
                // Settle interval between consecutive successful stages,
                // so per-stage progress stays visible.
                std::thread::sleep(self.settle);
            }

            let stage_rules = match kind {
                ScannerKind::Semgrep => rules.as_ref(),
                _ => None,
            };

            self.transition(PipelineState::Uploading(kind));
            let ticket = self
                .client
                .upload(kind, artifact, stage_rules)
                .map_err(|e| self.fail(kind, e))?;

            self.transition(PipelineState::Processing(kind));
            let output = self
                .client
                .collect(kind, ticket)
                .map_err(|e| self.fail(kind, e))?;

            info!(
                "{} reported {} findings (score {})",
                kind,
                output.vulnerabilities.len(),
                output.security_score
            );
            runs.push(ScannerRun {
                kind,
                findings: output.vulnerabilities,
                score: output.security_score,
            });
        }

        self.transition(PipelineState::Aggregating);
        let report = merger::combine(&artifact.file_name, &runs, Utc::now().to_rfc3339());
        self.transition(PipelineState::Done);

        info!(
            "combined {} unique findings, security score {:.1}",
            report.findings.len(),
            report.security_score
        );

        // Fire-and-forget: a store failure never invalidates the report.
        if let Err(e) = self.store.persist(&report) {
            warn!("failed to persist report: {e}");
        }

        Ok(report)
    }

    fn transition(&mut self, next: PipelineState) {
        self.state = next;
        info!("pipeline: {}", next.label());
        if let Some(observer) = self.observer.as_mut() {
            observer(&next);
        }
    }

    fn fail(&mut self, stage: ScannerKind, error: TransportError) -> PipelineError {
        self.transition(PipelineState::Failed);
        PipelineError::Transport {
            stage,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;
    use crate::report::finding::{Position, RawFinding};
    use crate::scanner::ScanOutput;
    use crate::store::{NoStore, StoreError};

    /// What a fake scanner stage should do when invoked.
    #[derive(Clone)]
    enum StageScript {
        Succeed(ScanOutput),
        FailUpload(String),
        FailCollect(String),
    }

    /// Records every upload so tests can assert call order and rules
    /// forwarding.
    #[derive(Clone, Default)]
    struct CallLog {
        uploads: Rc<RefCell<Vec<(ScannerKind, bool)>>>,
    }

    struct FakeClient {
        scripts: HashMap<ScannerKind, StageScript>,
        log: CallLog,
    }

    impl FakeClient {
        fn new(log: CallLog) -> Self {
            FakeClient { scripts: HashMap::new(), log }
        }

        fn script(mut self, kind: ScannerKind, script: StageScript) -> Self {
            self.scripts.insert(kind, script);
            self
        }

        fn all_succeed(log: CallLog) -> Self {
            let mut client = FakeClient::new(log);
            for kind in ScannerKind::ORDER {
                client.scripts.insert(kind, StageScript::Succeed(ScanOutput::default()));
            }
            client
        }
    }

    impl ScannerClient for FakeClient {
        type Ticket = Result<ScanOutput, TransportError>;

        fn upload(
            &self,
            kind: ScannerKind,
            _artifact: &Artifact,
            rules: Option<&CustomRules>,
        ) -> Result<Self::Ticket, TransportError> {
            self.log.uploads.borrow_mut().push((kind, rules.is_some()));
            match self.scripts.get(&kind).expect("stage scripted") {
                StageScript::Succeed(output) => Ok(Ok(output.clone())),
                StageScript::FailUpload(msg) => Err(TransportError(msg.clone())),
                StageScript::FailCollect(msg) => Ok(Err(TransportError(msg.clone()))),
            }
        }

        fn collect(
            &self,
            _kind: ScannerKind,
            ticket: Self::Ticket,
        ) -> Result<ScanOutput, TransportError> {
            ticket
        }
    }

    struct FailingStore;

    impl ReportStore for FailingStore {
        fn persist(&self, _report: &CombinedReport) -> Result<(), StoreError> {
            Err(StoreError::Rejected(500))
        }
    }

    fn artifact() -> Artifact {
        Artifact { file_name: "app.py".to_string(), bytes: b"print('hi')".to_vec() }
    }

    fn finding(check_id: &str, line: u32) -> RawFinding {
        RawFinding {
            check_id: Some(check_id.to_string()),
            path: Some("app.py".to_string()),
            start: Some(Position { line, col: None }),
            message: Some("issue".to_string()),
            severity: Some("WARNING".to_string()),
            ..Default::default()
        }
    }

    fn pipeline(client: FakeClient) -> Pipeline<FakeClient> {
        Pipeline::new(client, Box::new(NoStore), Duration::ZERO)
    }

    #[test]
    fn happy_path_walks_all_states_in_order() {
        let log = CallLog::default();
        let states = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&states);

        let mut pipeline = pipeline(FakeClient::all_succeed(log))
            .with_observer(move |s| recorded.borrow_mut().push(*s));
        let report = pipeline.run(&artifact(), None).unwrap();

        assert_eq!(report.scan_metadata.scan_type, "Combined SAST");
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(
            *states.borrow(),
            vec![
                PipelineState::Idle,
                PipelineState::Uploading(ScannerKind::Semgrep),
                PipelineState::Processing(ScannerKind::Semgrep),
                PipelineState::Uploading(ScannerKind::ShiftLeft),
                PipelineState::Processing(ScannerKind::ShiftLeft),
                PipelineState::Uploading(ScannerKind::CodeQl),
                PipelineState::Processing(ScannerKind::CodeQl),
                PipelineState::Aggregating,
                PipelineState::Done,
            ]
        );
    }

    #[test]
    fn stage_two_failure_skips_stage_three() {
        let log = CallLog::default();
        let client = FakeClient::new(log.clone())
            .script(ScannerKind::Semgrep, StageScript::Succeed(ScanOutput::default()))
            .script(
                ScannerKind::ShiftLeft,
                StageScript::FailCollect("ShiftLeft scan failed (HTTP 502)".to_string()),
            )
            .script(ScannerKind::CodeQl, StageScript::Succeed(ScanOutput::default()));

        let mut pipeline = pipeline(client);
        let err = pipeline.run(&artifact(), None).unwrap_err();

        assert_eq!(err.to_string(), "ShiftLeft scan failed (HTTP 502)");
        assert_eq!(pipeline.state(), PipelineState::Failed);
        let uploads: Vec<ScannerKind> = log.uploads.borrow().iter().map(|(k, _)| *k).collect();
        assert_eq!(uploads, vec![ScannerKind::Semgrep, ScannerKind::ShiftLeft]);
    }

    #[test]
    fn upload_failure_aborts_before_processing() {
        let log = CallLog::default();
        let client = FakeClient::new(log.clone()).script(
            ScannerKind::Semgrep,
            StageScript::FailUpload("Semgrep scan failed: connection refused".to_string()),
        );
        let states = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&states);

        let mut pipeline =
            pipeline(client).with_observer(move |s| recorded.borrow_mut().push(*s));
        let err = pipeline.run(&artifact(), None).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Transport { stage: ScannerKind::Semgrep, .. }
        ));
        assert!(!states
            .borrow()
            .contains(&PipelineState::Processing(ScannerKind::Semgrep)));
        assert_eq!(log.uploads.borrow().len(), 1);
    }

    #[test]
    fn invalid_rules_rejected_before_any_network_call() {
        let log = CallLog::default();
        let mut pipeline = pipeline(FakeClient::all_succeed(log.clone()));
        let err = pipeline.run(&artifact(), Some("{not json")).unwrap_err();

        assert!(matches!(err, PipelineError::InvalidRules(_)));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(log.uploads.borrow().is_empty());
    }

    #[test]
    fn rules_forwarded_to_semgrep_only() {
        let log = CallLog::default();
        let mut pipeline = pipeline(FakeClient::all_succeed(log.clone()));
        pipeline
            .run(&artifact(), Some(r#"{"rules": []}"#))
            .unwrap();

        assert_eq!(
            *log.uploads.borrow(),
            vec![
                (ScannerKind::Semgrep, true),
                (ScannerKind::ShiftLeft, false),
                (ScannerKind::CodeQl, false),
            ]
        );
    }

    #[test]
    fn findings_from_all_stages_reach_the_aggregator() {
        let log = CallLog::default();
        let client = FakeClient::new(log)
            .script(
                ScannerKind::Semgrep,
                StageScript::Succeed(ScanOutput {
                    vulnerabilities: vec![finding("a", 1)],
                    security_score: 8.0,
                }),
            )
            .script(
                ScannerKind::ShiftLeft,
                StageScript::Succeed(ScanOutput {
                    vulnerabilities: vec![finding("b", 2)],
                    security_score: 6.0,
                }),
            )
            .script(ScannerKind::CodeQl, StageScript::Succeed(ScanOutput::default()));

        let mut pipeline = pipeline(client);
        let report = pipeline.run(&artifact(), None).unwrap();

        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.security_score, 7.0);
        assert_eq!(report.scan_metadata.individual_scores.codeql, 0.0);
    }

    #[test]
    fn store_failure_does_not_invalidate_the_report() {
        let log = CallLog::default();
        let client = FakeClient::all_succeed(log);
        let mut pipeline = Pipeline::new(client, Box::new(FailingStore), Duration::ZERO);

        let report = pipeline.run(&artifact(), None).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(report.scan_metadata.scan_type, "Combined SAST");
    }

    #[test]
    fn a_new_run_supersedes_a_failed_one() {
        let log = CallLog::default();
        let client = FakeClient::new(log.clone())
            .script(
                ScannerKind::Semgrep,
                StageScript::FailUpload("Semgrep scan failed: timeout".to_string()),
            );
        let mut pipeline = pipeline(client);
        assert!(pipeline.run(&artifact(), None).is_err());
        assert_eq!(pipeline.state(), PipelineState::Failed);

        // Re-script every stage to succeed and run again.
        pipeline.client = FakeClient::all_succeed(log);
        let report = pipeline.run(&artifact(), None).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn state_helpers() {
        assert_eq!(
            PipelineState::Uploading(ScannerKind::CodeQl).stage(),
            Some(ScannerKind::CodeQl)
        );
        assert_eq!(PipelineState::Aggregating.stage(), None);
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Idle.is_terminal());
    }
}
