//! Reconciles an alert group against its JIRA issue.
//!
//! Every notification searches for the issue carrying the group's id, then
//! leaves it alone, reopens it, or creates a new one. No state is kept
//! between notifications; the tracker is the only record of which issue
//! belongs to which group.

pub mod error;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn};

use crate::alert::{group_id, issue_label, Data};
use crate::config::ReceiverConfig;
use crate::context::ServiceContext;
use crate::ports::{
    Clock, FieldValue, Issue, IssueDraft, IssueRef, IssueTracker, SearchOptions, Transition,
};
use crate::template::Template;

pub use error::{classify, NotifyError};

/// Fields fetched when searching for a group's issue.
pub const SEARCH_FIELDS: [&str; 4] = ["summary", "status", "resolution", "resolutiondate"];

/// At most this many issues are fetched per search; more than one only
/// matters for logging.
const MAX_SEARCH_RESULTS: u32 = 2;

/// What a successful notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The group's issue is still open; nothing was changed.
    Unresolved {
        /// Issue key.
        key: String,
    },
    /// The group's issue was resolved as won't fix; nothing was changed.
    WontFix {
        /// Issue key.
        key: String,
        /// Resolution name.
        resolution: String,
    },
    /// A recently resolved issue was reopened.
    Reopened {
        /// Issue key.
        key: String,
    },
    /// A new issue was created.
    Created(IssueRef),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved { key } => write!(f, "issue {key} is unresolved, nothing to do"),
            Self::WontFix { key, resolution } => {
                write!(f, "issue {key} was resolved as {resolution:?}, not reopening")
            }
            Self::Reopened { key } => write!(f, "issue {key} reopened"),
            Self::Created(issue) => write!(f, "issue {} created (id {})", issue.key, issue.id),
        }
    }
}

/// Where a group's most recent issue stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorIssue {
    /// No issue carries the group id.
    None,
    /// The issue is not in the "done" category.
    Open,
    /// The issue was resolved with the won't-fix resolution.
    ResolvedWontFix,
    /// The issue was resolved within the reopen window.
    ResolvedRecently,
    /// The reopen window has passed, or the resolution time is unknown.
    ResolvedStale,
}

/// Classifies the group's most recent issue.
#[must_use]
pub fn assess(issue: Option<&Issue>, config: &ReceiverConfig, now: DateTime<Utc>) -> PriorIssue {
    let Some(issue) = issue else {
        return PriorIssue::None;
    };
    if !issue.is_resolved() {
        return PriorIssue::Open;
    }
    if config.wont_fix_resolution.is_some()
        && issue.resolution_name() == config.wont_fix_resolution.as_deref()
    {
        return PriorIssue::ResolvedWontFix;
    }
    match issue.fields.resolutiondate {
        Some(resolved) if within_window(resolved, config.reopen_duration, now) => {
            PriorIssue::ResolvedRecently
        }
        _ => PriorIssue::ResolvedStale,
    }
}

fn within_window(resolved: DateTime<Utc>, window: std::time::Duration, now: DateTime<Utc>) -> bool {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| resolved.checked_add_signed(window))
        .map_or(true, |until| until > now)
}

/// Finds the transition with exactly this name.
#[must_use]
pub fn find_transition_by_name<'a>(
    transitions: &'a [Transition],
    name: &str,
) -> Option<&'a Transition> {
    transitions.iter().find(|t| t.name == name)
}

/// Picks the group's current issue: an unresolved one if any, otherwise the
/// most recently resolved.
///
/// Matches JIRA's `order by resolutiondate desc`, where empty dates come
/// first, and is re-applied client-side. An issue outside the "done"
/// category ranks first even if it still carries a resolution date.
fn most_recently_resolved(mut issues: Vec<Issue>) -> Option<Issue> {
    issues.sort_by(|a, b| {
        a.is_resolved().cmp(&b.is_resolved()).then_with(|| {
            match (&a.fields.resolutiondate, &b.fields.resolutiondate) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => b.cmp(a),
            }
        })
    });
    issues.into_iter().next()
}

/// One configured receiver bound to a tracker and a clock.
///
/// Holds only shared references, so one receiver may serve concurrent
/// notifications for different groups.
pub struct Receiver<'a> {
    config: &'a ReceiverConfig,
    template: &'a Template,
    tracker: &'a dyn IssueTracker,
    clock: &'a dyn Clock,
}

impl<'a> Receiver<'a> {
    /// Binds a receiver to the ports of a service context.
    #[must_use]
    pub fn new(
        config: &'a ReceiverConfig,
        template: &'a Template,
        ctx: &'a ServiceContext,
    ) -> Self {
        Self::with_ports(config, template, ctx.tracker.as_ref(), ctx.clock.as_ref())
    }

    /// Binds a receiver to explicit ports.
    #[must_use]
    pub fn with_ports(
        config: &'a ReceiverConfig,
        template: &'a Template,
        tracker: &'a dyn IssueTracker,
        clock: &'a dyn Clock,
    ) -> Self {
        Self { config, template, tracker, clock }
    }

    /// Reconciles one notification with the tracker.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render, a tracker call fails,
    /// or the reopen transition does not exist. Check
    /// [`NotifyError::is_retryable`] before resubmitting.
    pub fn notify(&self, data: &Data) -> Result<Outcome, NotifyError> {
        let span = info_span!("notify", receiver = %self.config.name);
        let _enter = span.enter();

        let mut batch = self.template.batch(data);
        let project = batch.render(&self.config.project);
        batch.finish()?;

        let group_id = group_id(&data.group_labels);
        let prior = self.search(&project, &group_id)?;

        if let Some(issue) = prior {
            match assess(Some(&issue), self.config, self.clock.now()) {
                PriorIssue::Open => {
                    debug!(key = %issue.key, label = %group_id, "issue is unresolved");
                    return Ok(Outcome::Unresolved { key: issue.key });
                }
                PriorIssue::ResolvedWontFix => {
                    let resolution = issue.resolution_name().unwrap_or_default().to_string();
                    info!(
                        key = %issue.key,
                        label = %group_id,
                        resolution = %resolution,
                        "issue was resolved as won't fix, not reopening"
                    );
                    return Ok(Outcome::WontFix { key: issue.key, resolution });
                }
                PriorIssue::ResolvedRecently => {
                    info!(
                        key = %issue.key,
                        label = %group_id,
                        resolution_time = ?issue.fields.resolutiondate,
                        reopen_duration = ?self.config.reopen_duration,
                        "issue was recently resolved, reopening"
                    );
                    return self.reopen(&issue.key);
                }
                PriorIssue::None | PriorIssue::ResolvedStale => {}
            }
        }

        info!(label = %group_id, "no recent matching issue found, creating new issue");
        let draft = self.draft(project, &group_id, data)?;
        let created = self.create(&draft)?;
        info!(key = %created.key, id = %created.id, "issue created");
        Ok(Outcome::Created(created))
    }

    fn search(&self, project: &str, group_id: &str) -> Result<Option<Issue>, NotifyError> {
        let jql = format!(
            "project={project:?} and {field:?}={group_id:?} order by resolutiondate desc",
            field = self.config.group_field_name,
        );
        let options = SearchOptions {
            max_results: MAX_SEARCH_RESULTS,
            fields: SEARCH_FIELDS.iter().map(|f| (*f).to_string()).collect(),
        };
        debug!(jql = %jql, ?options, "search");

        let issues = self.tracker.search(&jql, &options).map_err(|e| classify("search", e))?;
        match issues.len() {
            0 => {
                debug!(jql = %jql, "no results");
                Ok(None)
            }
            count => {
                if count > 1 {
                    debug!(
                        jql = %jql,
                        count,
                        "more than one issue matched, picking most recently resolved"
                    );
                }
                let issue = most_recently_resolved(issues);
                debug!(jql = %jql, key = ?issue.as_ref().map(|i| &i.key), "found");
                Ok(issue)
            }
        }
    }

    fn reopen(&self, key: &str) -> Result<Outcome, NotifyError> {
        let transitions = self.tracker.transitions(key).map_err(|e| classify("transitions", e))?;
        let Some(transition) = find_transition_by_name(&transitions, &self.config.reopen_state)
        else {
            return Err(NotifyError::MissingTransition {
                state: self.config.reopen_state.clone(),
                key: key.to_string(),
            });
        };

        debug!(key, transition_id = %transition.id, "reopen");
        self.tracker
            .do_transition(key, &transition.id)
            .map_err(|e| classify("do_transition", e))?;
        debug!(key, "reopened");
        Ok(Outcome::Reopened { key: key.to_string() })
    }

    fn draft(
        &self,
        project: String,
        group_id: &str,
        data: &Data,
    ) -> Result<IssueDraft, NotifyError> {
        let config = self.config;
        let label = issue_label(&config.label_key, &data.group_labels).unwrap_or_else(|err| {
            warn!(error = %err, "no issue label");
            String::new()
        });

        let mut batch = self.template.batch(data);
        let mut draft = IssueDraft {
            project,
            issue_type: batch.render(&config.issue_type),
            description: batch.render(&config.description),
            summary: batch.render(&config.summary),
            priority: config.priority.as_deref().map(|p| batch.render(p)),
            components: config.components.iter().map(|c| batch.render(c)).collect(),
            labels: Vec::new(),
            custom_fields: config
                .fields
                .iter()
                .map(|(id, value)| (id.clone(), FieldValue::Text(batch.render(value))))
                .collect(),
        };
        batch.finish()?;
        draft
            .custom_fields
            .insert(config.group_field_id.clone(), FieldValue::List(vec![group_id.to_string()]));

        if !label.is_empty() {
            draft.labels.push(label);
        }
        if config.add_group_labels {
            draft.labels.extend(
                data.group_labels
                    .sorted_pairs()
                    .iter()
                    .map(|pair| format!("{}={:?}", pair.name, pair.value)),
            );
        }
        Ok(draft)
    }

    fn create(&self, draft: &IssueDraft) -> Result<IssueRef, NotifyError> {
        debug!(?draft, "create");
        let created = self.tracker.create(draft).map_err(|e| classify("create", e))?;
        debug!(key = %created.key, id = %created.id, "created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::alert::Kv;
    use crate::ports::{ApiResponse, IssueFields, Resolution, Status, StatusCategory, TrackerError};

    const NOW: &str = "2024-05-01T12:00:00Z";
    const GROUP_ID: &str = r#"ALERT{alertname="HighCPU",instance="a"}"#;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Search(String),
        Transitions(String),
        DoTransition(String, String),
        Create(IssueDraft),
    }

    #[derive(Default)]
    struct FakeTracker {
        issues: Vec<Issue>,
        transitions: Vec<Transition>,
        search_error: Option<TrackerError>,
        transitions_error: Option<TrackerError>,
        do_transition_error: Option<TrackerError>,
        create_error: Option<TrackerError>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeTracker {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn wrote(&self) -> bool {
            self.calls()
                .iter()
                .any(|c| matches!(c, Call::DoTransition(..) | Call::Create(_)))
        }
    }

    impl IssueTracker for FakeTracker {
        fn search(&self, jql: &str, options: &SearchOptions) -> Result<Vec<Issue>, TrackerError> {
            assert_eq!(options.max_results, 2);
            self.calls.lock().unwrap().push(Call::Search(jql.to_string()));
            match &self.search_error {
                Some(err) => Err(err.clone()),
                None => Ok(self.issues.clone()),
            }
        }

        fn transitions(&self, key: &str) -> Result<Vec<Transition>, TrackerError> {
            self.calls.lock().unwrap().push(Call::Transitions(key.to_string()));
            match &self.transitions_error {
                Some(err) => Err(err.clone()),
                None => Ok(self.transitions.clone()),
            }
        }

        fn do_transition(&self, key: &str, transition_id: &str) -> Result<(), TrackerError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::DoTransition(key.to_string(), transition_id.to_string()));
            match &self.do_transition_error {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn create(&self, draft: &IssueDraft) -> Result<IssueRef, TrackerError> {
            self.calls.lock().unwrap().push(Call::Create(draft.clone()));
            match &self.create_error {
                Some(err) => Err(err.clone()),
                None => Ok(IssueRef { id: "10042".into(), key: "AB-42".into() }),
            }
        }
    }

    fn now() -> DateTime<Utc> {
        NOW.parse().unwrap()
    }

    fn config() -> ReceiverConfig {
        ReceiverConfig {
            name: "jira-ab".into(),
            api_url: "https://jira.example.com".into(),
            user: "alerts".into(),
            password: "secret".into(),
            project: "AB".into(),
            issue_type: "Bug".into(),
            summary: "{{groupLabels.alertname}} on {{groupLabels.instance}}".into(),
            description: "{{commonAnnotations.description}}".into(),
            priority: None,
            components: Vec::new(),
            reopen_state: "Reopen".into(),
            reopen_duration: Duration::from_secs(3600),
            wont_fix_resolution: Some("Won't Fix".into()),
            group_field_name: "Alert Group".into(),
            group_field_id: "customfield_10001".into(),
            label_key: "alertname".into(),
            add_group_labels: false,
            fields: BTreeMap::new(),
        }
    }

    fn data() -> Data {
        let labels: Kv = [("instance", "a"), ("alertname", "HighCPU")].into_iter().collect();
        let mut data = Data::with_group_labels("jira-ab", labels);
        data.common_annotations.insert("description", "CPU above 90% for 10m");
        data
    }

    fn issue(key: &str, category: &str, resolution: Option<&str>, resolved_ago: Option<i64>) -> Issue {
        Issue {
            id: "10001".into(),
            key: key.into(),
            fields: IssueFields {
                summary: "HighCPU on a".into(),
                status: Status {
                    name: "Closed".into(),
                    status_category: StatusCategory { key: category.into() },
                },
                resolution: resolution.map(|name| Resolution { name: name.into() }),
                resolutiondate: resolved_ago.map(|mins| now() - chrono::Duration::minutes(mins)),
            },
        }
    }

    fn rejected(path: &str, status: u16, reason: &str) -> TrackerError {
        TrackerError::with_response(
            format!("request failed with status {status}"),
            ApiResponse {
                url: format!("https://jira.example.com/rest/api/2/{path}"),
                status,
                reason: reason.into(),
                body: String::new(),
            },
        )
    }

    fn reopen_transitions() -> Vec<Transition> {
        vec![
            Transition { id: "11".into(), name: "Start Progress".into() },
            Transition { id: "21".into(), name: "Reopen".into() },
        ]
    }

    fn notify(config: &ReceiverConfig, tracker: &FakeTracker) -> Result<Outcome, NotifyError> {
        let template = Template::new();
        let clock = FixedClock(now());
        Receiver::with_ports(config, &template, tracker, &clock).notify(&data())
    }

    #[test]
    fn creates_issue_when_none_found() {
        let tracker = FakeTracker::default();
        let outcome = notify(&config(), &tracker).unwrap();

        assert_eq!(outcome, Outcome::Created(IssueRef { id: "10042".into(), key: "AB-42".into() }));
        let calls = tracker.calls();
        assert_eq!(calls.len(), 2);
        let Call::Create(draft) = &calls[1] else { panic!("expected create, got {calls:?}") };
        assert_eq!(draft.project, "AB");
        assert_eq!(draft.issue_type, "Bug");
        assert_eq!(draft.summary, "HighCPU on a");
        assert_eq!(draft.description, "CPU above 90% for 10m");
        assert_eq!(draft.labels, vec!["HighCPU".to_string()]);
        assert_eq!(
            draft.custom_fields.get("customfield_10001"),
            Some(&FieldValue::List(vec![GROUP_ID.to_string()]))
        );
    }

    #[test]
    fn search_is_scoped_to_project_and_group_field() {
        let tracker = FakeTracker::default();
        notify(&config(), &tracker).unwrap();

        let Call::Search(jql) = &tracker.calls()[0] else { panic!("expected search first") };
        assert_eq!(
            jql,
            r#"project="AB" and "Alert Group"="ALERT{alertname=\"HighCPU\",instance=\"a\"}" order by resolutiondate desc"#
        );
    }

    #[test]
    fn open_issue_is_left_alone() {
        let tracker = FakeTracker {
            issues: vec![issue("AB-1", "indeterminate", None, None)],
            ..FakeTracker::default()
        };
        let outcome = notify(&config(), &tracker).unwrap();
        assert_eq!(outcome, Outcome::Unresolved { key: "AB-1".into() });
        assert!(!tracker.wrote());
    }

    #[test]
    fn recently_resolved_issue_is_reopened() {
        let tracker = FakeTracker {
            issues: vec![issue("AB-1", "done", Some("Fixed"), Some(10))],
            transitions: reopen_transitions(),
            ..FakeTracker::default()
        };
        let outcome = notify(&config(), &tracker).unwrap();

        assert_eq!(outcome, Outcome::Reopened { key: "AB-1".into() });
        let calls = tracker.calls();
        assert_eq!(calls[1], Call::Transitions("AB-1".into()));
        assert_eq!(calls[2], Call::DoTransition("AB-1".into(), "21".into()));
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn wont_fix_issue_is_never_reopened_or_recreated() {
        for resolved_ago in [Some(10), Some(60 * 24 * 30), None] {
            let tracker = FakeTracker {
                issues: vec![issue("AB-1", "done", Some("Won't Fix"), resolved_ago)],
                transitions: reopen_transitions(),
                ..FakeTracker::default()
            };
            let outcome = notify(&config(), &tracker).unwrap();
            assert_eq!(
                outcome,
                Outcome::WontFix { key: "AB-1".into(), resolution: "Won't Fix".into() }
            );
            assert_eq!(tracker.calls().len(), 1);
        }
    }

    #[test]
    fn wont_fix_is_ignored_when_not_configured() {
        let config = ReceiverConfig { wont_fix_resolution: None, ..config() };
        let tracker = FakeTracker {
            issues: vec![issue("AB-1", "done", Some("Won't Fix"), Some(10))],
            transitions: reopen_transitions(),
            ..FakeTracker::default()
        };
        assert_eq!(notify(&config, &tracker).unwrap(), Outcome::Reopened { key: "AB-1".into() });
    }

    #[test]
    fn stale_resolution_creates_new_issue() {
        let tracker = FakeTracker {
            issues: vec![issue("AB-1", "done", Some("Fixed"), Some(61))],
            transitions: reopen_transitions(),
            ..FakeTracker::default()
        };
        let outcome = notify(&config(), &tracker).unwrap();
        assert!(matches!(outcome, Outcome::Created(_)));
        assert!(!tracker.calls().iter().any(|c| matches!(c, Call::Transitions(_))));
    }

    #[test]
    fn missing_resolution_date_counts_as_stale() {
        let tracker = FakeTracker {
            issues: vec![issue("AB-1", "done", Some("Fixed"), None)],
            ..FakeTracker::default()
        };
        assert!(matches!(notify(&config(), &tracker).unwrap(), Outcome::Created(_)));
    }

    #[test]
    fn missing_reopen_transition_is_fatal() {
        let tracker = FakeTracker {
            issues: vec![issue("AB-1", "done", Some("Fixed"), Some(10))],
            transitions: vec![Transition { id: "11".into(), name: "Start Progress".into() }],
            ..FakeTracker::default()
        };
        let err = notify(&config(), &tracker).unwrap_err();
        assert!(!err.is_retryable());
        assert!(
            matches!(&err, NotifyError::MissingTransition { state, key } if state == "Reopen" && key == "AB-1")
        );
        assert!(!tracker.wrote());
    }

    #[test]
    fn picks_most_recently_resolved_of_duplicates() {
        let tracker = FakeTracker {
            issues: vec![
                issue("AB-1", "done", Some("Fixed"), Some(600)),
                issue("AB-2", "done", Some("Fixed"), Some(5)),
            ],
            transitions: reopen_transitions(),
            ..FakeTracker::default()
        };
        assert_eq!(notify(&config(), &tracker).unwrap(), Outcome::Reopened { key: "AB-2".into() });
    }

    #[test]
    fn open_issue_beats_resolved_duplicate() {
        for resolved_ago in [600, 10] {
            let tracker = FakeTracker {
                issues: vec![
                    issue("AB-2", "indeterminate", None, None),
                    issue("AB-1", "done", Some("Fixed"), Some(resolved_ago)),
                ],
                transitions: reopen_transitions(),
                ..FakeTracker::default()
            };
            let outcome = notify(&config(), &tracker).unwrap();
            assert_eq!(outcome, Outcome::Unresolved { key: "AB-2".into() });
            assert!(!tracker.wrote());
            assert_eq!(tracker.calls().len(), 1);
        }
    }

    #[test]
    fn open_issue_wins_regardless_of_result_order() {
        let tracker = FakeTracker {
            issues: vec![
                issue("AB-1", "done", Some("Fixed"), Some(10)),
                issue("AB-2", "indeterminate", None, None),
            ],
            transitions: reopen_transitions(),
            ..FakeTracker::default()
        };
        assert_eq!(notify(&config(), &tracker).unwrap(), Outcome::Unresolved { key: "AB-2".into() });
        assert!(!tracker.wrote());
    }

    #[test]
    fn reopened_issue_with_stale_resolution_date_counts_as_open() {
        let tracker = FakeTracker {
            issues: vec![
                issue("AB-1", "done", Some("Fixed"), Some(1)),
                issue("AB-2", "new", None, Some(5)),
            ],
            ..FakeTracker::default()
        };
        assert_eq!(notify(&config(), &tracker).unwrap(), Outcome::Unresolved { key: "AB-2".into() });
    }

    #[test]
    fn unavailable_tracker_on_transition_is_retryable() {
        let tracker = FakeTracker {
            issues: vec![issue("AB-1", "done", Some("Fixed"), Some(10))],
            transitions: reopen_transitions(),
            do_transition_error: Some(rejected(
                "issue/AB-1/transitions",
                503,
                "Service Unavailable",
            )),
            ..FakeTracker::default()
        };
        let err = notify(&config(), &tracker).unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("503 Service Unavailable"));
        assert_eq!(tracker.calls()[2], Call::DoTransition("AB-1".into(), "21".into()));
        assert!(!tracker.calls().iter().any(|c| matches!(c, Call::Create(_))));
    }

    #[test]
    fn missing_issue_on_transition_lookup_is_fatal() {
        let tracker = FakeTracker {
            issues: vec![issue("AB-1", "done", Some("Fixed"), Some(10))],
            transitions: reopen_transitions(),
            transitions_error: Some(rejected("issue/AB-1/transitions", 404, "Not Found")),
            ..FakeTracker::default()
        };
        let err = notify(&config(), &tracker).unwrap_err();
        assert!(!err.is_retryable());
        assert!(matches!(err, NotifyError::Rejected { status: 404, .. }));
        assert!(!tracker.wrote());
    }

    #[test]
    fn search_failure_stops_processing() {
        let tracker = FakeTracker {
            search_error: Some(TrackerError::transport("connection refused")),
            ..FakeTracker::default()
        };
        let err = notify(&config(), &tracker).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(tracker.calls().len(), 1);
    }

    #[test]
    fn unavailable_tracker_on_create_is_retryable() {
        let tracker = FakeTracker {
            create_error: Some(TrackerError::with_response(
                "503",
                ApiResponse {
                    url: "https://jira.example.com/rest/api/2/issue".into(),
                    status: 503,
                    reason: "Service Unavailable".into(),
                    body: "maintenance".into(),
                },
            )),
            ..FakeTracker::default()
        };
        let err = notify(&config(), &tracker).unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("503 Service Unavailable"));
        assert!(err.to_string().contains("maintenance"));
    }

    #[test]
    fn project_render_failure_aborts_before_search() {
        let config = ReceiverConfig { project: "{{#if}}".into(), ..config() };
        let tracker = FakeTracker::default();
        let err = notify(&config, &tracker).unwrap_err();
        assert!(matches!(err, NotifyError::Render(_)));
        assert!(!err.is_retryable());
        assert!(tracker.calls().is_empty());
    }

    #[test]
    fn payload_render_failure_aborts_before_create() {
        let config = ReceiverConfig { summary: "{{> no_such_partial}}".into(), ..config() };
        let tracker = FakeTracker::default();
        let err = notify(&config, &tracker).unwrap_err();
        assert!(matches!(err, NotifyError::Render(_)));
        assert!(!tracker.wrote());
    }

    #[test]
    fn missing_label_key_still_creates() {
        let config = ReceiverConfig { label_key: "team".into(), ..config() };
        let tracker = FakeTracker::default();
        notify(&config, &tracker).unwrap();
        let Call::Create(draft) = &tracker.calls()[1] else { panic!("expected create") };
        assert!(draft.labels.is_empty());
    }

    #[test]
    fn optional_fields_are_rendered() {
        let config = ReceiverConfig {
            priority: Some("{{#if commonLabels.page}}Critical{{else}}Major{{/if}}".into()),
            components: vec!["{{upper groupLabels.instance}}".into(), "Ops".into()],
            add_group_labels: true,
            ..config()
        };
        let tracker = FakeTracker::default();
        notify(&config, &tracker).unwrap();

        let Call::Create(draft) = &tracker.calls()[1] else { panic!("expected create") };
        assert_eq!(draft.priority.as_deref(), Some("Major"));
        assert_eq!(draft.components, vec!["A".to_string(), "Ops".to_string()]);
        assert_eq!(
            draft.labels,
            vec![
                "HighCPU".to_string(),
                r#"alertname="HighCPU""#.to_string(),
                r#"instance="a""#.to_string(),
            ]
        );
    }

    #[test]
    fn extra_fields_are_rendered_as_text() {
        let config = ReceiverConfig {
            fields: BTreeMap::from([
                ("customfield_20000".to_string(), "{{groupLabels.instance}}".to_string()),
                ("customfield_10001".to_string(), "overridden".to_string()),
            ]),
            ..config()
        };
        let tracker = FakeTracker::default();
        notify(&config, &tracker).unwrap();

        let Call::Create(draft) = &tracker.calls()[1] else { panic!("expected create") };
        assert_eq!(
            draft.custom_fields.get("customfield_20000"),
            Some(&FieldValue::Text("a".into()))
        );
        assert_eq!(
            draft.custom_fields.get("customfield_10001"),
            Some(&FieldValue::List(vec![GROUP_ID.to_string()]))
        );
    }

    #[test]
    fn extra_field_render_failure_aborts_before_create() {
        let config = ReceiverConfig {
            fields: BTreeMap::from([("customfield_20000".to_string(), "{{#if}}".to_string())]),
            ..config()
        };
        let tracker = FakeTracker::default();
        assert!(matches!(notify(&config, &tracker).unwrap_err(), NotifyError::Render(_)));
        assert!(!tracker.wrote());
    }

    #[test]
    fn assess_covers_every_state() {
        let config = config();
        let now = now();
        assert_eq!(assess(None, &config, now), PriorIssue::None);
        assert_eq!(
            assess(Some(&issue("AB-1", "new", None, None)), &config, now),
            PriorIssue::Open
        );
        assert_eq!(
            assess(Some(&issue("AB-1", "done", Some("Won't Fix"), Some(1))), &config, now),
            PriorIssue::ResolvedWontFix
        );
        assert_eq!(
            assess(Some(&issue("AB-1", "done", Some("Fixed"), Some(59))), &config, now),
            PriorIssue::ResolvedRecently
        );
        assert_eq!(
            assess(Some(&issue("AB-1", "done", Some("Fixed"), Some(60))), &config, now),
            PriorIssue::ResolvedStale
        );
    }

    #[test]
    fn find_transition_matches_exact_name() {
        let transitions = reopen_transitions();
        assert_eq!(find_transition_by_name(&transitions, "Reopen").map(|t| t.id.as_str()), Some("21"));
        assert!(find_transition_by_name(&transitions, "reopen").is_none());
    }

    #[test]
    fn receiver_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Receiver<'static>>();
    }
}
