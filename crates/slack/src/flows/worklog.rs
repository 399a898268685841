//! Daily work logging against the issue tracker.
//!
//! `jira autolog` offers a "Log work" button; the button opens a modal listing
//! the issues the assignee had in progress today, and submitting it spreads the
//! daily budget evenly over the selected issues.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use deskbot_core::{
    issue::{dedupe_by_key, in_progress_jql, text_search_jql},
    state,
    worklog::{format_jira_duration, WorkShare},
    ChannelContext, Issue, IssueKey, IssueTracker, WorkAllocationRequest,
};
use tracing::{debug, info, warn};

use super::{display_names, system_clock, Clock};
use crate::{
    blocks::{BlockElement, ButtonElement, MessageBuilder, MessageTemplate, ModalBuilder, ModalView, SelectOption},
    client::ChatClient,
    events::{
        ComponentActionEvent, EventContext, EventHandler, FormSubmissionEvent, HandlerError,
        HandlerResult, TextMessageEvent,
    },
    matcher::command_words,
};

pub const JIRA_TRIGGER: &str = "jira";
pub const OPEN_WORKLOG_ACTION: &str = "worklog_open";
pub const WORKLOG_CALLBACK_ID: &str = "worklog_submit";

const ISSUES_ACTION: &str = "worklog_issues";
const DATE_ACTION: &str = "worklog_date";
/// Static select menus accept at most this many options.
const MAX_ISSUE_OPTIONS: usize = 100;
const CURRENT_USER: &str = "currentUser()";
const WORKLOG_NOTE: &str = "Logged from Slack";

pub const USAGE: &str = "Usage: `jira autolog`, `jira search <text>` or `jira remind HH:MM` (UTC)";

#[derive(Clone, Debug)]
pub struct WorklogSettings {
    /// Tracker login whose work is logged; the API user when unset.
    pub assignee: Option<String>,
    pub budget: Duration,
    pub clock: Clock,
}

impl Default for WorklogSettings {
    fn default() -> Self {
        Self { assignee: None, budget: Duration::minutes(360), clock: system_clock }
    }
}

impl WorklogSettings {
    fn assignee(&self) -> &str {
        self.assignee.as_deref().unwrap_or(CURRENT_USER)
    }

    fn today(&self) -> NaiveDate {
        (self.clock)().date_naive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Subcommand {
    Autolog,
    Search(String),
    Remind(NaiveTime),
    Usage,
}

/// `None` when the message only mentions the trigger without addressing it.
fn parse_subcommand(text: &str) -> Option<Subcommand> {
    let words = command_words(text, JIRA_TRIGGER)?;
    let subcommand = match words.as_slice() {
        [first, ..] if first.eq_ignore_ascii_case("autolog") => Subcommand::Autolog,
        [first, rest @ ..] if first.eq_ignore_ascii_case("search") && !rest.is_empty() => {
            Subcommand::Search(rest.join(" "))
        }
        [first, time] if first.eq_ignore_ascii_case("remind") => NaiveTime::parse_from_str(time, "%H:%M")
            .map(Subcommand::Remind)
            .unwrap_or(Subcommand::Usage),
        _ => Subcommand::Usage,
    };
    Some(subcommand)
}

/// Next occurrence of `time` (UTC) strictly after `now`.
pub fn next_occurrence(now: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(time).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

pub fn autolog_message(issue_count: usize) -> MessageTemplate {
    MessageBuilder::new("Log today's work")
        .section("worklog.intro.v1", |section| {
            section.mrkdwn(format!(
                "You have *{issue_count}* issue(s) in progress today. Pick the ones to log work against."
            ));
        })
        .actions("worklog.actions.v1", |actions| {
            actions.button(ButtonElement::new(OPEN_WORKLOG_ACTION, "Log work").value("open"));
        })
        .build()
}

pub fn worklog_modal(issues: &[Issue], date: NaiveDate, context_token: String) -> ModalView {
    let options = issues
        .iter()
        .take(MAX_ISSUE_OPTIONS)
        .map(|issue| SelectOption::new(issue.label(), issue.key.as_str()))
        .collect();

    ModalBuilder::new(WORKLOG_CALLBACK_ID, "Log work")
        .submit("Log")
        .close("Cancel")
        .private_metadata(context_token)
        .input("worklog_issues_block", "Issues", BlockElement::multi_static_select(ISSUES_ACTION, options), false)
        .input("worklog_date_block", "Date", BlockElement::datepicker(DATE_ACTION, Some(date)), true)
        .build()
}

fn logged_lines(shares: &[&WorkShare<IssueKey>]) -> String {
    shares
        .iter()
        .map(|share| format!("• {} {}", share.item, format_jira_duration(share.duration)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn partial_failure_message(logged: &[&WorkShare<IssueKey>], failed: &IssueKey) -> MessageTemplate {
    if logged.is_empty() {
        return MessageTemplate::plain(format!("Logging work on {failed} failed; nothing was logged."));
    }
    MessageTemplate::plain(format!(
        "Logging work on {failed} failed. Already logged:\n{}",
        logged_lines(logged)
    ))
}

fn search_results(issues: &[Issue]) -> MessageTemplate {
    if issues.is_empty() {
        return MessageTemplate::plain("No issues found");
    }
    let lines = issues.iter().map(Issue::label).collect::<Vec<_>>().join("\n");
    MessageTemplate::plain(lines)
}

fn selected_keys(event: &FormSubmissionEvent) -> Vec<IssueKey> {
    let mut keys: Vec<IssueKey> = Vec::new();
    for option in event.state.selected_options(ISSUES_ACTION) {
        let key = IssueKey(option.value.clone());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

pub struct WorklogFlow {
    chat: Arc<dyn ChatClient>,
    tracker: Arc<dyn IssueTracker>,
    settings: WorklogSettings,
}

impl WorklogFlow {
    pub fn new(chat: Arc<dyn ChatClient>, tracker: Arc<dyn IssueTracker>, settings: WorklogSettings) -> Self {
        Self { chat, tracker, settings }
    }

    async fn issues_in_progress(&self, date: NaiveDate) -> Result<Vec<Issue>, HandlerError> {
        let jql = in_progress_jql(self.settings.assignee(), date);
        Ok(dedupe_by_key(self.tracker.query_issues(&jql).await?))
    }

    async fn remind(&self, channel_id: &str, time: NaiveTime, ctx: &EventContext) -> Result<(), HandlerError> {
        let send_at = next_occurrence((self.settings.clock)(), time);
        let scheduled_id = self
            .chat
            .schedule_message(channel_id, "Time to log today's work: `jira autolog`", send_at)
            .await?;
        info!(
            event_name = "flow.worklog.reminder_scheduled",
            correlation_id = %ctx.correlation_id,
            scheduled_message_id = %scheduled_id,
            send_at = %send_at,
            "work log reminder scheduled"
        );

        let confirmation = format!("Reminder scheduled for {} UTC", send_at.format("%Y-%m-%d %H:%M"));
        self.chat.post_message(channel_id, &MessageTemplate::plain(confirmation)).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for WorklogFlow {
    fn name(&self) -> &'static str {
        "worklog"
    }

    async fn on_message(
        &self,
        event: &TextMessageEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(subcommand) = parse_subcommand(&event.text) else {
            debug!(correlation_id = %ctx.correlation_id, "jira mentioned without a command");
            return Ok(HandlerResult::Ignored);
        };
        let (user, channel) =
            display_names(self.chat.as_ref(), &event.user_id, &event.channel_id).await;
        info!(
            event_name = "flow.worklog.command",
            correlation_id = %ctx.correlation_id,
            user = %user,
            channel = %channel,
            subcommand = ?subcommand,
            "jira command received"
        );

        match subcommand {
            Subcommand::Autolog => {
                let issues = self.issues_in_progress(self.settings.today()).await?;
                self.chat.post_message(&event.channel_id, &autolog_message(issues.len())).await?;
            }
            Subcommand::Search(text) => {
                let jql = text_search_jql(&text, self.settings.assignee.as_deref());
                let issues = dedupe_by_key(self.tracker.query_issues(&jql).await?);
                self.chat.post_message(&event.channel_id, &search_results(&issues)).await?;
            }
            Subcommand::Remind(time) => self.remind(&event.channel_id, time, ctx).await?,
            Subcommand::Usage => {
                self.chat.post_message(&event.channel_id, &MessageTemplate::plain(USAGE)).await?;
            }
        }
        Ok(HandlerResult::Processed)
    }

    async fn on_action(
        &self,
        event: &ComponentActionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let today = self.settings.today();
        let issues = self.issues_in_progress(today).await?;

        let token = match event.channel_id.as_deref() {
            Some(channel_id) => {
                let channel_name = match event.channel_name.clone() {
                    Some(name) => name,
                    None => display_names(self.chat.as_ref(), &event.user_id, channel_id).await.1,
                };
                state::encode(&ChannelContext::new(channel_id, channel_name))
            }
            None => String::new(),
        };

        if issues.is_empty() {
            info!(correlation_id = %ctx.correlation_id, "no issues in progress; skipping modal");
            if let Some(channel_id) = event.channel_id.as_deref() {
                self.chat
                    .post_message(channel_id, &MessageTemplate::plain("No issues to log work against"))
                    .await?;
            }
            return Ok(HandlerResult::Processed);
        }

        info!(
            event_name = "flow.worklog.opened",
            correlation_id = %ctx.correlation_id,
            issue_count = issues.len(),
            "opening work log modal"
        );
        self.chat.open_view(&event.trigger_id, &worklog_modal(&issues, today, token)).await?;
        Ok(HandlerResult::Processed)
    }

    async fn on_submission(
        &self,
        event: &FormSubmissionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let context = match state::decode::<ChannelContext>(&event.private_metadata) {
            Ok(context) => context,
            Err(error) => {
                warn!(correlation_id = %ctx.correlation_id, error = %error, "work log channel context unreadable");
                None
            }
        };
        let keys = selected_keys(event);
        let date = event.state.date(DATE_ACTION).unwrap_or_else(|| self.settings.today());

        if keys.is_empty() {
            if let Some(context) = &context {
                self.chat
                    .post_message(
                        &context.channel_id,
                        &MessageTemplate::plain("No issues selected; nothing was logged."),
                    )
                    .await?;
            }
            return Ok(HandlerResult::Processed);
        }

        let plan = WorkAllocationRequest::new(keys, self.settings.budget, date).plan();
        let mut logged: Vec<&WorkShare<IssueKey>> = Vec::new();
        for share in &plan.shares {
            if share.duration <= Duration::zero() {
                warn!(
                    correlation_id = %ctx.correlation_id,
                    issue = %share.item,
                    budget_minutes = plan.budget.num_minutes(),
                    "work share rounds down to zero minutes; skipped"
                );
                continue;
            }
            if let Err(error) = self
                .tracker
                .record_work(&share.item, share.duration, plan.reference_date, WORKLOG_NOTE)
                .await
            {
                if let Some(context) = &context {
                    let notice = partial_failure_message(&logged, &share.item);
                    if let Err(post_error) = self.chat.post_message(&context.channel_id, &notice).await {
                        warn!(
                            correlation_id = %ctx.correlation_id,
                            error = %post_error,
                            "failed to post partial work log notice"
                        );
                    }
                }
                return Err(error.into());
            }
            logged.push(share);
        }

        let unallocated = plan.unallocated();
        if unallocated > Duration::zero() {
            warn!(
                correlation_id = %ctx.correlation_id,
                unallocated_minutes = unallocated.num_minutes(),
                "work budget did not split evenly; remainder not logged"
            );
        }
        info!(
            event_name = "flow.worklog.recorded",
            correlation_id = %ctx.correlation_id,
            user = event.user_name.as_deref().unwrap_or(&event.user_id),
            issue_count = logged.len(),
            date = %plan.reference_date,
            "work logged"
        );

        let Some(context) = context else {
            warn!(correlation_id = %ctx.correlation_id, "work logged but no channel to report to");
            return Ok(HandlerResult::Processed);
        };
        if logged.is_empty() {
            let notice = format!(
                "A {} budget is too small to split across {} issues; nothing was logged.",
                format_jira_duration(plan.budget),
                plan.shares.len()
            );
            self.chat.post_message(&context.channel_id, &MessageTemplate::plain(notice)).await?;
            return Ok(HandlerResult::Processed);
        }
        let total = logged.iter().fold(Duration::zero(), |total, share| total + share.duration);
        let summary = MessageBuilder::new(format!(
            "Logged {} across {} issue(s)",
            format_jira_duration(total),
            logged.len()
        ))
        .section("worklog.summary.v1", |section| {
            section.mrkdwn(format!(
                "Logged work for {}:\n{}",
                plan.reference_date.format("%Y-%m-%d"),
                logged_lines(&logged)
            ));
        })
        .build();
        self.chat.post_message(&context.channel_id, &summary).await?;
        Ok(HandlerResult::Processed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
    use deskbot_core::{state, ChannelContext, Issue, IssueKey, TrackerError};

    use super::{
        next_occurrence, parse_subcommand, Subcommand, WorklogFlow, WorklogSettings, USAGE,
    };
    use crate::{
        blocks::{Block, BlockElement, MessageTemplate},
        events::{
            ComponentActionEvent, EventContext, EventHandler, FormState, FormSubmissionEvent,
            FormValue, HandlerError, HandlerResult, SelectedOption, TextMessageEvent,
        },
        recording::{ChatCall, RecordingChatClient, StaticIssueTracker},
    };

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 17, 30, 0).single().expect("valid instant")
    }

    fn settings() -> WorklogSettings {
        WorklogSettings { assignee: Some("jdoe".to_owned()), budget: Duration::minutes(360), clock: fixed_now }
    }

    fn message(text: &str) -> TextMessageEvent {
        TextMessageEvent {
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            text: text.to_owned(),
            ts: "1730000000.0001".to_owned(),
            thread_ts: None,
        }
    }

    fn open_click() -> ComponentActionEvent {
        ComponentActionEvent {
            user_id: "U1".to_owned(),
            user_name: Some("jane".to_owned()),
            channel_id: Some("C1".to_owned()),
            channel_name: Some("general".to_owned()),
            action_id: "worklog_open".to_owned(),
            block_id: "worklog.actions.v1".to_owned(),
            value: Some("open".to_owned()),
            trigger_id: "T1".to_owned(),
            message: None,
            view_metadata: None,
        }
    }

    fn submission(keys: &[&str], date: Option<NaiveDate>) -> FormSubmissionEvent {
        let selected = keys.iter().map(|key| SelectedOption::new(*key, *key)).collect();
        FormSubmissionEvent {
            user_id: "U1".to_owned(),
            user_name: None,
            view_id: "V1".to_owned(),
            callback_id: "worklog_submit".to_owned(),
            state: FormState::new()
                .with("worklog_issues", FormValue::MultiStaticSelect(selected))
                .with("worklog_date", FormValue::Date(date)),
            private_metadata: state::encode(&ChannelContext::new("C1", "general")),
        }
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date")
    }

    #[test]
    fn subcommands_parse_case_insensitively() {
        assert_eq!(parse_subcommand("Jira AUTOLOG"), Some(Subcommand::Autolog));
        assert_eq!(
            parse_subcommand("jira search flaky  test"),
            Some(Subcommand::Search("flaky test".to_owned()))
        );
        assert_eq!(
            parse_subcommand("jira remind 09:15"),
            Some(Subcommand::Remind(NaiveTime::from_hms_opt(9, 15, 0).expect("valid time")))
        );
        assert_eq!(parse_subcommand("jira remind later"), Some(Subcommand::Usage));
        assert_eq!(parse_subcommand("jira search"), Some(Subcommand::Usage));
        assert_eq!(parse_subcommand("jira"), Some(Subcommand::Usage));
    }

    #[test]
    fn mentions_are_not_commands() {
        assert_eq!(parse_subcommand("the jira board is slow this morning"), None);
        assert_eq!(parse_subcommand("ask jira-admin"), None);
        assert_eq!(parse_subcommand("jira-admin autolog"), None);
    }

    #[test]
    fn reminder_rolls_over_to_tomorrow_once_passed() {
        let now = fixed_now();
        let later = NaiveTime::from_hms_opt(18, 0, 0).expect("valid time");
        let earlier = NaiveTime::from_hms_opt(9, 0, 0).expect("valid time");

        assert_eq!(next_occurrence(now, later), Utc.with_ymd_and_hms(2026, 3, 9, 18, 0, 0).unwrap());
        assert_eq!(next_occurrence(now, earlier), Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn autolog_queries_in_progress_issues_for_today() {
        let chat = Arc::new(RecordingChatClient::default());
        let tracker = Arc::new(StaticIssueTracker::new(vec![Issue::new("OPS-1", "Patch")]));
        let flow = WorklogFlow::new(chat.clone(), tracker.clone(), settings());

        flow.on_message(&message("jira autolog"), &EventContext::default()).await.expect("autolog");

        let queries = tracker.queries().await;
        assert_eq!(queries.len(), 1);
        assert!(queries[0].starts_with("assignee=jdoe"));
        assert!(queries[0].ends_with("ON 2026-03-09)"));
        let posted = chat.posted_messages().await;
        let Block::Actions { elements, .. } = &posted[0].1.blocks[1] else {
            panic!("expected the Log work button");
        };
        assert!(matches!(&elements[0], BlockElement::Button(button) if button.action_id == "worklog_open"));
    }

    #[tokio::test]
    async fn unknown_subcommand_posts_usage() {
        let chat = Arc::new(RecordingChatClient::default());
        let flow = WorklogFlow::new(chat.clone(), Arc::new(StaticIssueTracker::default()), settings());

        flow.on_message(&message("jira please"), &EventContext::default()).await.expect("usage");

        assert_eq!(chat.posted_messages().await, vec![("C1".to_owned(), MessageTemplate::plain(USAGE))]);
    }

    #[tokio::test]
    async fn passing_mention_gets_no_reply() {
        let chat = Arc::new(RecordingChatClient::default());
        let tracker = Arc::new(StaticIssueTracker::default());
        let flow = WorklogFlow::new(chat.clone(), tracker.clone(), settings());

        let result = flow
            .on_message(&message("the jira board is slow this morning"), &EventContext::default())
            .await
            .expect("mention");

        assert_eq!(result, HandlerResult::Ignored);
        assert!(chat.calls().await.is_empty());
        assert!(tracker.queries().await.is_empty());
    }

    #[tokio::test]
    async fn search_lists_matches_or_says_none() {
        let chat = Arc::new(RecordingChatClient::default());
        let tracker = Arc::new(StaticIssueTracker::new(vec![
            Issue::new("OPS-1", "Patch"),
            Issue::new("OPS-1", "Patch again"),
            Issue::new("OPS-2", "Rotate certs"),
        ]));
        let flow = WorklogFlow::new(chat.clone(), tracker, settings());
        flow.on_message(&message("jira search patch"), &EventContext::default()).await.expect("search");

        let empty_chat = Arc::new(RecordingChatClient::default());
        let empty = WorklogFlow::new(empty_chat.clone(), Arc::new(StaticIssueTracker::default()), settings());
        empty.on_message(&message("jira search patch"), &EventContext::default()).await.expect("search");

        assert_eq!(
            chat.posted_messages().await[0].1,
            MessageTemplate::plain("OPS-1 Patch\nOPS-2 Rotate certs")
        );
        assert_eq!(empty_chat.posted_messages().await[0].1, MessageTemplate::plain("No issues found"));
    }

    #[tokio::test]
    async fn remind_schedules_and_confirms() {
        let chat = Arc::new(RecordingChatClient::default());
        let flow = WorklogFlow::new(chat.clone(), Arc::new(StaticIssueTracker::default()), settings());

        flow.on_message(&message("jira remind 17:00"), &EventContext::default()).await.expect("remind");

        let calls = chat.calls().await;
        assert!(matches!(
            &calls[0],
            ChatCall::ScheduleMessage { channel_id, send_at, .. }
                if channel_id == "C1" && *send_at == Utc.with_ymd_and_hms(2026, 3, 10, 17, 0, 0).unwrap()
        ));
        assert_eq!(
            chat.posted_messages().await[0].1,
            MessageTemplate::plain("Reminder scheduled for 2026-03-10 17:00 UTC")
        );
    }

    #[tokio::test]
    async fn open_lists_deduplicated_issues_with_today_preselected() {
        let chat = Arc::new(RecordingChatClient::default());
        let tracker = Arc::new(StaticIssueTracker::new(vec![
            Issue::new("OPS-2", "Rotate certs"),
            Issue::new("OPS-1", "Patch"),
            Issue::new("OPS-2", "Rotate certs"),
        ]));
        let flow = WorklogFlow::new(chat.clone(), tracker, settings());

        flow.on_action(&open_click(), &EventContext::default()).await.expect("open");

        let views = chat.opened_views().await;
        assert_eq!(views.len(), 1);
        let Block::Input { element: BlockElement::MultiStaticSelect(menu), .. } = &views[0].blocks[0] else {
            panic!("expected issue multi-select");
        };
        let values: Vec<_> = menu.options.iter().map(|option| option.value.as_str()).collect();
        assert_eq!(values, vec!["OPS-2", "OPS-1"]);
        let Block::Input { element: BlockElement::Datepicker(picker), .. } = &views[0].blocks[1] else {
            panic!("expected date picker");
        };
        assert_eq!(picker.initial_date.as_deref(), Some("2026-03-09"));
        assert_eq!(
            state::decode::<ChannelContext>(&views[0].private_metadata),
            Ok(Some(ChannelContext::new("C1", "general")))
        );
    }

    #[tokio::test]
    async fn open_without_issues_explains_instead_of_opening() {
        let chat = Arc::new(RecordingChatClient::default());
        let flow = WorklogFlow::new(chat.clone(), Arc::new(StaticIssueTracker::default()), settings());

        flow.on_action(&open_click(), &EventContext::default()).await.expect("open");

        assert!(chat.opened_views().await.is_empty());
        assert_eq!(
            chat.posted_messages().await,
            vec![("C1".to_owned(), MessageTemplate::plain("No issues to log work against"))]
        );
    }

    #[tokio::test]
    async fn submission_splits_budget_evenly() {
        let chat = Arc::new(RecordingChatClient::default());
        let tracker = Arc::new(StaticIssueTracker::default());
        let flow = WorklogFlow::new(chat.clone(), tracker.clone(), settings());

        flow.on_submission(&submission(&["OPS-1", "OPS-2", "OPS-3", "OPS-1"], Some(march(6))), &EventContext::default())
            .await
            .expect("submit");

        let worklogs = tracker.worklogs().await;
        let logged: Vec<_> = worklogs.iter().map(|log| (log.key.clone(), log.duration, log.date)).collect();
        assert_eq!(
            logged,
            vec![
                (IssueKey("OPS-1".to_owned()), Duration::minutes(120), march(6)),
                (IssueKey("OPS-2".to_owned()), Duration::minutes(120), march(6)),
                (IssueKey("OPS-3".to_owned()), Duration::minutes(120), march(6)),
            ]
        );
        let posted = chat.posted_messages().await;
        assert_eq!(posted[0].0, "C1");
        assert_eq!(posted[0].1.fallback_text, "Logged 360m across 3 issue(s)");
    }

    #[tokio::test]
    async fn submission_without_date_uses_today() {
        let tracker = Arc::new(StaticIssueTracker::default());
        let flow = WorklogFlow::new(Arc::new(RecordingChatClient::default()), tracker.clone(), settings());

        flow.on_submission(&submission(&["OPS-9"], None), &EventContext::default()).await.expect("submit");

        let worklogs = tracker.worklogs().await;
        assert_eq!(worklogs[0].date, march(9));
        assert_eq!(worklogs[0].duration, Duration::minutes(360));
    }

    #[tokio::test]
    async fn empty_selection_logs_nothing() {
        let chat = Arc::new(RecordingChatClient::default());
        let tracker = Arc::new(StaticIssueTracker::default());
        let flow = WorklogFlow::new(chat.clone(), tracker.clone(), settings());

        flow.on_submission(&submission(&[], None), &EventContext::default()).await.expect("submit");

        assert!(tracker.worklogs().await.is_empty());
        assert_eq!(
            chat.posted_messages().await[0].1,
            MessageTemplate::plain("No issues selected; nothing was logged.")
        );
    }

    #[tokio::test]
    async fn tracker_failure_surfaces_as_handler_error() {
        let error = TrackerError::Api { status: 400, message: "worklog rejected".to_owned() };
        let tracker = Arc::new(StaticIssueTracker::default().failing_with(error.clone()));
        let chat = Arc::new(RecordingChatClient::default());
        let flow = WorklogFlow::new(chat.clone(), tracker, settings());

        let result = flow.on_submission(&submission(&["OPS-1"], None), &EventContext::default()).await;

        assert_eq!(result, Err(HandlerError::Tracker(error)));
        assert_eq!(
            chat.posted_messages().await,
            vec![("C1".to_owned(), MessageTemplate::plain("Logging work on OPS-1 failed; nothing was logged."))]
        );
    }

    #[tokio::test]
    async fn failure_midway_reports_what_was_already_logged() {
        let error = TrackerError::Api { status: 400, message: "worklog rejected".to_owned() };
        let tracker = Arc::new(StaticIssueTracker::default().rejecting_worklogs_after(1, error.clone()));
        let chat = Arc::new(RecordingChatClient::default());
        let flow = WorklogFlow::new(chat.clone(), tracker.clone(), settings());

        let result = flow
            .on_submission(&submission(&["OPS-1", "OPS-2", "OPS-3"], Some(march(6))), &EventContext::default())
            .await;

        assert_eq!(result, Err(HandlerError::Tracker(error)));
        assert_eq!(tracker.worklogs().await.len(), 1);
        assert_eq!(
            chat.posted_messages().await,
            vec![(
                "C1".to_owned(),
                MessageTemplate::plain("Logging work on OPS-2 failed. Already logged:\n• OPS-1 120m")
            )]
        );
    }

    #[tokio::test]
    async fn zero_minute_shares_are_not_sent() {
        let chat = Arc::new(RecordingChatClient::default());
        let tracker = Arc::new(StaticIssueTracker::default());
        let tight = WorklogSettings { budget: Duration::minutes(2), ..settings() };
        let flow = WorklogFlow::new(chat.clone(), tracker.clone(), tight);

        flow.on_submission(&submission(&["OPS-1", "OPS-2", "OPS-3"], Some(march(6))), &EventContext::default())
            .await
            .expect("submit");

        assert!(tracker.worklogs().await.is_empty());
        assert_eq!(
            chat.posted_messages().await[0].1,
            MessageTemplate::plain("A 2m budget is too small to split across 3 issues; nothing was logged.")
        );
    }
}
