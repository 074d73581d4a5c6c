use serde::Serialize;
use serde_json::{json, Value};

use crate::context::{Outputs, Status, WorkflowContext, NEUTRAL_COLOR};
use crate::error::RawPayloadError;
use crate::metadata::RunMetadata;

pub const CARD_TYPE: &str = "MessageCard";
pub const CARD_CONTEXT: &str = "https://schema.org/extensions";

/// Dependency identifiers longer than this are cut for display.
pub const NEED_ID_DISPLAY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(rename = "@type")]
    pub card_type: String,
    #[serde(rename = "@context")]
    pub card_context: String,
    pub summary: String,
    pub title: String,
    pub theme_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub sections: Vec<Section>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub potential_action: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msteams: Option<MsTeams>,
}

impl NotificationPayload {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn mentions(&self) -> &[Mention] {
        match &self.msteams {
            Some(m) => &m.entities,
            None => &[],
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Job,
    Steps,
    Needs,
}

impl SectionKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Job => "Job",
            Self::Steps => "Steps",
            Self::Needs => "Needs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(skip)]
    pub kind: SectionKind,
    pub activity_title: String,
    pub markdown: bool,
    pub facts: Vec<Fact>,
}

impl Section {
    fn new(kind: SectionKind, facts: Vec<Fact>) -> Self {
        Self {
            kind,
            activity_title: format!("**{}**", kind.title()),
            markdown: true,
            facts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub name: String,
    pub value: String,
}

/// `OpenUri` action rendered as a button under the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    #[serde(rename = "@type")]
    pub action_type: String,
    pub name: String,
    pub targets: Vec<ActionTarget>,
}

impl Action {
    fn open_uri(name: &str, uri: &str) -> Self {
        Self {
            action_type: "OpenUri".to_string(),
            name: name.to_string(),
            targets: vec![ActionTarget {
                os: "default".to_string(),
                uri: uri.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionTarget {
    pub os: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsTeams {
    pub entities: Vec<Mention>,
}

/// A Teams `mention` entity addressed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mention {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub text: String,
    pub mentioned: MentionedUser,
}

impl Mention {
    pub fn new(email: &str) -> Self {
        Self {
            entity_type: "mention".to_string(),
            text: format!("<at>{email}</at>"),
            mentioned: MentionedUser {
                id: email.to_string(),
                name: email.to_string(),
            },
        }
    }

    pub fn email(&self) -> &str {
        &self.mentioned.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionedUser {
    pub id: String,
    pub name: String,
}

/// Turns a [`WorkflowContext`] into a [`NotificationPayload`].
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    metadata: RunMetadata,
}

impl PayloadBuilder {
    pub fn new(metadata: RunMetadata) -> Self {
        Self { metadata }
    }

    pub fn build(&self, context: &WorkflowContext) -> NotificationPayload {
        let title = context
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(|| self.metadata.default_title(), str::to_owned);

        let theme_color = context
            .statuses()
            .max_by_key(|s| s.severity())
            .map_or(NEUTRAL_COLOR, Status::color)
            .to_string();

        let mut sections = Vec::new();
        if let Some(job) = &context.job {
            sections.push(Section::new(
                SectionKind::Job,
                vec![Fact {
                    name: job.id.clone(),
                    value: fact_value(&job.status, &Outputs::new()),
                }],
            ));
        }
        if !context.steps.is_empty() {
            let facts = context
                .steps
                .iter()
                .map(|step| Fact {
                    name: step.name.clone(),
                    value: fact_value(&step.status, &step.outputs),
                })
                .collect();
            sections.push(Section::new(SectionKind::Steps, facts));
        }
        if !context.needs.is_empty() {
            let facts = context
                .needs
                .iter()
                .map(|(id, need)| Fact {
                    name: truncate_id(id),
                    value: fact_value(&need.result, &need.outputs),
                })
                .collect();
            sections.push(Section::new(SectionKind::Needs, facts));
        }

        let mentions = parse_mentions(context.mention_emails.as_deref());

        NotificationPayload {
            card_type: CARD_TYPE.to_string(),
            card_context: CARD_CONTEXT.to_string(),
            summary: title.clone(),
            title,
            theme_color,
            text: self.summary_text(&mentions),
            sections,
            potential_action: self.actions(),
            msteams: (!mentions.is_empty()).then(|| MsTeams { entities: mentions }),
        }
    }

    fn summary_text(&self, mentions: &[Mention]) -> Option<String> {
        let meta = &self.metadata;
        let mut lines = Vec::new();

        match (&meta.sender_login, &meta.sender_url) {
            (Some(login), Some(url)) => lines.push(format!("Triggered by [{login}]({url})")),
            (Some(login), None) => lines.push(format!("Triggered by {login}")),
            _ => {}
        }
        if meta.commit_count > 0 {
            let mut line = format!("{} commit(s)", meta.commit_count);
            if let Some(ts) = &meta.head_commit_timestamp {
                line.push_str(&format!(", head commit at {ts}"));
            }
            lines.push(line);
        }
        if !mentions.is_empty() {
            let tags: Vec<&str> = mentions.iter().map(|m| m.text.as_str()).collect();
            lines.push(format!("cc {}", tags.join(" ")));
        }

        (!lines.is_empty()).then(|| lines.join("  \n"))
    }

    fn actions(&self) -> Vec<Action> {
        let meta = &self.metadata;
        [
            ("View run", meta.run_url()),
            ("Repository", meta.repository_url.clone()),
            ("Compare", meta.compare_url.clone()),
        ]
        .into_iter()
        .filter_map(|(name, uri)| uri.map(|u| Action::open_uri(name, &u)))
        .collect()
    }
}

/// The fixed document every card starts from.
pub fn card_header() -> Value {
    json!({
        "@type": CARD_TYPE,
        "@context": CARD_CONTEXT,
    })
}

/// Merge a caller-supplied card over [`card_header`]; raw keys win.
pub fn merge_raw(raw: &str) -> Result<Value, RawPayloadError> {
    let Value::Object(raw) = serde_json::from_str::<Value>(raw)? else {
        return Err(RawPayloadError::NotAnObject);
    };
    let mut merged = card_header();
    if let Value::Object(map) = &mut merged {
        map.extend(raw);
    }
    Ok(merged)
}

/// Split a comma-separated email list into mentions, skipping blanks.
pub fn parse_mentions(raw: Option<&str>) -> Vec<Mention> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Mention::new)
        .collect()
}

pub fn truncate_id(id: &str) -> String {
    id.chars().take(NEED_ID_DISPLAY_LIMIT).collect()
}

fn fact_value(status: &Status, outputs: &Outputs) -> String {
    let mut value = status.to_string();
    for (key, output) in outputs {
        value.push_str(&format!("  \n`{key}`: {output}"));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Job, Need, Step};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn outputs(pairs: &[(&str, &str)]) -> Outputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_context() -> WorkflowContext {
        WorkflowContext {
            job: Some(Job {
                id: "job_1".into(),
                status: Status::Success,
            }),
            steps: vec![Step {
                name: "step_1".into(),
                status: Status::Success,
                outputs: outputs(&[("key1", "value1")]),
            }],
            needs: [(
                "need_1".to_string(),
                Need {
                    result: Status::Success,
                    outputs: outputs(&[("key2", "value2")]),
                },
            )]
            .into_iter()
            .collect(),
            title: Some("Test Title".into()),
            mention_emails: None,
        }
    }

    #[test]
    fn job_only_context() {
        let ctx = WorkflowContext {
            job: Some(Job {
                id: "job_1".into(),
                status: Status::Success,
            }),
            title: Some("Test Title".into()),
            mention_emails: Some(String::new()),
            ..Default::default()
        };
        let payload = PayloadBuilder::default().build(&ctx);

        assert_eq!(payload.title, "Test Title");
        assert_eq!(payload.theme_color, Status::Success.color());
        assert_eq!(payload.sections.len(), 1);
        let job = payload.section(SectionKind::Job).unwrap();
        assert_eq!(
            job.facts,
            vec![Fact {
                name: "job_1".into(),
                value: "success".into()
            }]
        );
        assert!(payload.section(SectionKind::Steps).is_none());
        assert!(payload.section(SectionKind::Needs).is_none());
        assert!(payload.mentions().is_empty());
    }

    #[test]
    fn empty_sources_are_omitted() {
        let builder = PayloadBuilder::default();

        let mut ctx = full_context();
        ctx.steps.clear();
        let payload = builder.build(&ctx);
        assert!(payload.section(SectionKind::Steps).is_none());
        assert!(payload.section(SectionKind::Needs).is_some());

        let mut ctx = full_context();
        ctx.needs.clear();
        let payload = builder.build(&ctx);
        assert!(payload.section(SectionKind::Needs).is_none());

        let mut ctx = full_context();
        ctx.job = None;
        let payload = builder.build(&ctx);
        assert!(payload.section(SectionKind::Job).is_none());
        assert_eq!(payload.sections.len(), 2);
    }

    #[test]
    fn all_absent_context_still_has_title_and_neutral_color() {
        let payload = PayloadBuilder::default().build(&WorkflowContext::default());
        assert_eq!(payload.title, "Workflow run");
        assert_eq!(payload.summary, "Workflow run");
        assert_eq!(payload.theme_color, NEUTRAL_COLOR);
        assert!(payload.sections.is_empty());
        assert!(payload.mentions().is_empty());
        assert!(payload.text.is_none());
    }

    #[test]
    fn blank_title_uses_metadata_default() {
        let builder = PayloadBuilder::new(RunMetadata {
            workflow: Some("test_workflow".into()),
            repository: Some("name".into()),
            event_name: Some("push".into()),
            ..Default::default()
        });
        let ctx = WorkflowContext {
            title: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(builder.build(&ctx).title, "test_workflow on name (push)");
    }

    #[test]
    fn most_severe_status_picks_color() {
        let builder = PayloadBuilder::default();

        let mut ctx = full_context();
        ctx.steps.push(Step {
            name: "step_2".into(),
            status: Status::Failure,
            outputs: outputs(&[("key3", "value3")]),
        });
        ctx.needs.insert(
            "need_2".into(),
            Need {
                result: Status::Cancelled,
                outputs: Outputs::new(),
            },
        );
        assert_eq!(builder.build(&ctx).theme_color, Status::Failure.color());

        let mut ctx = full_context();
        ctx.needs.insert(
            "need_2".into(),
            Need {
                result: Status::Cancelled,
                outputs: Outputs::new(),
            },
        );
        assert_eq!(builder.build(&ctx).theme_color, Status::Cancelled.color());

        let mut ctx = full_context();
        ctx.needs.insert(
            "need_2".into(),
            Need {
                result: Status::Custom("custom".into()),
                outputs: Outputs::new(),
            },
        );
        assert_eq!(builder.build(&ctx).theme_color, NEUTRAL_COLOR);
    }

    #[test]
    fn steps_render_outputs_in_order() {
        let mut ctx = full_context();
        ctx.steps.push(Step {
            name: "step_2".into(),
            status: Status::Failure,
            outputs: Outputs::new(),
        });
        let payload = PayloadBuilder::default().build(&ctx);
        let steps = payload.section(SectionKind::Steps).unwrap();
        assert_eq!(steps.facts[0].name, "step_1");
        assert_eq!(steps.facts[0].value, "success  \n`key1`: value1");
        assert_eq!(steps.facts[1].name, "step_2");
        assert_eq!(steps.facts[1].value, "failure");
    }

    #[test]
    fn long_need_ids_are_truncated() {
        let mut ctx = full_context();
        ctx.needs.insert(
            "abcdefghijklmnoprstuwxyz".into(),
            Need {
                result: Status::Success,
                outputs: outputs(&[("key5", "value5")]),
            },
        );
        ctx.needs.insert(
            "need_custom".into(),
            Need {
                result: Status::Custom("custom".into()),
                outputs: Outputs::new(),
            },
        );
        let payload = PayloadBuilder::default().build(&ctx);
        let names: Vec<&str> = payload
            .section(SectionKind::Needs)
            .unwrap()
            .facts
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["need_1", "abcdefghijklmnoprstu", "need_custom"]);
        assert_eq!(names[1].len(), NEED_ID_DISPLAY_LIMIT);
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_id("short"), "short");
        assert_eq!(truncate_id("exactly_twenty_chars"), "exactly_twenty_chars");
        let wide = "é".repeat(25);
        let cut = truncate_id(&wide);
        assert_eq!(cut.chars().count(), NEED_ID_DISPLAY_LIMIT);
        assert!(wide.starts_with(&cut));
    }

    #[test]
    fn mentions_are_trimmed_and_ordered() {
        let emails: Vec<String> = parse_mentions(Some("a@x.com, b@y.com"))
            .iter()
            .map(|m| m.email().to_string())
            .collect();
        assert_eq!(emails, vec!["a@x.com", "b@y.com"]);
        assert!(parse_mentions(Some("")).is_empty());
        assert!(parse_mentions(Some(" , ,")).is_empty());
        assert!(parse_mentions(None).is_empty());
    }

    #[test]
    fn serialized_card_shape() {
        let mut ctx = full_context();
        ctx.mention_emails = Some("foo1@bar.com, foo2@bar.com".into());
        let builder = PayloadBuilder::new(RunMetadata {
            repository_url: Some("html_url".into()),
            compare_url: Some("compare_url".into()),
            sender_login: Some("login".into()),
            sender_url: Some("url".into()),
            ..Default::default()
        });
        let value = builder.build(&ctx).to_value().unwrap();

        assert_eq!(value["@type"], "MessageCard");
        assert_eq!(value["@context"], "https://schema.org/extensions");
        assert_eq!(value["themeColor"], Status::Success.color());
        assert_eq!(value["sections"][0]["activityTitle"], "**Job**");
        assert!(value["sections"][0].get("kind").is_none());
        assert_eq!(value["potentialAction"][0]["name"], "Repository");
        assert_eq!(
            value["msteams"]["entities"][1],
            json!({
                "type": "mention",
                "text": "<at>foo2@bar.com</at>",
                "mentioned": {"id": "foo2@bar.com", "name": "foo2@bar.com"}
            })
        );
        assert_eq!(
            value["text"],
            "Triggered by [login](url)  \ncc <at>foo1@bar.com</at> <at>foo2@bar.com</at>"
        );
    }

    #[test]
    fn card_without_extras_skips_optional_keys() {
        let value = PayloadBuilder::default()
            .build(&WorkflowContext::default())
            .to_value()
            .unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("text"));
        assert!(!obj.contains_key("potentialAction"));
        assert!(!obj.contains_key("msteams"));
        assert_eq!(value["sections"], json!([]));
    }

    #[test]
    fn raw_payload_is_merged_over_header() {
        let merged = merge_raw(r#"{"custom": "payload", "@context": "override"}"#).unwrap();
        assert_eq!(
            merged,
            json!({"@type": "MessageCard", "@context": "override", "custom": "payload"})
        );
        assert!(matches!(merge_raw("[1]"), Err(RawPayloadError::NotAnObject)));
        assert!(matches!(merge_raw("{oops"), Err(RawPayloadError::Json(_))));
    }
}
