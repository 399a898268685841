use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Slack caps option labels at 75 characters.
pub const MAX_OPTION_TEXT_CHARS: usize = 75;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }

    /// Same text object kind with new content.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        match self {
            Self::Plain { .. } => Self::plain(text),
            Self::Mrkdwn { .. } => Self::mrkdwn(text),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            value: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        let label: String = label.into();
        let label = if label.chars().count() > MAX_OPTION_TEXT_CHARS {
            let mut truncated: String = label.chars().take(MAX_OPTION_TEXT_CHARS - 1).collect();
            truncated.push('…');
            truncated
        } else {
            label
        };
        Self { text: TextObject::plain(label), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainTextInput {
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multiline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectMenu {
    pub action_id: String,
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub action_id: String,
    pub options: Vec<SelectOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePicker {
    pub action_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePicker {
    pub action_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSelect {
    pub action_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockElement {
    Button(ButtonElement),
    PlainTextInput(PlainTextInput),
    StaticSelect(SelectMenu),
    MultiStaticSelect(SelectMenu),
    Datepicker(DatePicker),
    Timepicker(TimePicker),
    RadioButtons(OptionGroup),
    Checkboxes(OptionGroup),
    UsersSelect(UserSelect),
    /// Elements this crate does not model; kept verbatim so updates echo them back.
    #[serde(untagged)]
    Other(Value),
}

impl BlockElement {
    pub fn plain_text_input(action_id: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self::PlainTextInput(PlainTextInput {
            action_id: action_id.into(),
            placeholder: Some(TextObject::plain(placeholder)),
            multiline: false,
        })
    }

    pub fn static_select(action_id: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::StaticSelect(SelectMenu { action_id: action_id.into(), options, placeholder: None })
    }

    pub fn multi_static_select(action_id: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::MultiStaticSelect(SelectMenu {
            action_id: action_id.into(),
            options,
            placeholder: None,
        })
    }

    pub fn datepicker(action_id: impl Into<String>, initial_date: Option<NaiveDate>) -> Self {
        Self::Datepicker(DatePicker {
            action_id: action_id.into(),
            initial_date: initial_date.map(|date| date.format("%Y-%m-%d").to_string()),
        })
    }

    pub fn timepicker(action_id: impl Into<String>) -> Self {
        Self::Timepicker(TimePicker { action_id: action_id.into() })
    }

    pub fn radio_buttons(action_id: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::RadioButtons(OptionGroup { action_id: action_id.into(), options })
    }

    pub fn checkboxes(action_id: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self::Checkboxes(OptionGroup { action_id: action_id.into(), options })
    }

    pub fn users_select(action_id: impl Into<String>) -> Self {
        Self::UsersSelect(UserSelect { action_id: action_id.into() })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(default)]
        block_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
    },
    Actions {
        #[serde(default)]
        block_id: String,
        elements: Vec<BlockElement>,
    },
    Context {
        #[serde(default)]
        block_id: String,
        elements: Vec<TextObject>,
    },
    Input {
        #[serde(default)]
        block_id: String,
        label: TextObject,
        element: BlockElement,
        #[serde(default)]
        optional: bool,
    },
    /// Blocks this crate does not model (rich text, images, ...), kept verbatim.
    #[serde(untagged)]
    Other(Value),
}

impl Block {
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::Section { block_id, .. }
            | Self::Actions { block_id, .. }
            | Self::Context { block_id, .. }
            | Self::Input { block_id, .. } => Some(block_id.as_str()),
            Self::Other(value) => value.get("block_id").and_then(Value::as_str),
        }
    }

    pub fn section_text(&self) -> Option<&TextObject> {
        match self {
            Self::Section { text, .. } => text.as_ref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { fallback_text: text.into(), blocks: Vec::new() }
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        self.blocks.push(build_section(block_id.into(), build));
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        self.blocks.push(build_actions(block_id.into(), build));
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

fn build_section<F>(block_id: String, build: F) -> Block
where
    F: FnOnce(&mut SectionBuilder),
{
    let mut builder = SectionBuilder::default();
    build(&mut builder);
    Block::Section { block_id, text: Some(builder.build()) }
}

fn build_actions<F>(block_id: String, build: F) -> Block
where
    F: FnOnce(&mut ActionsBuilder),
{
    let mut builder = ActionsBuilder::default();
    build(&mut builder);
    Block::Actions { block_id, elements: builder.build() }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<BlockElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(BlockElement::Button(button));
        self
    }

    fn build(self) -> Vec<BlockElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    pub kind: String,
    pub callback_id: String,
    pub title: TextObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<TextObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<TextObject>,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub private_metadata: String,
    #[serde(default)]
    pub notify_on_close: bool,
}

pub struct ModalBuilder {
    view: ModalView,
}

impl ModalBuilder {
    pub fn new(callback_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            view: ModalView {
                kind: "modal".to_owned(),
                callback_id: callback_id.into(),
                title: TextObject::plain(title),
                submit: None,
                close: None,
                blocks: Vec::new(),
                private_metadata: String::new(),
                notify_on_close: false,
            },
        }
    }

    pub fn submit(mut self, label: impl Into<String>) -> Self {
        self.view.submit = Some(TextObject::plain(label));
        self
    }

    pub fn close(mut self, label: impl Into<String>) -> Self {
        self.view.close = Some(TextObject::plain(label));
        self
    }

    pub fn notify_on_close(mut self) -> Self {
        self.view.notify_on_close = true;
        self
    }

    pub fn private_metadata(mut self, token: impl Into<String>) -> Self {
        self.view.private_metadata = token.into();
        self
    }

    pub fn input(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: BlockElement,
        optional: bool,
    ) -> Self {
        self.view.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element,
            optional,
        });
        self
    }

    pub fn build(self) -> ModalView {
        self.view
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeView {
    #[serde(rename = "type")]
    pub kind: String,
    pub blocks: Vec<Block>,
}

impl HomeView {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { kind: "home".to_owned(), blocks }
    }
}

/// Plain-text notice posted when a handler failed and the channel is known.
pub fn failure_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("deskbot.error.summary.v1", |section| {
            section.plain(format!(":warning: {summary}"));
        })
        .context("deskbot.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        failure_message, Block, BlockElement, ButtonElement, MessageBuilder,
        ModalBuilder, SelectOption, TextObject,
    };

    #[test]
    fn message_builder_creates_typed_block_structure() {
        let message = MessageBuilder::new("fallback")
            .section("demo.summary.v1", |section| {
                section.mrkdwn("*Summary*");
            })
            .actions("demo.summary.actions.v1", |actions| {
                actions.button(ButtonElement::new("demo.confirm.v1", "Confirm"));
            })
            .build();

        assert_eq!(message.blocks.len(), 2);
        assert!(matches!(
            &message.blocks[0],
            Block::Section {
                block_id,
                text: Some(TextObject::Mrkdwn { .. })
            } if block_id == "demo.summary.v1"
        ));
        assert!(matches!(
            &message.blocks[1],
            Block::Actions { block_id, elements } if block_id == "demo.summary.actions.v1" && elements.len() == 1
        ));
    }

    #[test]
    fn blocks_serialize_to_slack_wire_shape() {
        let message = MessageBuilder::new("fallback")
            .section("s1", |section| {
                section.plain("Counter: 0");
            })
            .actions("a1", |actions| {
                actions.button(ButtonElement::new("add1", "Add 1").value("1"));
            })
            .build();

        let value = serde_json::to_value(&message.blocks).expect("serialize");
        assert_eq!(
            value,
            json!([
                {"type": "section", "block_id": "s1", "text": {"type": "plain_text", "text": "Counter: 0"}},
                {"type": "actions", "block_id": "a1", "elements": [
                    {"type": "button", "action_id": "add1", "text": {"type": "plain_text", "text": "Add 1"}, "value": "1"}
                ]}
            ])
        );
    }

    #[test]
    fn message_blocks_from_slack_deserialize_and_keep_unknown_blocks() {
        let raw = json!([
            {"type": "section", "block_id": "x1", "text": {"type": "plain_text", "text": "Counter: 3", "emoji": true}},
            {"type": "divider", "block_id": "d1"},
            {"type": "actions", "block_id": "x2", "elements": [
                {"type": "button", "action_id": "add5", "text": {"type": "plain_text", "text": "Add 5"}, "value": "5"},
                {"type": "overflow", "action_id": "more", "options": []}
            ]}
        ]);

        let blocks: Vec<Block> = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].section_text().map(TextObject::text), Some("Counter: 3"));
        assert!(matches!(&blocks[1], Block::Other(value) if value["type"] == "divider"));
        assert_eq!(blocks[1].block_id(), Some("d1"));
        let Block::Actions { elements, .. } = &blocks[2] else {
            panic!("expected actions block");
        };
        assert!(matches!(&elements[0], BlockElement::Button(button) if button.value.as_deref() == Some("5")));
        assert!(matches!(&elements[1], BlockElement::Other(_)));

        let echoed = serde_json::to_value(&blocks).expect("serialize");
        assert_eq!(echoed[1], json!({"type": "divider", "block_id": "d1"}));
    }

    #[test]
    fn modal_builder_carries_metadata_and_close_notification() {
        let modal = ModalBuilder::new("cb", "Example Modal")
            .submit("Submit")
            .notify_on_close()
            .private_metadata("{\"channel_id\":\"C1\"}")
            .input("b1", "Input", BlockElement::plain_text_input("text_input", "Enter"), true)
            .build();

        let value = serde_json::to_value(&modal).expect("serialize");
        assert_eq!(value["type"], "modal");
        assert_eq!(value["callback_id"], "cb");
        assert_eq!(value["notify_on_close"], true);
        assert_eq!(value["private_metadata"], "{\"channel_id\":\"C1\"}");
        assert_eq!(value["blocks"][0]["element"]["type"], "plain_text_input");
        assert_eq!(value["blocks"][0]["optional"], true);
    }

    #[test]
    fn long_option_labels_are_truncated() {
        let option = SelectOption::new("x".repeat(200), "OPS-1");
        assert_eq!(option.text.text().chars().count(), 75);
        assert!(option.text.text().ends_with('…'));
    }

    #[test]
    fn failure_template_contains_correlation_id() {
        let message = failure_message("Something went wrong", "env-9");
        assert!(matches!(
            &message.blocks[1],
            Block::Context { elements, .. } if elements.iter().any(|e| e.text().contains("env-9"))
        ));
    }
}
