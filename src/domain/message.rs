use crate::domain::ticket::TicketCategory;

pub const CATEGORY_SELECT_ID: &str = "ticket:category";
pub const CLOSE_BUTTON_ID: &str = "ticket:close";

/// Platform-neutral outgoing message; the Discord adapter maps it onto the API payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<Component>,
    pub attachment: Option<FileAttachment>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_attachment(mut self, attachment: FileAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Embed {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    CategorySelect(Vec<TicketCategory>),
    CloseButton,
    LinkButton { label: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
