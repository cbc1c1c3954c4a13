use chrono::{DateTime, Utc};

use crate::domain::ids::ChannelId;
use crate::domain::transcript::{TranscriptHeader, TranscriptMessage, TranscriptRecord};

const DEFAULT_NAME_COLOR: &str = "#e3e5e8";

pub fn transcript_filename(channel: ChannelId, created_at: DateTime<Utc>) -> String {
    format!(
        "transcript-{channel}-{}.html",
        created_at.format("%Y%m%d-%H%M%S")
    )
}

pub fn checksum(document: &str) -> String {
    blake3::hash(document.as_bytes()).to_hex().to_string()
}

/// Renders a standalone HTML page: inline styles only, no scripts, no external assets
/// besides the avatar and attachment links themselves.
pub fn render_document(header: &TranscriptHeader, record: &TranscriptRecord) -> String {
    let mut html = String::with_capacity(4096 + record.len() * 512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>Transcript #{}</title>\n",
        escape_html(&header.channel_name)
    ));
    html.push_str("<style>\n");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str("<header class=\"meta\">\n");
    html.push_str(&format!(
        "<h1>#{}</h1>\n",
        escape_html(&header.channel_name)
    ));
    html.push_str("<dl>\n");
    push_meta(&mut html, "Channel ID", &header.channel_id.to_string());
    push_meta(&mut html, "Opened by", &header.opener_id.to_string());
    push_meta(&mut html, "Opened at", &format_time(header.opened_at));
    push_meta(&mut html, "Closed by", &header.closer_id.to_string());
    push_meta(&mut html, "Closed at", &format_time(header.closed_at));
    push_meta(&mut html, "Messages", &record.len().to_string());
    html.push_str("</dl>\n</header>\n");

    html.push_str("<main class=\"messages\">\n");
    for message in &record.messages {
        render_message(&mut html, message);
    }
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn push_meta(html: &mut String, label: &str, value: &str) {
    html.push_str(&format!(
        "<dt>{}</dt><dd>{}</dd>\n",
        escape_html(label),
        escape_html(value)
    ));
}

fn render_message(html: &mut String, message: &TranscriptMessage) {
    let color = message
        .color_hex
        .as_deref()
        .filter(|color| is_hex_color(color))
        .unwrap_or(DEFAULT_NAME_COLOR);

    html.push_str(&format!(
        "<article class=\"message\" id=\"m{}\">\n",
        message.id
    ));
    html.push_str(&format!(
        "<img class=\"avatar\" src=\"{}\" alt=\"\" width=\"40\" height=\"40\">\n",
        escape_html(&message.avatar_url)
    ));
    html.push_str("<div class=\"body\">\n<div class=\"head\">");
    html.push_str(&format!(
        "<span class=\"name\" style=\"color:{color}\" title=\"{}\">{}</span>",
        escape_html(&message.author),
        escape_html(&message.display_name)
    ));
    html.push_str(&format!(
        "<time datetime=\"{}\">{}</time></div>\n",
        message.timestamp.to_rfc3339(),
        format_time(message.timestamp)
    ));

    if !message.content.is_empty() {
        html.push_str(&format!(
            "<div class=\"content\">{}</div>\n",
            escape_html(&message.content).replace('\n', "<br>")
        ));
    }

    for attachment in &message.attachments {
        let url = escape_html(&attachment.url);
        let name = escape_html(&attachment.filename);
        html.push_str("<div class=\"attachment\">");
        if attachment.is_image() {
            html.push_str(&format!(
                "<a href=\"{url}\"><img src=\"{url}\" alt=\"{name}\" loading=\"lazy\"></a><br>"
            ));
        }
        html.push_str(&format!("<a href=\"{url}\">📎 {name}</a></div>\n"));
    }

    if message.embed_count > 0 {
        let noun = if message.embed_count == 1 { "embed" } else { "embeds" };
        html.push_str(&format!(
            "<div class=\"embeds\">[{} {noun} omitted]</div>\n",
            message.embed_count
        ));
    }

    html.push_str("</div>\n</article>\n");
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|ch| ch.is_ascii_hexdigit())
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const STYLE: &str = "\
body{margin:0;background:#313338;color:#dbdee1;font-family:'gg sans','Segoe UI',Helvetica,Arial,sans-serif;font-size:15px}
.meta{padding:16px 24px;background:#2b2d31;border-bottom:1px solid #1e1f22}
.meta h1{margin:0 0 8px;font-size:20px;color:#f2f3f5}
.meta dl{display:grid;grid-template-columns:max-content 1fr;gap:4px 16px;margin:0}
.meta dt{color:#949ba4}
.meta dd{margin:0}
.messages{padding:8px 0}
.message{display:flex;gap:16px;padding:6px 24px}
.message:hover{background:#2e3035}
.avatar{border-radius:50%;flex:none}
.head{display:flex;gap:8px;align-items:baseline}
.name{font-weight:600}
time{color:#949ba4;font-size:12px}
.content{white-space:pre-wrap;word-wrap:break-word}
.attachment img{max-width:400px;max-height:300px;border-radius:4px;margin-top:4px}
.attachment a{color:#00a8fc}
.embeds{color:#949ba4;font-style:italic;font-size:13px}
";

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::ids::{MessageId, UserId};
    use crate::domain::transcript::TranscriptAttachment;

    fn header() -> TranscriptHeader {
        let at = Utc
            .with_ymd_and_hms(2025, 3, 4, 5, 6, 7)
            .single()
            .expect("valid date");
        TranscriptHeader {
            channel_id: ChannelId(42),
            channel_name: "bug-coco".to_string(),
            opener_id: UserId(7),
            opened_at: at,
            closer_id: UserId(8),
            closed_at: at,
        }
    }

    fn message(content: &str) -> TranscriptMessage {
        TranscriptMessage {
            id: MessageId(1),
            author_id: UserId(7),
            author: "coco".to_string(),
            display_name: "Coco".to_string(),
            color_hex: None,
            avatar_url: "https://cdn.example.com/a.png".to_string(),
            timestamp: header().opened_at,
            content: content.to_string(),
            attachments: Vec::new(),
            embed_count: 0,
        }
    }

    #[test]
    fn empty_record_renders_complete_document() {
        let html = render_document(&header(), &TranscriptRecord::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<main class=\"messages\">\n</main>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("<dt>Messages</dt><dd>0</dd>"));
        assert!(!html.contains("<script"));
        assert!(!html.contains("<link"));
    }

    #[test]
    fn escapes_message_content() {
        let record = TranscriptRecord {
            messages: vec![message("<script>alert('x')</script> & done")],
        };
        let html = render_document(&header(), &record);
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; done"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn falls_back_to_default_color() {
        let mut colored = message("hi");
        colored.color_hex = Some("#ff00aa".to_string());
        let mut bogus = message("hi");
        bogus.color_hex = Some("red;background:url(x)".to_string());
        let record = TranscriptRecord {
            messages: vec![colored, bogus, message("plain")],
        };
        let html = render_document(&header(), &record);
        assert!(html.contains("color:#ff00aa"));
        assert_eq!(html.matches(&format!("color:{DEFAULT_NAME_COLOR}")).count(), 2);
    }

    #[test]
    fn renders_attachments_and_embed_marker() {
        let mut with_files = message("");
        with_files.attachments = vec![
            TranscriptAttachment {
                filename: "proof.png".to_string(),
                url: "https://cdn.example.com/proof.png".to_string(),
                content_type: Some("image/png".to_string()),
            },
            TranscriptAttachment {
                filename: "log.txt".to_string(),
                url: "https://cdn.example.com/log.txt".to_string(),
                content_type: Some("text/plain".to_string()),
            },
        ];
        with_files.embed_count = 2;
        let html = render_document(
            &header(),
            &TranscriptRecord {
                messages: vec![with_files],
            },
        );
        assert!(html.contains("<img src=\"https://cdn.example.com/proof.png\""));
        assert!(!html.contains("<img src=\"https://cdn.example.com/log.txt\""));
        assert!(html.contains("📎 log.txt"));
        assert!(html.contains("[2 embeds omitted]"));
    }

    #[test]
    fn filename_embeds_channel_and_timestamp() {
        assert_eq!(
            transcript_filename(ChannelId(42), header().opened_at),
            "transcript-42-20250304-050607.html"
        );
    }
}
