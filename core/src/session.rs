//! Session controller.
//!
//! Owns the three source buffers and the chat transcript for one active
//! session and drives the "user asks, AI responds, buffers update" cycle.
//! Generations are split in two phases so the caller can run the network
//! dispatch without holding the session lock: [`Session::begin_generation`]
//! records the request and hands out an epoch-tagged ticket,
//! [`Session::finish_generation`] applies the outcome. A ticket whose epoch
//! no longer matches (the session was reset meanwhile) is discarded
//! silently.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AiError;
use crate::preview;
use crate::providers::{ChatMessage, ChatResult};

pub const DEFAULT_HTML: &str = r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
  </head>
  <body>
    <div id="app">Hello from preview</div>
  </body>
</html>"#;

pub const DEFAULT_CSS: &str = "body { font-family: Inter, ui-sans-serif, system-ui, -apple-system, 'Segoe UI', Roboto, 'Helvetica Neue', Arial; padding: 24px; background: #fff; color: #111 }\n#app { padding: 12px; border: 1px solid #e5e7eb; border-radius: 8px }\n";

pub const DEFAULT_JS: &str =
    "const el = document.getElementById('app');\nel.innerHTML += ' — script loaded';\n";

const SYSTEM_PROMPT: &str = "You are a coding assistant that generates or modifies HTML, CSS, and JS code. Always return the complete, updated, and fully functional code. Return code blocks with delimiters: ```html``` ```css``` ```javascript```.";

/// Transcript entries render at most this many characters of a reply.
const REPLY_PREVIEW_CHARS: usize = 300;

static HTML_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```html\n(.*?)\n```").unwrap());
static CSS_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```css\n(.*?)\n```").unwrap());
static JS_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```javascript\n(.*?)\n```").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    Markup,
    Stylesheet,
    Script,
}

/// The three editable source buffers. Always populated; a fresh session
/// starts from the built-in starter template.
#[derive(Debug, Clone, Serialize)]
pub struct SourceBundle {
    pub markup: String,
    pub stylesheet: String,
    pub script: String,
}

impl Default for SourceBundle {
    fn default() -> Self {
        Self {
            markup: DEFAULT_HTML.to_string(),
            stylesheet: DEFAULT_CSS.to_string(),
            script: DEFAULT_JS.to_string(),
        }
    }
}

impl SourceBundle {
    pub fn get(&self, kind: BufferKind) -> &str {
        match kind {
            BufferKind::Markup => &self.markup,
            BufferKind::Stylesheet => &self.stylesheet,
            BufferKind::Script => &self.script,
        }
    }

    pub fn set(&mut self, kind: BufferKind, content: String) {
        match kind {
            BufferKind::Markup => self.markup = content,
            BufferKind::Stylesheet => self.stylesheet = content,
            BufferKind::Script => self.script = content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    /// Display label, e.g. `You` or `AI (pollinations)`.
    pub label: String,
    pub text: String,
    /// Marks the provisional "loading" entry while a dispatch is in flight.
    pub pending: bool,
}

/// Code blocks pulled out of an AI reply. A missing fence leaves the
/// corresponding buffer untouched; partial replies are an incremental-edit
/// affordance, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBlocks {
    pub markup: Option<String>,
    pub stylesheet: Option<String>,
    pub script: Option<String>,
}

pub fn extract_code_blocks(reply: &str) -> ExtractedBlocks {
    let capture = |re: &Regex| {
        re.captures(reply)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string())
    };
    ExtractedBlocks {
        markup: capture(&HTML_FENCE),
        stylesheet: capture(&CSS_FENCE),
        script: capture(&JS_FENCE),
    }
}

/// Handed out by [`Session::begin_generation`]; carries the request payload
/// and the session epoch it belongs to.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub epoch: u64,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("instruction is empty")] EmptyInstruction,
    #[error("a generation is already in flight")] Busy,
}

pub struct Session {
    buffers: SourceBundle,
    transcript: Vec<TranscriptEntry>,
    epoch: u64,
    dispatching: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            buffers: SourceBundle::default(),
            transcript: Vec::new(),
            epoch: 0,
            dispatching: false,
        }
    }

    pub fn buffers(&self) -> &SourceBundle {
        &self.buffers
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Direct user edit of one buffer. Last writer wins.
    pub fn set_buffer(&mut self, kind: BufferKind, content: String) {
        self.buffers.set(kind, content);
    }

    /// Project the current buffers into the preview document.
    pub fn preview_document(&self) -> String {
        preview::assemble(&self.buffers.markup, &self.buffers.stylesheet, &self.buffers.script)
    }

    /// Record a new instruction and build the request payload.
    ///
    /// The payload is always the system prompt plus one synthesized user
    /// message embedding the current buffer contents and the instruction;
    /// earlier transcript entries are not replayed. Submissions are
    /// serialised: while one generation is pending, further ones are
    /// rejected with [`SubmitError::Busy`].
    pub fn begin_generation(&mut self, instruction: &str) -> Result<GenerationTicket, SubmitError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(SubmitError::EmptyInstruction);
        }
        if self.dispatching {
            return Err(SubmitError::Busy);
        }

        self.dispatching = true;
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::User,
            label: "You".to_string(),
            text: instruction.to_string(),
            pending: false,
        });
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Assistant,
            label: "AI".to_string(),
            text: "Loading...".to_string(),
            pending: true,
        });

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Here is the current code:\n\nHTML:\n{}\n\nCSS:\n{}\n\nJS:\n{}\n\nNow: {}",
                self.buffers.markup, self.buffers.stylesheet, self.buffers.script, instruction
            )),
        ];

        Ok(GenerationTicket { epoch: self.epoch, messages })
    }

    /// Apply the outcome of a dispatch started with `ticket`.
    ///
    /// On success the loading entry becomes a truncated rendering of the
    /// reply and any fenced blocks overwrite their buffers. On failure the
    /// entry names the attempted model and the buffers stay untouched. A
    /// stale epoch means the session was reset mid-flight; the outcome is
    /// dropped without any effect.
    pub fn finish_generation(
        &mut self,
        ticket: &GenerationTicket,
        outcome: Result<ChatResult, AiError>,
        attempted_model: &str,
    ) {
        if ticket.epoch != self.epoch {
            return;
        }
        self.dispatching = false;
        self.transcript.retain(|entry| !entry.pending);

        match outcome {
            Ok(result) => {
                self.transcript.push(TranscriptEntry {
                    speaker: Speaker::Assistant,
                    label: format!("AI ({})", result.provider.as_str()),
                    text: reply_preview(&result.content),
                    pending: false,
                });
                self.apply_reply(&result.content);
            }
            Err(_) => {
                self.transcript.push(TranscriptEntry {
                    speaker: Speaker::Assistant,
                    label: format!("AI ({attempted_model})"),
                    text: "Error generating code".to_string(),
                    pending: false,
                });
            }
        }
    }

    /// Hard reset: clear the transcript, restore the default buffers and
    /// invalidate any outstanding generation by bumping the epoch.
    pub fn new_session(&mut self) {
        self.epoch += 1;
        self.dispatching = false;
        self.transcript.clear();
        self.buffers = SourceBundle::default();
    }

    fn apply_reply(&mut self, reply: &str) {
        let blocks = extract_code_blocks(reply);
        if let Some(markup) = blocks.markup {
            self.buffers.markup = markup;
        }
        if let Some(stylesheet) = blocks.stylesheet {
            self.buffers.stylesheet = stylesheet;
        }
        if let Some(script) = blocks.script {
            self.buffers.script = script;
        }
    }
}

fn reply_preview(text: &str) -> String {
    if text.chars().count() > REPLY_PREVIEW_CHARS {
        let truncated: String = text.chars().take(REPLY_PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
