use ratatui::layout::Rect;
use tokio::task::JoinHandle;

use crate::backend::{AddResponse, BackendClient, ChatResponse, Suggestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// A single transcript entry. Created on every send/receive, never mutated.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Suggestions,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,

    // Transcript state (append-only, no cap)
    pub transcript: Vec<Message>,
    pub transcript_scroll: u16,
    pub transcript_height: u16, // Inner chat area size for scroll calculations
    pub transcript_width: u16,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Suggestion chips (replace-only; the full set is swapped on every send)
    pub suggestions: Vec<Suggestion>,
    pub selected_chip: Option<usize>,
    pub chip_areas: Vec<Rect>, // For mouse hit-testing (updated during render)

    // Cart panel: backend-produced markup, kept verbatim
    pub cart_markup: Option<String>,
    pub cart_scroll: u16,

    // In-flight requests, reaped in arrival order
    pub pending_sends: Vec<JoinHandle<anyhow::Result<ChatResponse>>>,
    pub pending_adds: Vec<JoinHandle<anyhow::Result<AddResponse>>>,

    // Last failed request, shown on the status line
    pub last_error: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub backend: BackendClient,
}

impl App {
    pub fn new(backend: BackendClient) -> Self {
        Self {
            should_quit: false,
            focus: FocusPane::Input,

            transcript: Vec::new(),
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,

            input: String::new(),
            cursor: 0,

            suggestions: Vec::new(),
            selected_chip: None,
            chip_areas: Vec::new(),

            cart_markup: None,
            cart_scroll: 0,

            pending_sends: Vec::new(),
            pending_adds: Vec::new(),

            last_error: None,

            animation_frame: 0,

            backend,
        }
    }

    /// Append one entry to the transcript and keep the newest entry visible.
    pub fn push_message(&mut self, text: &str, role: Role) {
        self.transcript.push(Message {
            role,
            text: text.to_string(),
        });
        self.scroll_transcript_to_bottom();
    }

    /// Take a submission from the input box. Whitespace-only input is
    /// dropped without touching any state. Otherwise the input clears
    /// synchronously, the user message echoes into the transcript before
    /// any network activity, and the trimmed text is handed back to send.
    pub fn submit_input(&mut self) -> Option<String> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }

        self.input.clear();
        self.cursor = 0;
        self.push_message(&text, Role::User);
        Some(text)
    }

    /// Apply a message-endpoint reply: bot message if present, cart markup
    /// if present, and the chip row replaced from `suggestions` (cleared
    /// when the field is absent).
    pub fn apply_chat_response(&mut self, resp: ChatResponse) {
        if let Some(reply) = &resp.reply {
            self.push_message(reply, Role::Bot);
        }
        if let Some(cart) = resp.cart_html {
            self.cart_markup = Some(cart);
        }
        self.replace_suggestions(resp.suggestions.unwrap_or_default());
    }

    /// Apply a quick-add reply. The chip row stays as rendered.
    pub fn apply_add_response(&mut self, resp: AddResponse) {
        if let Some(reply) = &resp.reply {
            self.push_message(reply, Role::Bot);
        }
        if let Some(cart) = resp.cart_html {
            self.cart_markup = Some(cart);
        }
    }

    /// Discard all chips and render the new set in order.
    pub fn replace_suggestions(&mut self, suggestions: Vec<Suggestion>) {
        self.suggestions = suggestions;
        if self.suggestions.is_empty() {
            self.selected_chip = None;
            if self.focus == FocusPane::Suggestions {
                self.focus = FocusPane::Input;
            }
        } else {
            self.selected_chip = Some(0);
        }
    }

    pub fn fail_request(&mut self, err: &anyhow::Error) {
        self.last_error = Some(format!("{err:#}"));
    }

    pub fn request_in_flight(&self) -> bool {
        !self.pending_sends.is_empty() || !self.pending_adds.is_empty()
    }

    /// Spawn a message send. Overlapping sends are allowed; each resolves
    /// independently in the order its response arrives.
    pub fn spawn_send(&mut self, text: String) {
        self.last_error = None;
        let backend = self.backend.clone();
        self.pending_sends
            .push(tokio::spawn(async move { backend.send_message(&text).await }));
    }

    pub fn spawn_add(&mut self, sku: String) {
        self.last_error = None;
        let backend = self.backend.clone();
        self.pending_adds
            .push(tokio::spawn(async move { backend.add_to_cart(&sku).await }));
    }

    /// Collect replies from finished requests, in arrival order.
    pub async fn reap_requests(&mut self) {
        let mut i = 0;
        while i < self.pending_sends.len() {
            if self.pending_sends[i].is_finished() {
                match self.pending_sends.remove(i).await {
                    Ok(Ok(resp)) => self.apply_chat_response(resp),
                    Ok(Err(err)) => self.fail_request(&err),
                    Err(err) => self.last_error = Some(err.to_string()),
                }
            } else {
                i += 1;
            }
        }

        let mut i = 0;
        while i < self.pending_adds.len() {
            if self.pending_adds[i].is_finished() {
                match self.pending_adds.remove(i).await {
                    Ok(Ok(resp)) => self.apply_add_response(resp),
                    Ok(Err(err)) => self.fail_request(&err),
                    Err(err) => self.last_error = Some(err.to_string()),
                }
            } else {
                i += 1;
            }
        }
    }

    // Chip navigation
    pub fn chip_next(&mut self) {
        let len = self.suggestions.len();
        if len > 0 {
            let i = self.selected_chip.unwrap_or(0);
            self.selected_chip = Some((i + 1).min(len - 1));
        }
    }

    pub fn chip_prev(&mut self) {
        if let Some(i) = self.selected_chip {
            self.selected_chip = Some(i.saturating_sub(1));
        }
    }

    pub fn selected_suggestion(&self) -> Option<&Suggestion> {
        self.selected_chip.and_then(|i| self.suggestions.get(i))
    }

    /// Which chip, if any, sits under the given terminal cell.
    pub fn chip_at(&self, x: u16, y: u16) -> Option<usize> {
        self.chip_areas
            .iter()
            .position(|r| x >= r.x && x < r.x + r.width && y >= r.y && y < r.y + r.height)
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.request_in_flight() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Transcript scrolling
    pub fn scroll_transcript_up(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
    }

    pub fn scroll_transcript_down(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(1);
    }

    /// Scroll the transcript so the newest entry (or the in-flight
    /// indicator) is visible.
    pub fn scroll_transcript_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.transcript {
            total_lines += 1; // Role line ("You:" or "Bot:")
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.request_in_flight() {
            total_lines += 2; // "Bot:" + "Thinking..."
        }

        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.transcript_scroll = total_lines.saturating_sub(visible_height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        App::new(BackendClient::new("http://localhost:8000").unwrap())
    }

    fn suggestion(sku: &str, text: &str) -> Suggestion {
        Suggestion {
            sku: sku.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn submit_echoes_user_message_and_clears_input() {
        let mut app = test_app();
        app.input = "  dos cervezas  ".to_string();
        app.cursor = app.input.chars().count();

        let sent = app.submit_input();

        assert_eq!(sent.as_deref(), Some("dos cervezas"));
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript[0].role, Role::User);
        assert_eq!(app.transcript[0].text, "dos cervezas");
        // The echo happens before anything goes on the wire.
        assert!(app.pending_sends.is_empty());
    }

    #[test]
    fn submit_ignores_whitespace_only_input() {
        let mut app = test_app();

        app.input = "   ".to_string();
        assert!(app.submit_input().is_none());
        assert_eq!(app.input, "   ");
        assert!(app.transcript.is_empty());

        app.input.clear();
        assert!(app.submit_input().is_none());
        assert!(app.transcript.is_empty());
    }

    #[test]
    fn chat_response_appends_reply_and_replaces_chips() {
        let mut app = test_app();

        app.apply_chat_response(ChatResponse {
            reply: Some("hi".to_string()),
            cart_html: None,
            suggestions: Some(vec![suggestion("A1", "Add A1")]),
        });

        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript[0].role, Role::Bot);
        assert_eq!(app.transcript[0].text, "hi");
        assert_eq!(app.suggestions, vec![suggestion("A1", "Add A1")]);
        assert_eq!(app.selected_chip, Some(0));
        // No cart_html key: the cart panel is left alone.
        assert!(app.cart_markup.is_none());
    }

    #[test]
    fn empty_chat_response_only_clears_chips() {
        let mut app = test_app();
        app.cart_markup = Some("<div>old</div>".to_string());
        app.replace_suggestions(vec![suggestion("A1", "Add A1")]);

        app.apply_chat_response(ChatResponse::default());

        assert!(app.transcript.is_empty());
        assert!(app.suggestions.is_empty());
        assert_eq!(app.cart_markup.as_deref(), Some("<div>old</div>"));
    }

    #[test]
    fn cart_markup_is_replaced_verbatim() {
        let mut app = test_app();
        app.cart_markup = Some("<div>old</div>".to_string());

        app.apply_chat_response(ChatResponse {
            reply: None,
            cart_html: Some(
                "<table class=\"cart\"><tr><td>2 x Cerveza</td></tr></table>".to_string(),
            ),
            suggestions: None,
        });

        assert_eq!(
            app.cart_markup.as_deref(),
            Some("<table class=\"cart\"><tr><td>2 x Cerveza</td></tr></table>")
        );
    }

    #[test]
    fn add_response_leaves_chips_in_place() {
        let mut app = test_app();
        app.replace_suggestions(vec![suggestion("A1", "Add A1")]);
        app.selected_chip = Some(0);

        app.apply_add_response(AddResponse {
            reply: Some("added".to_string()),
            cart_html: Some("<div>1 item</div>".to_string()),
        });

        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript[0].role, Role::Bot);
        assert_eq!(app.transcript[0].text, "added");
        assert_eq!(app.cart_markup.as_deref(), Some("<div>1 item</div>"));
        // The clicked chip set stays rendered unchanged.
        assert_eq!(app.suggestions, vec![suggestion("A1", "Add A1")]);
        assert_eq!(app.selected_chip, Some(0));
    }

    #[test]
    fn clearing_empty_chip_row_is_idempotent() {
        let mut app = test_app();

        app.replace_suggestions(Vec::new());
        assert!(app.suggestions.is_empty());
        assert!(app.selected_chip.is_none());

        app.replace_suggestions(Vec::new());
        assert!(app.suggestions.is_empty());
        assert!(app.selected_chip.is_none());
    }

    #[test]
    fn clearing_chips_returns_focus_to_input() {
        let mut app = test_app();
        app.replace_suggestions(vec![suggestion("A1", "Add A1")]);
        app.focus = FocusPane::Suggestions;

        app.replace_suggestions(Vec::new());

        assert_eq!(app.focus, FocusPane::Input);
    }

    #[test]
    fn chip_navigation_clamps_to_row() {
        let mut app = test_app();
        app.replace_suggestions(vec![suggestion("A1", "one"), suggestion("B2", "two")]);

        app.chip_next();
        assert_eq!(app.selected_chip, Some(1));
        app.chip_next();
        assert_eq!(app.selected_chip, Some(1));
        app.chip_prev();
        assert_eq!(app.selected_chip, Some(0));
        app.chip_prev();
        assert_eq!(app.selected_chip, Some(0));
        assert_eq!(app.selected_suggestion().unwrap().sku, "A1");
    }

    #[test]
    fn chip_at_hits_rendered_areas() {
        let mut app = test_app();
        app.chip_areas = vec![Rect::new(1, 10, 8, 1), Rect::new(10, 10, 8, 1)];

        assert_eq!(app.chip_at(1, 10), Some(0));
        assert_eq!(app.chip_at(9, 10), None);
        assert_eq!(app.chip_at(12, 10), Some(1));
        assert_eq!(app.chip_at(12, 11), None);
    }
}
