use std::time::Instant;

use fluttergen_core::{
    ChatMessage, Config, CopyAcknowledgement, GeneratedResult, GenerationError, Generator,
    OllamaClient, Provider, ScrollCue, Session, DEFAULT_LANGUAGE, SUGGESTIONS,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;

use crate::clipboard::copy_to_clipboard;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub show_sidebar: bool,

    // Chat state
    pub session: Session,
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars
    pub chat_scroll: usize,      // First visible row of the chat
    pub chat_height: u16,        // Height of chat area for scroll calculations
    pub chat_width: u16,         // Width of chat area for wrap calculations
    pub total_chat_lines: usize, // Wrapped rows, set during render
    pub follow_tail: bool,
    pub scroll_cue: ScrollCue,
    pub language: String,

    // Code block selection and copy feedback
    pub selected_code: Option<usize>, // index into the conversation
    pub copy_ack: CopyAcknowledgement,
    pub copied_message: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // Provider state
    pub config: Config,
    pub current_provider: Provider,
    pub generator: Generator,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub api_key_target_provider: Option<Provider>,

    // Chat area for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: Config,
        provider: Provider,
        model: String,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        let generator = Generator::new(config.backend_for(provider), model);

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            show_sidebar: false,

            session: Session::new(),
            input: String::new(),
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            total_chat_lines: 0,
            follow_tail: true,
            scroll_cue: ScrollCue::new(),
            language: DEFAULT_LANGUAGE.to_string(),

            selected_code: None,
            copy_ack: CopyAcknowledgement::default(),
            copied_message: None,

            animation_frame: 0,

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            config,
            current_provider: provider,
            generator,
            show_provider_picker: false,
            provider_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            api_key_target_provider: None,

            chat_area: None,

            events,
        }
    }

    pub fn selected_model(&self) -> &str {
        self.generator.model()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.conversation().all()
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    // Submission

    /// Send text to the model. Returns false when the session rejected it
    /// (blank text or a request already in flight).
    pub fn submit(&mut self, text: &str) -> bool {
        let Some(prompt) = self.session.submit(text) else {
            return false;
        };

        self.sync_scroll();

        let generator = self.generator.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = generator.generate(&prompt).await;
            if events.send(AppEvent::Generated(outcome)).is_err() {
                tracing::debug!("event loop closed before generation finished");
            }
        });
        true
    }

    /// Submit the input box, clearing it only when the text was accepted
    pub fn submit_input(&mut self) {
        let text = self.input.clone();
        if self.submit(&text) {
            self.input.clear();
            self.input_cursor = 0;
        }
    }

    /// Send one of the empty-state suggestions (0-based)
    pub fn submit_suggestion(&mut self, idx: usize) {
        if !self.session.conversation().is_empty() {
            return;
        }
        if let Some(suggestion) = SUGGESTIONS.get(idx) {
            self.submit(suggestion);
        }
    }

    pub fn on_generated(&mut self, outcome: Result<GeneratedResult, GenerationError>) {
        self.session.resolve(outcome);
        if let Some(last) = self.session.conversation().last() {
            if last.code().is_some() {
                self.selected_code = Some(self.session.conversation().len() - 1);
            }
        }
        self.sync_scroll();
    }

    /// Follow the newest message whenever the conversation grows
    pub fn sync_scroll(&mut self) {
        if self.scroll_cue.observe(self.session.conversation().len()) {
            self.follow_tail = true;
        }
    }

    /// Tick animation frame and expire the copy acknowledgement
    pub fn tick(&mut self, now: Instant) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.copied_message.is_some() && !self.copy_ack.is_active(now) {
            self.copied_message = None;
            self.copy_ack.clear();
        }
    }

    // Scrolling

    fn max_scroll(&self) -> usize {
        self.total_chat_lines.saturating_sub(self.chat_height as usize)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines as usize).min(self.max_scroll());
        self.follow_tail = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines as usize);
        self.follow_tail = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_tail = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
    }

    // Code blocks

    fn code_message_indices(&self) -> Vec<usize> {
        self.messages()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.code().is_some())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn select_next_code(&mut self) {
        let indices = self.code_message_indices();
        self.selected_code = match self.selected_code {
            Some(current) => indices.iter().copied().find(|&i| i > current).or(Some(current)),
            None => indices.first().copied(),
        };
    }

    pub fn select_prev_code(&mut self) {
        let indices = self.code_message_indices();
        self.selected_code = match self.selected_code {
            Some(current) => indices.iter().rev().copied().find(|&i| i < current).or(Some(current)),
            None => indices.last().copied(),
        };
    }

    pub fn selected_code_message(&self) -> Option<&ChatMessage> {
        self.selected_code
            .and_then(|i| self.messages().get(i))
            .filter(|m| m.code().is_some())
    }

    /// Copy the selected code block and start the "Copied!" window
    pub fn copy_selected_code(&mut self, now: Instant) {
        let Some(message) = self.selected_code_message() else {
            return;
        };
        let id = message.id.clone();
        let code = message.code().unwrap_or_default().to_string();

        match copy_to_clipboard(&code) {
            Ok(()) => {
                self.copy_ack.acknowledge(now);
                self.copied_message = Some(id);
            }
            Err(e) => tracing::error!("Failed to copy text: {:#}", e),
        }
    }

    pub fn is_copied(&self, message_id: &str, now: Instant) -> bool {
        self.copied_message.as_deref() == Some(message_id) && self.copy_ack.is_active(now)
    }

    // Input editing (ignored while a request is in flight)

    pub fn insert_char(&mut self, c: char) {
        if self.is_loading() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.is_loading() || self.input_cursor == 0 {
            return;
        }
        self.input_cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        let char_count = self.input.chars().count();
        if self.is_loading() || self.input_cursor >= char_count {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.remove(byte_pos);
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input.chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    // Model picker methods

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Fill the model picker for the current provider and open it
    pub async fn open_model_picker(&mut self) {
        self.available_models = self.models_for_provider(self.current_provider).await;
        if !self.available_models.is_empty() {
            // Select current model if in list, otherwise first
            let current_idx = self
                .available_models
                .iter()
                .position(|m| m == self.selected_model())
                .unwrap_or(0);
            self.model_picker_state.select(Some(current_idx));
            self.show_model_picker = true;
        }
    }

    pub fn select_model(&mut self) {
        if let Some(model) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
            .cloned()
        {
            self.show_model_picker = false;
            self.use_model(model.clone());
            self.config.set_provider(self.current_provider);
            self.config.default_model = Some(model);
            self.persist_config();
        }
    }

    async fn models_for_provider(&self, provider: Provider) -> Vec<String> {
        match provider {
            Provider::Ollama => OllamaClient::new(&self.config.ollama_url())
                .list_models()
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Could not list Ollama models: {:#}", e);
                    Vec::new()
                }),
            _ => provider.known_models(),
        }
    }

    fn use_model(&mut self, model: String) {
        self.generator = Generator::new(self.config.backend_for(self.current_provider), model);
    }

    // Provider picker methods

    pub fn open_provider_picker(&mut self) {
        let current_idx = Provider::all()
            .iter()
            .position(|p| *p == self.current_provider)
            .unwrap_or(0);
        self.provider_picker_state.select(Some(current_idx));
        self.show_provider_picker = true;
    }

    pub fn provider_picker_nav_down(&mut self) {
        let len = Provider::all().len();
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switch to the highlighted provider, asking for a key first if it has none
    pub async fn choose_provider(&mut self) {
        let Some(provider) = self
            .provider_picker_state
            .selected()
            .and_then(|i| Provider::all().get(i).copied())
        else {
            return;
        };
        self.show_provider_picker = false;

        if self.config.key_source(provider).is_none() {
            self.api_key_target_provider = Some(provider);
            self.show_api_key_input = true;
            self.api_key_input.clear();
            self.api_key_input_cursor = 0;
        } else {
            self.switch_provider(provider).await;
        }
    }

    pub async fn switch_provider(&mut self, provider: Provider) {
        self.current_provider = provider;
        let model = self
            .models_for_provider(provider)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| provider.default_model());

        self.use_model(model.clone());
        self.config.set_provider(provider);
        self.config.default_model = Some(model);
        self.persist_config();
        tracing::info!(provider = provider.as_str(), model = %self.selected_model(), "switched provider");
    }

    // API key input

    pub fn cancel_api_key_input(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        self.api_key_target_provider = None;
    }

    pub async fn save_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        let target = self.api_key_target_provider;
        self.cancel_api_key_input();

        if let (Some(provider), false) = (target, key.is_empty()) {
            self.config.set_api_key(provider, &key);
            self.switch_provider(provider).await;
        }
    }

    fn persist_config(&self) {
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save config: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluttergen_core::{ChatRole, ERROR_MESSAGE};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut config = Config::new();
        config.set_provider(Provider::Ollama);
        // Nothing listens here, so every request fails fast.
        config.ollama_url = Some("http://127.0.0.1:9".to_string());
        let app = App::new(config, Provider::Ollama, "test-model".to_string(), tx);
        (app, rx)
    }

    fn result(code: &str) -> GeneratedResult {
        GeneratedResult {
            explanation: "Done.".to_string(),
            code: code.to_string(),
        }
    }

    #[test]
    fn char_index_maps_to_byte_index() {
        assert_eq!(char_to_byte_index("añb", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[tokio::test]
    async fn editing_handles_multibyte_text() {
        let (mut app, _rx) = test_app();
        for c in "Màn hình".chars() {
            app.insert_char(c);
        }
        app.cursor_left();
        app.backspace();
        app.cursor_home();
        app.delete();

        assert_eq!(app.input, "àn hìh");
        assert_eq!(app.input_cursor, 0);
    }

    #[tokio::test]
    async fn blank_input_is_kept_out_of_conversation() {
        let (mut app, _rx) = test_app();
        app.input = "   ".to_string();

        app.submit_input();

        assert!(app.messages().is_empty());
        assert!(!app.is_loading());
        assert_eq!(app.input, "   ");
    }

    #[tokio::test]
    async fn second_submit_while_pending_is_ignored() {
        let (mut app, _rx) = test_app();
        app.input = "Login screen".to_string();
        app.input_cursor = 12;

        app.submit_input();
        assert_eq!(app.input, "");
        assert!(app.is_loading());

        app.input = "Settings".to_string();
        app.submit_input();

        assert_eq!(app.messages().len(), 1);
        assert_eq!(app.input, "Settings");
    }

    #[tokio::test]
    async fn typing_is_disabled_while_loading() {
        let (mut app, _rx) = test_app();
        app.submit("Login screen");

        app.insert_char('x');

        assert_eq!(app.input, "");
    }

    #[tokio::test]
    async fn failed_request_reports_back_as_error_message() {
        let (mut app, mut rx) = test_app();
        app.submit("Login screen");

        let outcome = loop {
            match rx.recv().await {
                Some(AppEvent::Generated(outcome)) => break outcome,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        };
        app.on_generated(outcome);

        let messages = app.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert_eq!(messages[1].content, ERROR_MESSAGE);
        assert_eq!(messages[1].parsed, None);
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn suggestions_only_apply_to_empty_conversation() {
        let (mut app, _rx) = test_app();

        app.submit_suggestion(2);
        assert_eq!(app.messages()[0].content, "Crypto Wallet Dashboard");

        app.on_generated(Ok(result("class Wallet {}")));
        app.submit_suggestion(0);
        assert_eq!(app.messages().len(), 2);
    }

    #[tokio::test]
    async fn new_code_block_becomes_selected() {
        let (mut app, _rx) = test_app();
        app.submit("One");
        app.on_generated(Ok(result("class One {}")));
        app.submit("Two");
        app.on_generated(Ok(result("")));
        app.submit("Three");
        app.on_generated(Ok(result("class Three {}")));

        assert_eq!(app.selected_code, Some(5));

        app.select_prev_code();
        assert_eq!(app.selected_code, Some(1));
        app.select_prev_code();
        assert_eq!(app.selected_code, Some(1));
        app.select_next_code();
        assert_eq!(app.selected_code, Some(5));
    }

    #[tokio::test]
    async fn growth_re_enables_tail_following() {
        let (mut app, _rx) = test_app();
        app.total_chat_lines = 40;
        app.chat_height = 10;
        app.scroll_up(3);
        assert!(!app.follow_tail);

        app.submit("Login screen");

        assert!(app.follow_tail);
    }

    #[tokio::test]
    async fn scrolling_is_clamped() {
        let (mut app, _rx) = test_app();
        app.total_chat_lines = 30;
        app.chat_height = 10;

        app.scroll_down(100);
        assert_eq!(app.chat_scroll, 20);
        assert!(app.follow_tail);

        app.scroll_half_page_up();
        assert_eq!(app.chat_scroll, 15);
        app.scroll_to_top();
        assert_eq!(app.chat_scroll, 0);
    }

    #[tokio::test]
    async fn copied_state_expires_on_tick() {
        let (mut app, _rx) = test_app();
        let now = Instant::now();
        app.copy_ack.acknowledge(now);
        app.copied_message = Some("id-1".to_string());

        assert!(app.is_copied("id-1", now));
        assert!(!app.is_copied("id-2", now));

        app.tick(now + fluttergen_core::COPY_ACK_DURATION);
        assert_eq!(app.copied_message, None);
    }
}
