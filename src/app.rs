use std::collections::VecDeque;

use ratatui::layout::Rect;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::conversation::Conversation;
use crate::openai::{CompletionClient, CompletionError, CompletionRequest};
use crate::params::{GenerationParameters, Param};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Transcript,
    Input,
    Settings,
}

/// Exchange protocol state. At most one completion request is in flight;
/// submissions that arrive while awaiting are queued in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    AwaitingCompletion,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation state
    pub conversation: Conversation,
    pub params: GenerationParameters,

    // Exchange state machine
    pub exchange: ExchangeState,
    pending_submissions: VecDeque<String>,
    pub completion_task: Option<JoinHandle<Result<String, CompletionError>>>,

    // Input buffer
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Settings panel
    pub selected_param: usize, // index into Param::all()

    // Transcript viewport
    pub transcript_scroll: u16,
    pub transcript_height: u16,
    pub transcript_width: u16,
    pub total_transcript_lines: u16,
    pub transcript_area: Option<Rect>, // for mouse hit-testing

    // Status surface
    pub last_error: Option<String>,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Remote endpoint
    pub client: CompletionClient,
    pub model: String,
    pub has_api_key: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let api_key = config.resolved_api_key();

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Input,

            conversation: Conversation::new(),
            params: GenerationParameters::default(),

            exchange: ExchangeState::Idle,
            pending_submissions: VecDeque::new(),
            completion_task: None,

            input: String::new(),
            input_cursor: 0,

            selected_param: 0,

            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            total_transcript_lines: 0,
            transcript_area: None,

            last_error: None,
            animation_frame: 0,

            client: CompletionClient::new(
                &config.resolved_api_base(),
                api_key.as_deref().unwrap_or_default(),
            ),
            model: config.resolved_model(),
            has_api_key: api_key.is_some(),
        }
    }

    /// Append a user turn and return the request to issue, if one should
    /// fire now. While a request is in flight the submission is queued
    /// instead, so responses land in submission order.
    pub fn submit_user_text(&mut self, text: String) -> Option<CompletionRequest> {
        if text.trim().is_empty() {
            return None;
        }
        self.last_error = None;

        match self.exchange {
            ExchangeState::Idle => {
                self.conversation.push_user(text.clone());
                Some(self.begin_request(&text))
            }
            ExchangeState::AwaitingCompletion => {
                self.pending_submissions.push_back(text);
                None
            }
        }
    }

    /// Settle the in-flight request. A success appends an assistant turn;
    /// a failure leaves the conversation and parameters untouched and
    /// surfaces the error banner. Either way the next queued submission
    /// fires, and its request is returned.
    pub fn settle_completion(
        &mut self,
        result: Result<String, CompletionError>,
    ) -> Option<CompletionRequest> {
        match result {
            Ok(text) => self.conversation.push_assistant(text),
            Err(err) => self.last_error = Some(format!("Response unavailable: {err}")),
        }
        self.exchange = ExchangeState::Idle;

        let next = self.pending_submissions.pop_front()?;
        self.conversation.push_user(next.clone());
        Some(self.begin_request(&next))
    }

    fn begin_request(&mut self, user_text: &str) -> CompletionRequest {
        // A request only ever fires when the newest turn is user-authored
        debug_assert!(self.conversation.awaiting_reply());
        self.exchange = ExchangeState::AwaitingCompletion;
        // Parameters are read here, at call time
        CompletionRequest::new(&self.model, user_text, &self.params)
    }

    pub fn is_loading(&self) -> bool {
        self.exchange == ExchangeState::AwaitingCompletion
    }

    pub fn queued_submissions(&self) -> usize {
        self.pending_submissions.len()
    }

    // Settings panel navigation
    pub fn settings_next(&mut self) {
        self.selected_param = (self.selected_param + 1).min(Param::all().len() - 1);
    }

    pub fn settings_prev(&mut self) {
        self.selected_param = self.selected_param.saturating_sub(1);
    }

    pub fn current_param(&self) -> Param {
        Param::all()[self.selected_param]
    }

    pub fn adjust_current_param(&mut self, steps: i32) {
        let param = self.current_param();
        self.params.adjust(param, steps);
    }

    // Transcript scrolling
    pub fn scroll_down(&mut self) {
        let max_scroll = self
            .total_transcript_lines
            .saturating_sub(self.transcript_height);
        if self.transcript_scroll < max_scroll {
            self.transcript_scroll = self.transcript_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
    }

    pub fn scroll_to_top(&mut self) {
        self.transcript_scroll = 0;
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.transcript_height / 2;
        let max_scroll = self
            .total_transcript_lines
            .saturating_sub(self.transcript_height);
        self.transcript_scroll = (self.transcript_scroll + half_page).min(max_scroll);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.transcript_height / 2;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(half_page);
    }

    /// Scroll the transcript so the newest turn (and the "Thinking..."
    /// indicator while loading) is visible.
    pub fn scroll_transcript_to_bottom(&mut self) {
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for turn in self.conversation.turns() {
            total_lines += 1; // Role line ("You:" or "AI:")
            for line in turn.text.lines() {
                // Character count, not byte length, for UTF-8 content
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after turn
        }

        if self.is_loading() {
            total_lines += 2; // "AI:" + "Thinking..."
        }

        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.transcript_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.transcript_scroll = 0;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Sender;

    fn test_app() -> App {
        App::new(&Config::default())
    }

    fn senders(app: &App) -> Vec<Sender> {
        app.conversation.turns().iter().map(|t| t.sender).collect()
    }

    #[test]
    fn test_submission_appends_turn_and_fires_request() {
        let mut app = test_app();
        let request = app.submit_user_text("Hello".to_string()).unwrap();

        assert!(request.prompt.ends_with("Human: Hello\nAI:"));
        assert_eq!(request.temperature, 0.9);
        assert_eq!(request.max_tokens, 150);
        assert_eq!(request.top_p, 1.0);
        assert_eq!(request.frequency_penalty, 0.0);
        assert_eq!(request.presence_penalty, 0.6);

        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.exchange, ExchangeState::AwaitingCompletion);
    }

    #[test]
    fn test_successful_exchanges_alternate_starting_with_user() {
        let mut app = test_app();

        for i in 0..3 {
            let request = app.submit_user_text(format!("question {i}"));
            assert!(request.is_some());
            let next = app.settle_completion(Ok(format!("answer {i}")));
            assert!(next.is_none());
        }

        assert_eq!(app.conversation.len(), 6);
        for (i, turn) in app.conversation.turns().iter().enumerate() {
            let expected = if i % 2 == 0 {
                Sender::User
            } else {
                Sender::Assistant
            };
            assert_eq!(turn.sender, expected);
        }
        assert_eq!(app.exchange, ExchangeState::Idle);
    }

    #[test]
    fn test_hello_exchange_end_to_end() {
        let mut app = test_app();
        let request = app.submit_user_text("Hello".to_string()).unwrap();
        assert!(request.prompt.ends_with("Human: Hello\nAI:"));

        app.settle_completion(Ok("Hi there!".to_string()));

        let turns = app.conversation.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].sender, Sender::User);
        assert_eq!(turns[0].text, "Hello");
        assert_eq!(turns[1].sender, Sender::Assistant);
        assert_eq!(turns[1].text, "Hi there!");
    }

    #[test]
    fn test_empty_submission_is_a_no_op() {
        let mut app = test_app();
        assert!(app.submit_user_text(String::new()).is_none());
        assert!(app.submit_user_text("   \n".to_string()).is_none());
        assert!(app.conversation.is_empty());
        assert_eq!(app.exchange, ExchangeState::Idle);
    }

    #[test]
    fn test_rapid_submissions_are_queued_in_order() {
        let mut app = test_app();

        let first = app.submit_user_text("A".to_string());
        assert!(first.is_some());

        // Second submission while the first is in flight: no request yet,
        // no user turn yet
        let second = app.submit_user_text("B".to_string());
        assert!(second.is_none());
        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.queued_submissions(), 1);

        // The first response lands first, then B's request fires
        let next = app.settle_completion(Ok("answer A".to_string())).unwrap();
        assert!(next.prompt.ends_with("Human: B\nAI:"));
        assert_eq!(
            senders(&app),
            vec![Sender::User, Sender::Assistant, Sender::User]
        );

        let done = app.settle_completion(Ok("answer B".to_string()));
        assert!(done.is_none());
        assert_eq!(app.conversation.len(), 4);
        assert_eq!(app.conversation.turns()[3].text, "answer B");
    }

    #[test]
    fn test_parameters_are_read_at_call_time() {
        let mut app = test_app();
        let first = app.submit_user_text("A".to_string()).unwrap();
        assert_eq!(first.temperature, 0.9);

        app.submit_user_text("B".to_string());
        app.params.temperature = 0.2;
        app.params.max_tokens = 42;

        let second = app.settle_completion(Ok("answer A".to_string())).unwrap();
        assert_eq!(second.temperature, 0.2);
        assert_eq!(second.max_tokens, 42);
    }

    #[test]
    fn test_failure_leaves_state_and_surfaces_banner() {
        let mut app = test_app();
        let before = app.params;
        app.submit_user_text("Hello".to_string());

        let next = app.settle_completion(Err(CompletionError::Network("boom".to_string())));
        assert!(next.is_none());

        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.params, before);
        assert_eq!(app.exchange, ExchangeState::Idle);
        assert!(app.last_error.as_deref().unwrap().contains("Response unavailable"));
    }

    #[test]
    fn test_failure_still_fires_queued_submission() {
        let mut app = test_app();
        app.submit_user_text("A".to_string());
        app.submit_user_text("B".to_string());

        let next = app.settle_completion(Err(CompletionError::EmptyResponse));
        let request = next.unwrap();
        assert!(request.prompt.ends_with("Human: B\nAI:"));
        assert_eq!(senders(&app), vec![Sender::User, Sender::User]);
        assert!(app.last_error.is_some());
    }

    #[test]
    fn test_error_banner_clears_on_next_submission() {
        let mut app = test_app();
        app.submit_user_text("Hello".to_string());
        app.settle_completion(Err(CompletionError::EmptyResponse));
        assert!(app.last_error.is_some());

        app.submit_user_text("again".to_string());
        assert!(app.last_error.is_none());
    }

    #[test]
    fn test_settings_selection_stays_in_bounds() {
        let mut app = test_app();
        for _ in 0..10 {
            app.settings_next();
        }
        assert_eq!(app.selected_param, Param::all().len() - 1);
        for _ in 0..10 {
            app.settings_prev();
        }
        assert_eq!(app.selected_param, 0);
    }

    #[test]
    fn test_adjusting_current_param_clamps() {
        let mut app = test_app();
        app.selected_param = 0; // temperature
        for _ in 0..100 {
            app.adjust_current_param(1);
        }
        assert_eq!(app.params.temperature, 1.0);
    }
}
