use std::sync::Arc;

use ratatui::widgets::ListState;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use eldermind_core::{
    ChatMessage, Config, Conversation, EldermindClient, Persona, TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub type ReplyOutcome = Result<ChatMessage, TransportError>;
pub type ReplyTask = JoinHandle<ReplyOutcome>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub conversation: Conversation,
    pub base_url: String,

    // Controlled input
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the message area
    pub chat_width: u16,  // inner width of the message area, for wrap estimates
    pub reply_task: Option<ReplyTask>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Persona picker state
    pub show_persona_picker: bool,
    pub persona_picker_state: ListState,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let client = EldermindClient::from_config(config);
        let base_url = client.base_url().to_string();
        let conversation = Conversation::new(Arc::new(client)).with_persona(config.persona());

        info!(%base_url, persona = %conversation.persona(), "ElderMind client ready");

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            conversation,
            base_url,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            reply_task: None,

            animation_frame: 0,

            show_persona_picker: false,
            persona_picker_state: ListState::default(),
        }
    }

    /// Trim the input and start an exchange. Blank input and busy state leave
    /// everything, including the input line, as is.
    pub fn submit_input(&mut self) {
        if self.conversation.is_loading() {
            return;
        }
        let trimmed = self.input.trim().to_string();
        let Some(exchange) = self.conversation.begin_send(&trimmed) else {
            return;
        };

        self.input.clear();
        self.input_cursor = 0;
        self.reply_task = Some(tokio::spawn(exchange.run()));
        self.scroll_chat_to_bottom();
    }

    /// Hand a finished background request back to the conversation
    pub fn complete_reply(&mut self, joined: Result<ReplyOutcome, JoinError>) {
        self.reply_task = None;
        match joined {
            Ok(outcome) => self.conversation.finish_send(outcome),
            Err(join_err) => {
                error!(error = %join_err, "chat request task did not complete");
                self.conversation
                    .finish_send(Err(TransportError::Interrupted(join_err.to_string())));
            }
        }
        self.scroll_chat_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.total_chat_lines().saturating_sub(self.visible_chat_height());
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Scroll so the latest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let total_lines = self.total_chat_lines();
        let visible_height = self.visible_chat_height();
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn visible_chat_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    /// Estimated rendered height of the conversation at the current width
    fn total_chat_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.conversation.messages() {
            total_lines += 1; // Label line ("You" / "ElderMind")
            for line in crate::ui::display_text(msg).lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                total_lines += char_count / wrap_width + 1;
            }
            total_lines += 1; // Blank line after message
        }

        if self.conversation.is_loading() {
            total_lines += 2; // Label + "Thinking..."
        }

        total_lines.min(u16::MAX as usize) as u16
    }

    // Persona picker methods
    pub fn open_persona_picker(&mut self) {
        let current = Persona::all()
            .iter()
            .position(|p| *p == self.conversation.persona());
        self.persona_picker_state.select(current.or(Some(0)));
        self.show_persona_picker = true;
    }

    pub fn persona_picker_nav_down(&mut self) {
        let len = Persona::all().len();
        let i = self.persona_picker_state.selected().unwrap_or(0);
        self.persona_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn persona_picker_nav_up(&mut self) {
        let i = self.persona_picker_state.selected().unwrap_or(0);
        self.persona_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_persona(&mut self) {
        if let Some(persona) = self
            .persona_picker_state
            .selected()
            .and_then(|i| Persona::all().get(i).copied())
        {
            self.conversation.set_persona(persona);
            if let Err(err) = Config::save_persona(persona) {
                error!(error = %err, "failed to save persona preference");
            }
        }
        self.show_persona_picker = false;
    }
}
