//! Chat transcript and input line.

use chrono::{DateTime, Local};
use coordinator::{MessageStyle, Transcript};
use eframe::egui;
use shared::DestinationKind;

use crate::simple_md;

pub const USER_SENDER: &str = "You";

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryBody {
    Message(MessageStyle),
    /// Streamed output. Raw while `open`, rendered once closed.
    Stream {
        destination: DestinationKind,
        open: bool,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    sender: String,
    text: String,
    body: EntryBody,
    at: DateTime<Local>,
}

pub enum ChatAction {
    Send(String),
    Stop,
}

#[derive(Default)]
pub struct ChatPane {
    entries: Vec<Entry>,
    input: String,
}

impl ChatPane {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_stream_mut(&mut self) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .rev()
            .find(|e| matches!(e.body, EntryBody::Stream { open: true, .. }))
    }

    fn close_open_stream(&mut self) {
        if let Some(entry) = self.open_stream_mut() {
            if let EntryBody::Stream { open, .. } = &mut entry.body {
                *open = false;
            }
        }
    }

    fn push(&mut self, sender: &str, text: &str, body: EntryBody) {
        self.entries.push(Entry {
            sender: sender.to_string(),
            text: text.to_string(),
            body,
            at: Local::now(),
        });
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, streaming: bool, waiting_for: Option<&str>) -> Option<ChatAction> {
        let mut action = None;

        egui::TopBottomPanel::bottom("chat_input")
            .resizable(false)
            .show_inside(ui, |ui| {
                ui.add_space(4.0);
                if let Some(hint) = waiting_for {
                    ui.label(egui::RichText::new(hint).small().italics());
                }
                ui.horizontal(|ui| {
                    let input = ui.add(
                        egui::TextEdit::singleline(&mut self.input)
                            .hint_text("Message, or /create /explain /edit /explain_editor /edit_editor")
                            .desired_width(ui.available_width() - 120.0),
                    );
                    let submitted =
                        input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    let send = ui.button("Send").clicked();
                    if (submitted || send) && !self.input.trim().is_empty() {
                        action = Some(ChatAction::Send(std::mem::take(&mut self.input)));
                        input.request_focus();
                    }
                    if ui
                        .add_enabled(streaming, egui::Button::new("Stop"))
                        .clicked()
                    {
                        action = Some(ChatAction::Stop);
                    }
                });
                ui.add_space(4.0);
            });

        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let base_color = ui.visuals().text_color();
                for entry in &self.entries {
                    draw_entry(ui, entry, base_color);
                    ui.add_space(6.0);
                }
            });

        action
    }
}

fn style_color(style: MessageStyle, base: egui::Color32) -> egui::Color32 {
    match style {
        MessageStyle::Normal => base,
        MessageStyle::User => egui::Color32::from_rgb(120, 170, 230),
        MessageStyle::Status => egui::Color32::from_rgb(140, 140, 150),
        MessageStyle::Warning => egui::Color32::from_rgb(220, 170, 60),
        MessageStyle::Error => egui::Color32::from_rgb(230, 90, 90),
    }
}

fn draw_entry(ui: &mut egui::Ui, entry: &Entry, base_color: egui::Color32) {
    let header_color = match &entry.body {
        EntryBody::Message(style) => style_color(*style, base_color),
        EntryBody::Stream { .. } => egui::Color32::from_rgb(110, 200, 140),
    };
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(&entry.sender).strong().color(header_color));
        ui.label(egui::RichText::new(entry.at.format("%H:%M").to_string()).small().weak());
        if let EntryBody::Stream {
            destination: DestinationKind::FileCreate,
            ..
        } = entry.body
        {
            ui.label(egui::RichText::new("file content").small().weak());
        }
    });

    match &entry.body {
        EntryBody::Message(MessageStyle::Normal | MessageStyle::User) => {
            ui.label(egui::RichText::new(&entry.text).color(base_color));
        }
        EntryBody::Message(style) => {
            ui.label(egui::RichText::new(&entry.text).color(style_color(*style, base_color)));
        }
        EntryBody::Stream { open: true, .. } => {
            ui.label(egui::RichText::new(&entry.text).color(base_color));
            ui.spinner();
        }
        EntryBody::Stream {
            destination: DestinationKind::FileCreate,
            ..
        } => {
            ui.label(egui::RichText::new(&entry.text).monospace().color(base_color));
        }
        EntryBody::Stream { .. } => simple_md::render_markdown(ui, &entry.text, base_color),
    }
}

impl Transcript for ChatPane {
    fn add_message(&mut self, sender: &str, text: &str, style: MessageStyle) {
        self.push(sender, text, EntryBody::Message(style));
    }

    fn stream_started(&mut self, sender: &str, destination: DestinationKind) {
        self.close_open_stream();
        self.push(sender, "", EntryBody::Stream { destination, open: true });
    }

    fn stream_chunk(&mut self, text: &str) {
        if let Some(entry) = self.open_stream_mut() {
            entry.text.push_str(text);
        }
    }

    fn stream_finished(&mut self, _sender: &str, _destination: DestinationKind) {
        self.close_open_stream();
    }

    fn stream_error(&mut self, message: &str, _destination: DestinationKind) {
        self.close_open_stream();
        self.push(coordinator::ERROR_SENDER, message, EntryBody::Message(MessageStyle::Error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_append_to_the_open_region_only() {
        let mut chat = ChatPane::new();
        chat.stream_started("Gemini", DestinationKind::Chat);
        chat.stream_chunk("Hel");
        chat.add_message("GemNet", "notice", MessageStyle::Status);
        chat.stream_chunk("lo");
        chat.stream_finished("Gemini", DestinationKind::Chat);
        chat.stream_chunk("ignored");

        assert_eq!(chat.entries.len(), 2);
        assert_eq!(chat.entries[0].text, "Hello");
        assert_eq!(
            chat.entries[0].body,
            EntryBody::Stream {
                destination: DestinationKind::Chat,
                open: false
            }
        );
    }

    #[test]
    fn error_closes_region_and_adds_error_entry() {
        let mut chat = ChatPane::new();
        chat.stream_started("Gemini", DestinationKind::FileCreate);
        chat.stream_chunk("partial");
        chat.stream_error("cancelled", DestinationKind::FileCreate);

        assert_eq!(chat.entries.len(), 2);
        assert!(matches!(chat.entries[0].body, EntryBody::Stream { open: false, .. }));
        assert_eq!(chat.entries[1].body, EntryBody::Message(MessageStyle::Error));
        assert_eq!(chat.entries[1].text, "cancelled");
    }
}
