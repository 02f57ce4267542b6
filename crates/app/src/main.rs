//! GemNet desktop shell: file browser, tabbed editor and a chat pane driven
//! by the coordinator's session controller.

mod panes;
mod simple_md;
mod theme;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use coordinator::{
    Context, EditorBuffer, FileBrowser, MessageStyle, ModelCatalog, SessionController, Surfaces,
    Transcript, ERROR_SENDER, SYSTEM_SENDER,
};
use eframe::egui;
use panes::{ChatAction, ChatPane, EditorPane, FileAction, FilePane, USER_SENDER};
use providers::GeminiBackend;
use services::settings_store;
use shared::settings::{AppSettings, Theme};
use shared::DestinationKind;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = settings_store::load_settings_or_default();
    let backend = Arc::new(GeminiBackend::new()?);
    let start_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let app = GemNetApp::new(backend, settings, start_dir);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 500.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native("GemNet", options, Box::new(|_cc| Box::new(app)))
        .map_err(|e| anyhow::anyhow!("window failed: {e}"))
}

fn surfaces<'a>(
    chat: &'a mut ChatPane,
    editor: &'a mut EditorPane,
    files: &'a mut FilePane,
) -> Surfaces<'a> {
    Surfaces {
        transcript: chat,
        editor,
        files,
    }
}

struct GemNetApp {
    controller: SessionController,
    catalog: ModelCatalog,
    settings: AppSettings,
    chat: ChatPane,
    editor: EditorPane,
    files: FilePane,
    theme_applied: Option<Theme>,
}

impl GemNetApp {
    fn new(backend: Arc<GeminiBackend>, settings: AppSettings, start_dir: PathBuf) -> Self {
        let controller = SessionController::new(backend, settings.selected_model.clone());
        let mut app = Self {
            controller,
            catalog: ModelCatalog::new(),
            settings,
            chat: ChatPane::new(),
            editor: EditorPane::new(),
            files: FilePane::new(start_dir),
            theme_applied: None,
        };
        app.chat.add_message(
            SYSTEM_SENDER,
            "Type a message, or use /create, /explain, /edit, /explain_editor, /edit_editor.",
            MessageStyle::Status,
        );
        if app.controller.check_credentials(&mut app.chat) {
            app.catalog.refresh(app.controller.backend());
        }
        app
    }

    fn save_settings(&self) {
        if let Err(e) = settings_store::save_settings(&self.settings) {
            tracing::warn!("saving settings failed: {:#}", e);
        }
    }

    fn select_model(&mut self, model: String) {
        tracing::info!("model selected: {}", model);
        self.controller.set_model(model.clone());
        self.settings.selected_model = model;
        self.save_settings();
    }

    fn poll_catalog(&mut self) {
        match self.catalog.poll() {
            Some(Ok(ids)) => {
                self.controller.apply_model_list(&ids, &mut self.chat);
                let model = self.controller.model().to_string();
                if !model.is_empty() && model != self.settings.selected_model {
                    self.settings.selected_model = model;
                    self.save_settings();
                }
            }
            Some(Err(e)) => self.chat.add_message(
                SYSTEM_SENDER,
                &format!("Could not fetch the model list: {e}"),
                MessageStyle::Warning,
            ),
            None => {}
        }
    }

    fn waiting_hint(&self) -> Option<String> {
        match self.controller.context() {
            Context::None => None,
            Context::AwaitingEditTargetInstruction { .. } => {
                Some("Waiting for edit instructions.".to_string())
            }
            Context::AwaitingEditorInstruction { editor_target } => Some(format!(
                "Waiting for instructions to edit {}.",
                editor_target.label()
            )),
            Context::AwaitingCreateDescription { filename } => {
                Some(format!("Waiting for a description of '{filename}'."))
            }
            Context::CreatingFile { filename } => Some(format!("Creating '{filename}'...")),
        }
    }

    fn handle_chat_action(&mut self, action: ChatAction) {
        match action {
            ChatAction::Send(text) => {
                self.chat.add_message(USER_SENDER, text.trim(), MessageStyle::User);
                let mut s = surfaces(&mut self.chat, &mut self.editor, &mut self.files);
                self.controller.handle_user_message(&text, &mut s);
            }
            ChatAction::Stop => self.controller.cancel_active(),
        }
    }

    fn handle_file_action(&mut self, action: FileAction) {
        let mut s = surfaces(&mut self.chat, &mut self.editor, &mut self.files);
        match action {
            FileAction::Open(paths) => {
                for path in paths {
                    if let Err(e) = s.editor.open_file(&path) {
                        s.transcript
                            .add_message(ERROR_SENDER, &format!("{e:#}"), MessageStyle::Error);
                    }
                }
            }
            FileAction::Explain(paths) => self.controller.request_explanation(&paths, &mut s),
            FileAction::Edit(paths) => self.controller.request_edit(&paths, &mut s),
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open...").clicked() {
                        self.editor.open_dialog(&self.files.current_dir());
                        ui.close_menu();
                    }
                    if ui.button("Save  (Ctrl+S)").clicked() {
                        self.editor.save_active();
                        self.files.refresh();
                        ui.close_menu();
                    }
                    if ui.button("Reload").clicked() {
                        self.editor.reload_active();
                        ui.close_menu();
                    }
                    if ui.button("Refresh files").clicked() {
                        self.files.refresh();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Model", |ui| {
                    let current = self.controller.model().to_string();
                    let mut picked = None;
                    if self.catalog.ids().is_empty() {
                        ui.label(egui::RichText::new("No models loaded").weak());
                    }
                    egui::ScrollArea::vertical().max_height(400.0).show(ui, |ui| {
                        for id in self.catalog.ids() {
                            if ui.radio(*id == current, id.as_str()).clicked() {
                                picked = Some(id.clone());
                            }
                        }
                    });
                    ui.separator();
                    let refresh = ui.add_enabled(
                        !self.catalog.is_loading(),
                        egui::Button::new("Refresh list"),
                    );
                    if refresh.clicked() {
                        self.catalog.refresh(self.controller.backend());
                        ui.close_menu();
                    }
                    if let Some(id) = picked {
                        self.select_model(id);
                        ui.close_menu();
                    }
                });

                ui.menu_button("View", |ui| {
                    ui.label(egui::RichText::new("Theme").weak());
                    for theme in Theme::ALL {
                        if ui
                            .radio(self.settings.theme == theme, theme.label())
                            .clicked()
                        {
                            self.settings.theme = theme;
                            self.save_settings();
                            ui.close_menu();
                        }
                    }
                });
            });
        });
    }

    fn status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let model = self.controller.model();
                ui.label(if model.is_empty() {
                    "Model: none".to_string()
                } else {
                    format!("Model: {model}")
                });
                ui.separator();
                match self.controller.active_destination() {
                    Some(DestinationKind::Chat) => ui.label("Streaming to chat"),
                    Some(DestinationKind::Editor) => ui.label("Streaming to editor"),
                    Some(DestinationKind::FileCreate) => ui.label("Creating file"),
                    None => ui.label("Idle"),
                };
                if self.catalog.is_loading() {
                    ui.separator();
                    ui.spinner();
                    ui.label("Loading models");
                }
                if !self.controller.context().is_none() {
                    ui.separator();
                    ui.label(
                        egui::RichText::new(self.controller.context().kind_name())
                            .small()
                            .weak(),
                    );
                }
            });
        });
    }
}

impl eframe::App for GemNetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.theme_applied != Some(self.settings.theme) {
            theme::apply(ctx, self.settings.theme);
            self.theme_applied = Some(self.settings.theme);
        }

        {
            let mut s = surfaces(&mut self.chat, &mut self.editor, &mut self.files);
            self.controller.poll_events(&mut s);
        }
        self.poll_catalog();

        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::S)) {
            self.editor.save_active();
            self.files.refresh();
        }

        self.menu_bar(ctx);
        self.status_bar(ctx);

        let mut file_action = None;
        egui::SidePanel::left("files")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                file_action = self.files.ui(ui);
            });

        let mut chat_action = None;
        let streaming = self.controller.is_streaming();
        let hint = self.waiting_hint();
        egui::SidePanel::right("chat")
            .resizable(true)
            .default_width(440.0)
            .show(ctx, |ui| {
                chat_action = self.chat.ui(ui, streaming, hint.as_deref());
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.editor.ui(ui);
        });

        if let Some(action) = file_action {
            self.handle_file_action(action);
        }
        if let Some(action) = chat_action {
            self.handle_chat_action(action);
        }

        if self.controller.pending_workers() > 0 || self.catalog.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}
