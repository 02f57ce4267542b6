//! Tabbed text editor.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _};
use coordinator::EditorBuffer;
use eframe::egui;
use egui_extras::syntax_highlighting::{highlight, CodeTheme};
use services::file_reader::{display_name, FileReader};

const UNTITLED: &str = "Untitled";

/// Extensions that get syntax colouring; anything else is shown as plain text.
const HIGHLIGHTED: &[&str] = &[
    "py", "rs", "toml", "js", "ts", "json", "c", "h", "cpp", "hpp", "java", "go", "rb", "sh",
    "html", "css", "md", "yaml", "yml", "xml", "sql",
];

/// Highlighting language for a tab, keyed by file extension.
fn highlight_language(path: Option<&Path>) -> Option<String> {
    let ext = path?.extension()?.to_str()?.to_ascii_lowercase();
    HIGHLIGHTED.contains(&ext.as_str()).then_some(ext)
}

#[derive(Debug, Clone)]
struct Tab {
    path: Option<PathBuf>,
    content: String,
    modified: bool,
}

impl Tab {
    fn title(&self) -> String {
        let name = self
            .path
            .as_deref()
            .map(display_name)
            .unwrap_or_else(|| UNTITLED.to_string());
        if self.modified {
            format!("*{name}")
        } else {
            name
        }
    }
}

#[derive(Default)]
pub struct EditorPane {
    tabs: Vec<Tab>,
    active: usize,
    /// Tab receiving streamed text, fixed when a stream starts.
    stream_tab: Option<usize>,
    status: Option<String>,
    reader: FileReader,
}

impl EditorPane {
    pub fn new() -> Self {
        Self::default()
    }

    fn active_tab(&self) -> Option<&Tab> {
        self.tabs.get(self.active)
    }

    pub fn is_streaming(&self) -> bool {
        self.stream_tab.is_some()
    }

    /// Native open dialog.
    pub fn open_dialog(&mut self, start_dir: &Path) {
        if let Some(path) = rfd::FileDialog::new().set_directory(start_dir).pick_file() {
            if let Err(e) = self.open_file(&path) {
                self.status = Some(format!("{e:#}"));
            }
        }
    }

    /// Saves the active tab, asking for a path when it has none.
    pub fn save_active(&mut self) {
        let Some(tab) = self.tabs.get(self.active) else {
            return;
        };
        let path = match &tab.path {
            Some(p) => p.clone(),
            None => match rfd::FileDialog::new().set_file_name("untitled.txt").save_file() {
                Some(p) => p,
                None => return,
            },
        };
        match self.write_active(&path) {
            Ok(()) => self.status = Some(format!("Saved {}", display_name(&path))),
            Err(e) => {
                tracing::warn!("save failed: {:#}", e);
                self.status = Some(format!("{e:#}"));
            }
        }
    }

    fn write_active(&mut self, path: &Path) -> anyhow::Result<()> {
        let tab = self
            .tabs
            .get_mut(self.active)
            .ok_or_else(|| anyhow!("no tab open"))?;
        std::fs::write(path, &tab.content)
            .with_context(|| format!("Could not save '{}'", display_name(path)))?;
        tab.path = Some(path.to_path_buf());
        tab.modified = false;
        Ok(())
    }

    /// Re-reads the active tab from disk, discarding edits.
    pub fn reload_active(&mut self) {
        let Some(path) = self.active_tab().and_then(|t| t.path.clone()) else {
            return;
        };
        match self.read(&path) {
            Ok(content) => {
                if let Some(tab) = self.tabs.get_mut(self.active) {
                    tab.content = content;
                    tab.modified = false;
                }
                self.status = Some(format!("Reloaded {}", display_name(&path)));
            }
            Err(e) => self.status = Some(format!("{e:#}")),
        }
    }

    fn close_tab(&mut self, idx: usize) {
        if idx >= self.tabs.len() {
            return;
        }
        self.tabs.remove(idx);
        self.stream_tab = match self.stream_tab {
            Some(s) if s == idx => None,
            Some(s) if s > idx => Some(s - 1),
            other => other,
        };
        if self.active >= idx && self.active > 0 {
            self.active -= 1;
        }
    }

    fn read(&self, path: &Path) -> anyhow::Result<String> {
        let mut batch = self.reader.read_files(&[path]);
        if let Some(skipped) = batch.skipped.first() {
            return Err(anyhow!("{}", skipped.reason));
        }
        batch
            .files
            .pop()
            .map(|f| f.content)
            .ok_or_else(|| anyhow!("nothing was read"))
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        let mut close = None;
        ui.horizontal_wrapped(|ui| {
            for (idx, tab) in self.tabs.iter().enumerate() {
                let mut title = tab.title();
                if self.stream_tab == Some(idx) {
                    title.push_str(" ⟳");
                }
                if ui.selectable_label(idx == self.active, title).clicked() {
                    self.active = idx;
                }
                if ui.small_button("x").on_hover_text("Close tab").clicked() {
                    close = Some(idx);
                }
                ui.separator();
            }
        });
        if let Some(idx) = close {
            self.close_tab(idx);
        }

        if let Some(status) = &self.status {
            ui.label(egui::RichText::new(status).small().weak());
        }
        ui.separator();

        let streaming_here = self.stream_tab == Some(self.active);
        let Some(tab) = self.tabs.get_mut(self.active) else {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("No file open").weak());
            });
            return;
        };
        // Re-laid out every frame, so a finished stream or reload is
        // coloured without extra bookkeeping.
        let mut layouter = highlight_language(tab.path.as_deref()).map(|language| {
            let theme = CodeTheme::from_memory(ui.ctx());
            move |ui: &egui::Ui, text: &str, wrap_width: f32| {
                let mut job = highlight(ui.ctx(), &theme, text, &language);
                job.wrap.max_width = wrap_width;
                ui.fonts(|f| f.layout_job(job))
            }
        });
        egui::ScrollArea::both()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let mut editor = egui::TextEdit::multiline(&mut tab.content)
                    .code_editor()
                    .interactive(!streaming_here)
                    .desired_width(f32::INFINITY)
                    .desired_rows(30);
                if let Some(layouter) = layouter.as_mut() {
                    editor = editor.layouter(layouter);
                }
                if ui.add(editor).changed() {
                    tab.modified = true;
                }
            });
    }
}

impl EditorBuffer for EditorPane {
    fn has_open_tab(&self) -> bool {
        !self.tabs.is_empty()
    }

    fn current_path(&self) -> Option<PathBuf> {
        self.active_tab().and_then(|t| t.path.clone())
    }

    fn current_content(&self) -> Option<String> {
        self.active_tab().map(|t| t.content.clone())
    }

    fn open_file(&mut self, path: &Path) -> anyhow::Result<()> {
        if let Some(idx) = self.tabs.iter().position(|t| t.path.as_deref() == Some(path)) {
            self.active = idx;
            return Ok(());
        }
        let content = self
            .read(path)
            .with_context(|| format!("Could not open '{}'", display_name(path)))?;
        self.tabs.push(Tab {
            path: Some(path.to_path_buf()),
            content,
            modified: false,
        });
        self.active = self.tabs.len() - 1;
        self.status = None;
        Ok(())
    }

    fn stream_started(&mut self, sender: &str) {
        if self.tabs.is_empty() {
            self.tabs.push(Tab {
                path: None,
                content: String::new(),
                modified: false,
            });
            self.active = 0;
        }
        self.stream_tab = Some(self.active);
        if let Some(tab) = self.tabs.get_mut(self.active) {
            tab.content.clear();
        }
        self.status = Some(format!("{sender} is writing..."));
    }

    fn stream_chunk(&mut self, text: &str) {
        if let Some(tab) = self.stream_tab.and_then(|idx| self.tabs.get_mut(idx)) {
            tab.content.push_str(text);
        }
    }

    fn stream_finished(&mut self, sender: &str) {
        if let Some(tab) = self.stream_tab.take().and_then(|idx| self.tabs.get_mut(idx)) {
            tab.modified = true;
        }
        self.status = Some(format!("{sender} finished. Review and save."));
    }

    fn stream_error(&mut self, message: &str) {
        self.stream_tab = None;
        self.status = Some(format!("Error: {message}"));
    }
}
