//! Directory browser.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use coordinator::FileBrowser;
use eframe::egui;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// Lists `dir` with directories first, each group sorted case-insensitively.
pub fn list_dir(dir: &Path) -> std::io::Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: path.is_dir(),
            path,
        });
    }
    entries.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(entries)
}

/// What the user asked for in the file pane this frame.
pub enum FileAction {
    Open(Vec<PathBuf>),
    Explain(Vec<PathBuf>),
    Edit(Vec<PathBuf>),
}

pub struct FilePane {
    dir: PathBuf,
    entries: Vec<DirEntry>,
    selected: BTreeSet<PathBuf>,
    error: Option<String>,
}

impl FilePane {
    pub fn new(dir: PathBuf) -> Self {
        let mut pane = Self {
            dir,
            entries: Vec::new(),
            selected: BTreeSet::new(),
            error: None,
        };
        pane.refresh();
        pane
    }

    pub fn enter(&mut self, dir: PathBuf) {
        self.dir = dir;
        self.selected.clear();
        self.refresh();
    }

    pub fn selection(&self) -> Vec<PathBuf> {
        // keep listing order rather than set order
        self.entries
            .iter()
            .filter(|e| self.selected.contains(&e.path))
            .map(|e| e.path.clone())
            .collect()
    }

    /// Selection for a context-menu action on `clicked`: the whole selection
    /// if `clicked` is part of it, else just `clicked`.
    fn targets_for(&self, clicked: &Path) -> Vec<PathBuf> {
        if self.selected.contains(clicked) {
            self.selection()
        } else {
            vec![clicked.to_path_buf()]
        }
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) -> Option<FileAction> {
        let mut action = None;
        let mut navigate = None;

        ui.horizontal(|ui| {
            let parent = self.dir.parent().map(Path::to_path_buf);
            if ui
                .add_enabled(parent.is_some(), egui::Button::new("⬆"))
                .on_hover_text("Up")
                .clicked()
            {
                navigate = parent;
            }
            if ui.button("⟳").on_hover_text("Refresh").clicked() {
                self.refresh();
            }
        });
        ui.label(egui::RichText::new(self.dir.display().to_string()).small().weak());
        if let Some(err) = &self.error {
            ui.label(egui::RichText::new(err).small().color(egui::Color32::from_rgb(230, 90, 90)));
        }
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for entry in self.entries.clone() {
                    let icon = if entry.is_dir { "📁" } else { "📄" };
                    let selected = self.selected.contains(&entry.path);
                    let response =
                        ui.selectable_label(selected, format!("{icon} {}", entry.name));

                    if response.clicked() {
                        let ctrl = ui.input(|i| i.modifiers.command);
                        if !ctrl {
                            self.selected.clear();
                        }
                        if selected && ctrl {
                            self.selected.remove(&entry.path);
                        } else {
                            self.selected.insert(entry.path.clone());
                        }
                    }
                    if response.double_clicked() {
                        if entry.is_dir {
                            navigate = Some(entry.path.clone());
                        } else {
                            action = Some(FileAction::Open(vec![entry.path.clone()]));
                        }
                    }
                    if !entry.is_dir {
                        response.context_menu(|ui| {
                            let targets = self.targets_for(&entry.path);
                            if ui.button("Open").clicked() {
                                action = Some(FileAction::Open(targets.clone()));
                                ui.close_menu();
                            }
                            if ui.button("Explain").clicked() {
                                action = Some(FileAction::Explain(targets.clone()));
                                ui.close_menu();
                            }
                            if ui.button("Edit").clicked() {
                                action = Some(FileAction::Edit(targets));
                                ui.close_menu();
                            }
                        });
                    }
                }
            });

        if let Some(dir) = navigate {
            self.enter(dir);
        }
        action
    }
}

impl FileBrowser for FilePane {
    fn current_dir(&self) -> PathBuf {
        self.dir.clone()
    }

    fn refresh(&mut self) {
        match list_dir(&self.dir) {
            Ok(entries) => {
                self.selected.retain(|p| entries.iter().any(|e| &e.path == p));
                self.entries = entries;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!("listing {} failed: {}", self.dir.display(), e);
                self.entries.clear();
                self.selected.clear();
                self.error = Some(format!("Cannot list folder: {e}"));
            }
        }
    }
}
