//! Theme presets mapped onto egui visuals.

use eframe::egui::{self, Color32, Visuals};
use shared::settings::Theme;

struct Palette {
    background: Color32,
    text: Color32,
    selection: Color32,
    field: Color32,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            background: Color32::from_rgb(0x2b, 0x2b, 0x2b),
            text: Color32::from_rgb(0xf0, 0xf0, 0xf0),
            selection: Color32::from_rgb(0x4a, 0x69, 0x87),
            field: Color32::from_rgb(0x3c, 0x3f, 0x41),
        },
        Theme::Light => Palette {
            background: Color32::from_rgb(0xf0, 0xf0, 0xf0),
            text: Color32::BLACK,
            selection: Color32::from_rgb(0xcd, 0xe8, 0xff),
            field: Color32::WHITE,
        },
        Theme::GruvboxDark => Palette {
            background: Color32::from_rgb(0x1d, 0x20, 0x21),
            text: Color32::from_rgb(0xeb, 0xdb, 0xb2),
            selection: Color32::from_rgb(0x45, 0x85, 0x88),
            field: Color32::from_rgb(0x32, 0x30, 0x2f),
        },
        Theme::SolarizedDark => Palette {
            background: Color32::from_rgb(0x00, 0x2b, 0x36),
            text: Color32::from_rgb(0x83, 0x94, 0x96),
            selection: Color32::from_rgb(0x26, 0x8b, 0xd2),
            field: Color32::from_rgb(0x07, 0x36, 0x42),
        },
        Theme::Nord => Palette {
            background: Color32::from_rgb(0x2e, 0x34, 0x40),
            text: Color32::from_rgb(0xd8, 0xde, 0xe9),
            selection: Color32::from_rgb(0x5e, 0x81, 0xac),
            field: Color32::from_rgb(0x3b, 0x42, 0x52),
        },
    }
}

/// Visuals for `theme`, built on egui's dark or light base.
pub fn visuals(theme: Theme) -> Visuals {
    let mut visuals = if theme.is_dark() {
        Visuals::dark()
    } else {
        Visuals::light()
    };
    let p = palette(theme);
    visuals.override_text_color = Some(p.text);
    visuals.panel_fill = p.background;
    visuals.window_fill = p.background;
    visuals.faint_bg_color = p.field;
    visuals.extreme_bg_color = p.field;
    visuals.code_bg_color = p.field;
    visuals.selection.bg_fill = p.selection;
    visuals.widgets.noninteractive.bg_fill = p.background;
    visuals.widgets.inactive.bg_fill = p.field;
    visuals.widgets.inactive.weak_bg_fill = p.field;
    visuals
}

pub fn apply(ctx: &egui::Context, theme: Theme) {
    tracing::debug!("applying theme {}", theme.label());
    ctx.set_visuals(visuals(theme));
}
