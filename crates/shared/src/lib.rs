pub mod destination;

pub use destination::DestinationKind;

pub mod settings {
    use serde::{Deserialize, Serialize};

    /// Model used until a model list has been fetched or a choice was saved.
    pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

    /// Environment variable holding the Gemini API key.
    pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

    fn default_model() -> String {
        DEFAULT_MODEL.to_string()
    }

    /// Colour scheme of the main window.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Theme {
        #[default]
        Dark,
        Light,
        GruvboxDark,
        SolarizedDark,
        Nord,
    }

    impl Theme {
        pub const ALL: [Theme; 5] = [
            Theme::Dark,
            Theme::Light,
            Theme::GruvboxDark,
            Theme::SolarizedDark,
            Theme::Nord,
        ];

        pub fn label(self) -> &'static str {
            match self {
                Theme::Dark => "Dark",
                Theme::Light => "Light",
                Theme::GruvboxDark => "Gruvbox Dark",
                Theme::SolarizedDark => "Solarized Dark",
                Theme::Nord => "Nord",
            }
        }

        pub fn is_dark(self) -> bool {
            self != Theme::Light
        }
    }

    /// Preferences persisted between launches.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AppSettings {
        /// Last model picked in the model menu (short id, e.g. "gemini-1.5-pro").
        #[serde(default = "default_model")]
        pub selected_model: String,
        /// Unknown names fall back to the default theme.
        #[serde(default, deserialize_with = "lenient_theme")]
        pub theme: Theme,
    }

    impl Default for AppSettings {
        fn default() -> Self {
            Self {
                selected_model: default_model(),
                theme: Theme::default(),
            }
        }
    }

    fn lenient_theme<'de, D>(deserializer: D) -> Result<Theme, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Theme::deserialize(serde::de::value::StrDeserializer::<D::Error>::new(&name))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::settings::{AppSettings, Theme, DEFAULT_MODEL};

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: AppSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.selected_model, DEFAULT_MODEL);
        assert_eq!(settings.theme, Theme::Dark);
    }

    #[test]
    fn test_settings_keep_saved_model() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"selected_model":"gemini-1.5-pro","theme":"nord"}"#)
                .unwrap();
        assert_eq!(settings.selected_model, "gemini-1.5-pro");
        assert_eq!(settings.theme, Theme::Nord);
    }

    #[test]
    fn test_theme_names_match_saved_form() {
        for theme in Theme::ALL {
            let json = serde_json::to_string(&theme).unwrap();
            let back: Theme = serde_json::from_str(&json).unwrap();
            assert_eq!(back, theme);
        }
        assert_eq!(serde_json::to_string(&Theme::GruvboxDark).unwrap(), r#""gruvbox_dark""#);
        assert_eq!(serde_json::to_string(&Theme::SolarizedDark).unwrap(), r#""solarized_dark""#);
    }

    #[test]
    fn test_unknown_theme_falls_back_to_default() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"selected_model":"m","theme":"neon"}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.selected_model, "m");
        assert!(!Theme::Light.is_dark());
        assert!(Theme::Nord.is_dark());
    }
}
