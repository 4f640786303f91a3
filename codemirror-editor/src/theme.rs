use serde::{Deserialize, Serialize};

/// Colour themes bundled into the editor runtime. The runtime matches theme
/// names case-insensitively; the lower-case id is the canonical wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Abcdef,
    Abyss,
    AndroidStudio,
    Andromeda,
    AtomOne,
    Aura,
    BasicLight,
    BasicDark,
    Bbedit,
    Bespin,
    ConsoleDark,
    ConsoleLight,
    Copilot,
    Darcula,
    Dracula,
    DuotoneLight,
    DuotoneDark,
    Eclipse,
    GithubLight,
    GithubDark,
    GruvboxDark,
    GruvboxLight,
    Kimbie,
    MaterialLight,
    MaterialDark,
    Monokai,
    MonokaiDimmed,
    NoctisLilac,
    Nord,
    Okaidia,
    Red,
    QuietLight,
    SolarizedLight,
    SolarizedDark,
    Sublime,
    TokyoNight,
    TokyoNightStorm,
    TokyoNightDay,
    TomorrowNightBlue,
    #[default]
    VscodeDark,
    VscodeLight,
    WhiteLight,
    WhiteDark,
    XcodeLight,
    XcodeDark,
}

impl Theme {
    pub const ALL: [Theme; 45] = [
        Theme::Abcdef,
        Theme::Abyss,
        Theme::AndroidStudio,
        Theme::Andromeda,
        Theme::AtomOne,
        Theme::Aura,
        Theme::BasicLight,
        Theme::BasicDark,
        Theme::Bbedit,
        Theme::Bespin,
        Theme::ConsoleDark,
        Theme::ConsoleLight,
        Theme::Copilot,
        Theme::Darcula,
        Theme::Dracula,
        Theme::DuotoneLight,
        Theme::DuotoneDark,
        Theme::Eclipse,
        Theme::GithubLight,
        Theme::GithubDark,
        Theme::GruvboxDark,
        Theme::GruvboxLight,
        Theme::Kimbie,
        Theme::MaterialLight,
        Theme::MaterialDark,
        Theme::Monokai,
        Theme::MonokaiDimmed,
        Theme::NoctisLilac,
        Theme::Nord,
        Theme::Okaidia,
        Theme::Red,
        Theme::QuietLight,
        Theme::SolarizedLight,
        Theme::SolarizedDark,
        Theme::Sublime,
        Theme::TokyoNight,
        Theme::TokyoNightStorm,
        Theme::TokyoNightDay,
        Theme::TomorrowNightBlue,
        Theme::VscodeDark,
        Theme::VscodeLight,
        Theme::WhiteLight,
        Theme::WhiteDark,
        Theme::XcodeLight,
        Theme::XcodeDark,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Theme::Abcdef => "abcdef",
            Theme::Abyss => "abyss",
            Theme::AndroidStudio => "androidstudio",
            Theme::Andromeda => "andromeda",
            Theme::AtomOne => "atomone",
            Theme::Aura => "aura",
            Theme::BasicLight => "basiclight",
            Theme::BasicDark => "basicdark",
            Theme::Bbedit => "bbedit",
            Theme::Bespin => "bespin",
            Theme::ConsoleDark => "consoledark",
            Theme::ConsoleLight => "consolelight",
            Theme::Copilot => "copilot",
            Theme::Darcula => "darcula",
            Theme::Dracula => "dracula",
            Theme::DuotoneLight => "duotonelight",
            Theme::DuotoneDark => "duotonedark",
            Theme::Eclipse => "eclipse",
            Theme::GithubLight => "githublight",
            Theme::GithubDark => "githubdark",
            Theme::GruvboxDark => "gruvboxdark",
            Theme::GruvboxLight => "gruvboxlight",
            Theme::Kimbie => "kimbie",
            Theme::MaterialLight => "materiallight",
            Theme::MaterialDark => "materialdark",
            Theme::Monokai => "monokai",
            Theme::MonokaiDimmed => "monokaidimmed",
            Theme::NoctisLilac => "noctislilac",
            Theme::Nord => "nord",
            Theme::Okaidia => "okaidia",
            Theme::Red => "red",
            Theme::QuietLight => "quietlight",
            Theme::SolarizedLight => "solarizedlight",
            Theme::SolarizedDark => "solarizeddark",
            Theme::Sublime => "sublime",
            Theme::TokyoNight => "tokyonight",
            Theme::TokyoNightStorm => "tokyonightstorm",
            Theme::TokyoNightDay => "tokyonightday",
            Theme::TomorrowNightBlue => "tomorrownightblue",
            Theme::VscodeDark => "vscodedark",
            Theme::VscodeLight => "vscodelight",
            Theme::WhiteLight => "whitelight",
            Theme::WhiteDark => "whitedark",
            Theme::XcodeLight => "xcodelight",
            Theme::XcodeDark => "xcodedark",
        }
    }

    pub fn from_id(id: &str) -> Option<Theme> {
        Theme::ALL
            .iter()
            .copied()
            .find(|t| t.id().eq_ignore_ascii_case(id))
    }

    pub fn is_dark(self) -> bool {
        !matches!(
            self,
            Theme::BasicLight
                | Theme::Bbedit
                | Theme::ConsoleLight
                | Theme::DuotoneLight
                | Theme::Eclipse
                | Theme::GithubLight
                | Theme::GruvboxLight
                | Theme::MaterialLight
                | Theme::NoctisLilac
                | Theme::QuietLight
                | Theme::SolarizedLight
                | Theme::TokyoNightDay
                | Theme::VscodeLight
                | Theme::WhiteLight
                | Theme::XcodeLight
        )
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
