use std::io::IsTerminal;

use clap::{
  ValueEnum,
  builder::styling::{Ansi256Color, AnsiColor, Color as ClapColor, RgbColor, Style, Styles},
};
use comfy_table::Color as ComfyColor;
use crossterm::style::Color;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
  Always,
  Auto,
  Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeMode {
  Dark,
  Light,
  Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
  Dark,
  Light,
}

/// What a piece of console output is, mapped to a color per theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Timestamp,
  Primary,
  Accent,
  Info,
  Success,
  Label,
  Value,
}

#[derive(Debug, Clone, Copy)]
pub struct Colors {
  enabled: bool,
  theme: Theme,
}

impl Colors {
  pub const fn new(enabled: bool, theme: Theme) -> Self {
    Self { enabled, theme }
  }

  pub const fn color(&self, role: Role) -> Color {
    if !self.enabled {
      return Color::Reset;
    }

    let (r, g, b) = match (self.theme, role) {
      (Theme::Dark, Role::Timestamp | Role::Info | Role::Success) => (118, 166, 166),
      (Theme::Dark, Role::Primary) => (191, 126, 4),
      (Theme::Dark, Role::Accent) => (166, 84, 55),
      (Theme::Dark, Role::Label) => (217, 164, 4),
      (Theme::Dark, Role::Value) => (242, 211, 56),
      (Theme::Light, Role::Timestamp) => (92, 62, 38),
      (Theme::Light, Role::Primary) => (70, 42, 25),
      (Theme::Light, Role::Accent) => (211, 99, 70),
      (Theme::Light, Role::Info) => (40, 111, 170),
      (Theme::Light, Role::Success) => (34, 142, 90),
      (Theme::Light, Role::Label) => (176, 103, 66),
      (Theme::Light, Role::Value) => (199, 146, 76),
    };
    Color::Rgb { r, g, b }
  }

  pub fn table_color(&self, role: Role) -> ComfyColor {
    match self.color(role) {
      Color::Rgb { r, g, b } => ComfyColor::Rgb { r, g, b },
      Color::AnsiValue(value) => ComfyColor::AnsiValue(value),
      _ => ComfyColor::Reset,
    }
  }

  const fn clap_color(color: Color) -> Option<ClapColor> {
    match color {
      Color::Rgb { r, g, b } => Some(ClapColor::Rgb(RgbColor(r, g, b))),
      Color::AnsiValue(value) => Some(ClapColor::Ansi256(Ansi256Color(value))),
      Color::Red | Color::DarkRed => Some(ClapColor::Ansi(AnsiColor::Red)),
      _ => None,
    }
  }

  pub const fn clap_styles() -> Styles {
    let colors = Self::new(true, Theme::Dark);

    Styles::styled()
      .header(
        Style::new()
          .bold()
          .underline()
          .fg_color(Self::clap_color(colors.color(Role::Label))),
      )
      .usage(Style::new().bold().fg_color(Self::clap_color(colors.color(Role::Label))))
      .literal(Style::new().fg_color(Self::clap_color(colors.color(Role::Success))))
      .placeholder(Style::new().fg_color(Self::clap_color(colors.color(Role::Info))))
      .error(Style::new().bold().fg_color(Self::clap_color(colors.color(Role::Accent))))
      .valid(Style::new().fg_color(Self::clap_color(colors.color(Role::Success))))
      .invalid(Style::new().bold().fg_color(Self::clap_color(colors.color(Role::Accent))))
  }
}

pub fn colors_enabled(mode: ColorMode) -> bool {
  match mode {
    ColorMode::Always => true,
    ColorMode::Never => false,
    ColorMode::Auto => std::io::stdout().is_terminal(),
  }
}

pub fn detect_theme(mode: ThemeMode) -> Theme {
  match mode {
    ThemeMode::Dark => Theme::Dark,
    ThemeMode::Light => Theme::Light,
    ThemeMode::Auto => detect_terminal_theme(),
  }
}

/// `COLORFGBG` carries the background palette index last; 8 and above are light colors.
fn detect_terminal_theme() -> Theme {
  if let Ok(colorfgbg) = std::env::var("COLORFGBG")
    && let Some(background) = colorfgbg.split(';').next_back()
    && let Ok(index) = background.parse::<u8>()
  {
    return if index >= 8 { Theme::Light } else { Theme::Dark };
  }
  Theme::Dark
}
