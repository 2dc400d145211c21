// src/ui.rs
use iced::widget::{button, container};
use iced::{Background, Color, Theme, Vector};
use once_cell::sync::Lazy;

pub struct Styles {
    pub bg: Color,
    pub fg: Color,
    pub muted_fg: Color,
    pub panel_bg: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub cell_bg: Color,
    pub footer_bg: Color,
    pub footer_fg: Color,
    pub accent: Color,
    pub accent_hover: Color,
}

pub static PALETTE: Lazy<Styles> = Lazy::new(|| Styles {
    bg: Color::from_rgb(0.96, 0.96, 0.97),
    fg: Color::from_rgb(0.1, 0.1, 0.1),
    muted_fg: Color::from_rgb(0.4, 0.4, 0.45),
    panel_bg: Color::from_rgb(1.0, 1.0, 1.0),
    header_bg: Color::from_rgb(0.2118, 0.6353, 0.9216), // #36a2eb
    header_fg: Color::from_rgb(1.0, 1.0, 1.0),
    cell_bg: Color::from_rgb(1.0, 1.0, 1.0),
    footer_bg: Color::from_rgb(0.0078, 0.325, 0.6118), // #02539c
    footer_fg: Color::from_rgb(1.0, 1.0, 1.0),
    accent: Color::from_rgb(0.2118, 0.6353, 0.9216),
    accent_hover: Color::from_rgb(0.0, 0.26, 0.5),
});

pub struct ContainerStyle {
    pub bg: Color,
}

impl container::StyleSheet for ContainerStyle {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            text_color: None,
            background: Some(Background::Color(self.bg)),
            border_radius: 0.0.into(),
            border_width: 0.0,
            border_color: Color::TRANSPARENT,
        }
    }
}

pub struct ButtonStyle {
    pub bg: Color,
    pub fg: Color,
    pub hover_bg: Color,
}

impl ButtonStyle {
    pub fn accent(palette: &Styles) -> Self {
        ButtonStyle {
            bg: palette.accent,
            fg: palette.footer_fg,
            hover_bg: palette.accent_hover,
        }
    }
}

impl button::StyleSheet for ButtonStyle {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> button::Appearance {
        button::Appearance {
            shadow_offset: Vector::new(0.0, 0.0),
            background: Some(Background::Color(self.bg)),
            border_radius: 4.0.into(),
            border_width: 0.0,
            border_color: Color::TRANSPARENT,
            text_color: self.fg,
        }
    }

    fn hovered(&self, style: &Self::Style) -> button::Appearance {
        button::Appearance {
            background: Some(Background::Color(self.hover_bg)),
            ..self.active(style)
        }
    }

    fn disabled(&self, style: &Self::Style) -> button::Appearance {
        let active = self.active(style);
        button::Appearance {
            background: Some(Background::Color(Color {
                a: 0.4,
                ..self.bg
            })),
            text_color: Color {
                a: 0.6,
                ..active.text_color
            },
            ..active
        }
    }
}
