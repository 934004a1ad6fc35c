//! Immutable terminal styles and their SGR serialization.
//!
//! A [`Style`] is a plain `Copy` value. Composition never mutates: every
//! builder and [`Style::with_foreground`] / [`Style::with_background`] return
//! a new value.
//!
//! Each channel (foreground, background) has three tiers: 4-bit indexed,
//! 8-bit indexed, and 24-bit RGB. Imprecise composition can leave several
//! tiers populated on one channel; serialization then emits only the
//! highest-fidelity one (24-bit over 8-bit over 4-bit).

/// Universal SGR reset.
pub const SGR_RESET: &str = "\x1b[m";

/// 24-bit color triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// The three color tiers of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ColorTiers {
    pub c4: Option<u8>,
    pub c8: Option<u8>,
    pub c24: Option<Rgb>,
}

impl ColorTiers {
    const NONE: ColorTiers = ColorTiers {
        c4: None,
        c8: None,
        c24: None,
    };

    pub fn is_empty(&self) -> bool {
        self.c4.is_none() && self.c8.is_none() && self.c24.is_none()
    }

    /// Copy of `self` with the first tier present on `other` applied,
    /// checked 4-bit, then 8-bit, then 24-bit.
    fn merged(self, other: ColorTiers) -> ColorTiers {
        if let Some(c) = other.c4 {
            ColorTiers { c4: Some(c), ..self }
        } else if let Some(c) = other.c8 {
            ColorTiers { c8: Some(c), ..self }
        } else if let Some(c) = other.c24 {
            ColorTiers { c24: Some(c), ..self }
        } else {
            self
        }
    }

    /// SGR parameters for this channel. `base` is 30 (fg) or 40 (bg).
    fn sgr_params(&self, base: u16) -> Option<String> {
        if let Some(Rgb { r, g, b }) = self.c24 {
            Some(format!("{};2;{};{};{}", base + 8, r, g, b))
        } else if let Some(c) = self.c8 {
            Some(format!("{};5;{}", base + 8, c))
        } else {
            self.c4.map(|c| {
                let bright = if c > 7 { 60 } else { 0 };
                (base + bright + u16::from(c % 8)).to_string()
            })
        }
    }
}

/// Boolean text attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Attributes {
    pub bold: bool,
    pub faint: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub reverse: bool,
    pub strike: bool,
}

impl Attributes {
    const NONE: Attributes = Attributes {
        bold: false,
        faint: false,
        italic: false,
        underline: false,
        blink: false,
        reverse: false,
        strike: false,
    };

    /// SGR codes in fixed emission order.
    fn codes(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.bold, "1"),
            (self.faint, "2"),
            (self.italic, "3"),
            (self.underline, "4"),
            (self.blink, "5"),
            (self.reverse, "7"),
            (self.strike, "9"),
        ]
        .into_iter()
        .filter_map(|(on, code)| on.then_some(code))
    }
}

/// An immutable terminal style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style {
    pub fg: ColorTiers,
    pub bg: ColorTiers,
    pub attrs: Attributes,
}

impl Style {
    /// The empty style: serializes to nothing.
    pub const fn new() -> Self {
        Style {
            fg: ColorTiers::NONE,
            bg: ColorTiers::NONE,
            attrs: Attributes::NONE,
        }
    }

    // -- Builders --

    pub const fn fg4(mut self, code: u8) -> Self {
        self.fg.c4 = Some(code);
        self
    }

    pub const fn fg8(mut self, code: u8) -> Self {
        self.fg.c8 = Some(code);
        self
    }

    pub const fn fg24(mut self, r: u8, g: u8, b: u8) -> Self {
        self.fg.c24 = Some(Rgb { r, g, b });
        self
    }

    pub const fn bg4(mut self, code: u8) -> Self {
        self.bg.c4 = Some(code);
        self
    }

    pub const fn bg8(mut self, code: u8) -> Self {
        self.bg.c8 = Some(code);
        self
    }

    pub const fn bg24(mut self, r: u8, g: u8, b: u8) -> Self {
        self.bg.c24 = Some(Rgb { r, g, b });
        self
    }

    pub const fn bold(mut self) -> Self {
        self.attrs.bold = true;
        self
    }

    pub const fn faint(mut self) -> Self {
        self.attrs.faint = true;
        self
    }

    pub const fn italic(mut self) -> Self {
        self.attrs.italic = true;
        self
    }

    pub const fn underline(mut self) -> Self {
        self.attrs.underline = true;
        self
    }

    pub const fn blink(mut self) -> Self {
        self.attrs.blink = true;
        self
    }

    pub const fn reverse(mut self) -> Self {
        self.attrs.reverse = true;
        self
    }

    pub const fn strike(mut self) -> Self {
        self.attrs.strike = true;
        self
    }

    // -- Composition --

    /// Copy of `self` taking the foreground of `other`.
    ///
    /// Only the first foreground tier set on `other` is applied (4-bit, then
    /// 8-bit, then 24-bit). With no foreground on `other`, returns `self`.
    pub fn with_foreground(&self, other: &Style) -> Style {
        Style {
            fg: self.fg.merged(other.fg),
            ..*self
        }
    }

    /// Copy of `self` taking the background of `other`. Same tier rule as
    /// [`Style::with_foreground`], applied to the background channel.
    pub fn with_background(&self, other: &Style) -> Style {
        Style {
            bg: self.bg.merged(other.bg),
            ..*self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fg.is_empty() && self.bg.is_empty() && self.attrs == Attributes::NONE
    }

    // -- Serialization --

    /// One SGR sequence enabling this style; empty when nothing is set.
    pub fn sgr_enable(&self) -> String {
        let mut params: Vec<String> = Vec::new();
        params.extend(self.fg.sgr_params(30));
        params.extend(self.bg.sgr_params(40));
        params.extend(self.attrs.codes().map(str::to_string));

        if params.is_empty() {
            String::new()
        } else {
            format!("\x1b[{}m", params.join(";"))
        }
    }

    /// Always the universal reset, whatever the style contains.
    pub fn sgr_disable(&self) -> &'static str {
        SGR_RESET
    }
}

// ============================================================================
// PALETTE
// ============================================================================

pub const BLACK: Style = Style::new().fg4(0);
pub const RED: Style = Style::new().fg4(1);
pub const GREEN: Style = Style::new().fg4(2);
pub const YELLOW: Style = Style::new().fg4(3);
pub const BLUE: Style = Style::new().fg4(4);
pub const MAGENTA: Style = Style::new().fg4(5);
pub const CYAN: Style = Style::new().fg4(6);
pub const WHITE: Style = Style::new().fg4(7);
pub const BRIGHT_BLACK: Style = Style::new().fg4(8);
pub const BRIGHT_RED: Style = Style::new().fg4(9);
pub const BRIGHT_GREEN: Style = Style::new().fg4(10);
pub const BRIGHT_YELLOW: Style = Style::new().fg4(11);
pub const BRIGHT_BLUE: Style = Style::new().fg4(12);
pub const BRIGHT_MAGENTA: Style = Style::new().fg4(13);
pub const BRIGHT_CYAN: Style = Style::new().fg4(14);
pub const BRIGHT_WHITE: Style = Style::new().fg4(15);

// ============================================================================
// TESTS
// ============================================================================
