//! Decoding of SGR ("Select Graphic Rendition") escape parameters found in
//! terminal transcripts.

use once_cell::sync::Lazy;
use regex::Regex;

/// `ESC [ params m`, the only control sequence kept from transcripts.
pub(crate) static SGR_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[(?P<params>\d*(?:;\d*)*)m").unwrap());

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BasicColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl BasicColor {
    pub const ALL: [BasicColor; 8] = [
        BasicColor::Black,
        BasicColor::Red,
        BasicColor::Green,
        BasicColor::Yellow,
        BasicColor::Blue,
        BasicColor::Magenta,
        BasicColor::Cyan,
        BasicColor::White,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BasicColor::Black => "black",
            BasicColor::Red => "red",
            BasicColor::Green => "green",
            BasicColor::Yellow => "yellow",
            BasicColor::Blue => "blue",
            BasicColor::Magenta => "magenta",
            BasicColor::Cyan => "cyan",
            BasicColor::White => "white",
        }
    }

    fn hex(self) -> &'static str {
        match self {
            BasicColor::Black => "#000000",
            BasicColor::Red => "#aa0000",
            BasicColor::Green => "#00aa00",
            BasicColor::Yellow => "#aa5500",
            BasicColor::Blue => "#0000aa",
            BasicColor::Magenta => "#aa00aa",
            BasicColor::Cyan => "#00aaaa",
            BasicColor::White => "#aaaaaa",
        }
    }

    fn bright_hex(self) -> &'static str {
        match self {
            BasicColor::Black => "#555555",
            BasicColor::Red => "#ff5555",
            BasicColor::Green => "#55ff55",
            BasicColor::Yellow => "#ffff55",
            BasicColor::Blue => "#5555ff",
            BasicColor::Magenta => "#ff55ff",
            BasicColor::Cyan => "#55ffff",
            BasicColor::White => "#ffffff",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Color {
    Basic(BasicColor),
    Bright(BasicColor),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Maps an xterm 256-colour palette index: 16 system colours, a 6x6x6
    /// cube, then a 24-step grey ramp.
    pub fn from_palette(index: u8) -> Self {
        match index {
            0..=7 => Color::Basic(BasicColor::ALL[usize::from(index)]),
            8..=15 => Color::Bright(BasicColor::ALL[usize::from(index - 8)]),
            16..=231 => {
                let cube = index - 16;
                let level = |c: u8| if c == 0 { 0 } else { 55 + 40 * c };
                Color::Rgb(level(cube / 36), level(cube / 6 % 6), level(cube % 6))
            }
            232..=255 => {
                let gray = 8 + 10 * (index - 232);
                Color::Rgb(gray, gray, gray)
            }
        }
    }

    pub fn to_hex(self) -> String {
        match self {
            Color::Basic(color) => color.hex().to_string(),
            Color::Bright(color) => color.bright_hex().to_string(),
            Color::Rgb(r, g, b) => format!("#{:02x}{:02x}{:02x}", r, g, b),
        }
    }
}

/// Change requested for one colour channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Channel {
    Set(Color),
    Clear,
}

/// Attribute changes carried by one SGR sequence.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StyleAttributes {
    pub reset: bool,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub foreground: Option<Channel>,
    pub background: Option<Channel>,
}

impl StyleAttributes {
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SgrError {
    /// A parameter is not a decimal number.
    #[error("invalid SGR parameter `{0}`")]
    InvalidParameter(String),
    #[error("unsupported SGR parameter {0}")]
    Unsupported(u32),
    /// An extended colour (`38`/`48`) ran out of parameters.
    #[error("SGR parameter {0} is missing its colour arguments")]
    MissingArguments(u32),
    #[error("colour component {0} is out of range")]
    OutOfRange(u32),
}

/// Decodes the `;`-separated parameter list of an SGR sequence.
pub fn decode_sgr(params: &str) -> Result<StyleAttributes, SgrError> {
    let values = params
        .split(';')
        .map(|param| {
            if param.is_empty() {
                Ok(0)
            } else {
                param
                    .parse::<u32>()
                    .map_err(|_| SgrError::InvalidParameter(param.to_string()))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut attrs = StyleAttributes::default();
    let mut iter = values.into_iter();
    while let Some(value) = iter.next() {
        match value {
            0 => attrs = StyleAttributes::reset(),
            1 => attrs.bold = Some(true),
            3 => attrs.italic = Some(true),
            4 => attrs.underline = Some(true),
            30..=49 => {
                let channel = match value % 10 {
                    8 => Channel::Set(extended_color(value, &mut iter)?),
                    9 => Channel::Clear,
                    digit => Channel::Set(Color::Basic(BasicColor::ALL[digit as usize])),
                };
                if value < 40 {
                    attrs.foreground = Some(channel);
                } else {
                    attrs.background = Some(channel);
                }
            }
            90..=97 => {
                attrs.foreground = Some(Channel::Set(Color::Bright(
                    BasicColor::ALL[(value - 90) as usize],
                )))
            }
            100..=107 => {
                attrs.background = Some(Channel::Set(Color::Bright(
                    BasicColor::ALL[(value - 100) as usize],
                )))
            }
            other => return Err(SgrError::Unsupported(other)),
        }
    }
    Ok(attrs)
}

fn extended_color(value: u32, iter: &mut impl Iterator<Item = u32>) -> Result<Color, SgrError> {
    let mut next = || iter.next().ok_or(SgrError::MissingArguments(value));
    match next()? {
        5 => Ok(Color::from_palette(component(next()?)?)),
        2 => {
            let r = component(next()?)?;
            let g = component(next()?)?;
            let b = component(next()?)?;
            Ok(Color::Rgb(r, g, b))
        }
        other => Err(SgrError::Unsupported(other)),
    }
}

fn component(value: u32) -> Result<u8, SgrError> {
    u8::try_from(value).map_err(|_| SgrError::OutOfRange(value))
}

/// Accumulated rendition state while replaying a transcript.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StyleState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}

impl StyleState {
    pub fn apply(&mut self, attrs: &StyleAttributes) {
        if attrs.reset {
            *self = Self::default();
        }
        if let Some(bold) = attrs.bold {
            self.bold = bold;
        }
        if let Some(italic) = attrs.italic {
            self.italic = italic;
        }
        if let Some(underline) = attrs.underline {
            self.underline = underline;
        }
        if let Some(channel) = attrs.foreground {
            self.foreground = channel_color(channel);
        }
        if let Some(channel) = attrs.background {
            self.background = channel_color(channel);
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

fn channel_color(channel: Channel) -> Option<Color> {
    match channel {
        Channel::Set(color) => Some(color),
        Channel::Clear => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn reset_then_bold_red() {
        let attrs = decode_sgr("0;1;31").unwrap();
        assert!(attrs.reset);
        assert_eq!(attrs.bold, Some(true));
        assert_eq!(
            attrs.foreground,
            Some(Channel::Set(Color::Basic(BasicColor::Red)))
        );
    }

    #[test]
    fn empty_parameters_mean_reset() {
        assert_eq!(decode_sgr("").unwrap(), StyleAttributes::reset());
        assert_eq!(decode_sgr(";").unwrap(), StyleAttributes::reset());
    }

    #[test]
    fn reset_discards_earlier_attributes_in_the_same_sequence() {
        let attrs = decode_sgr("1;4;0;3").unwrap();
        assert_eq!(
            attrs,
            StyleAttributes {
                reset: true,
                italic: Some(true),
                ..StyleAttributes::default()
            }
        );
    }

    #[rstest]
    #[case(1, Color::Basic(BasicColor::Red))]
    #[case(9, Color::Bright(BasicColor::Red))]
    #[case(16, Color::Rgb(0, 0, 0))]
    #[case(21, Color::Rgb(0, 0, 255))]
    #[case(196, Color::Rgb(255, 0, 0))]
    #[case(232, Color::Rgb(8, 8, 8))]
    #[case(255, Color::Rgb(238, 238, 238))]
    fn palette_indices(#[case] index: u8, #[case] expected: Color) {
        assert_eq!(Color::from_palette(index), expected);
    }

    #[test]
    fn extended_foreground_and_background() {
        let attrs = decode_sgr("38;2;1;2;3;48;5;21").unwrap();
        assert_eq!(attrs.foreground, Some(Channel::Set(Color::Rgb(1, 2, 3))));
        assert_eq!(attrs.background, Some(Channel::Set(Color::Rgb(0, 0, 255))));
    }

    #[test]
    fn bright_ranges_and_channel_clear() {
        let attrs = decode_sgr("92;104;39").unwrap();
        assert_eq!(attrs.foreground, Some(Channel::Clear));
        assert_eq!(
            attrs.background,
            Some(Channel::Set(Color::Bright(BasicColor::Blue)))
        );
    }

    #[rstest]
    #[case("38;5", SgrError::MissingArguments(38))]
    #[case("48;2;1;2", SgrError::MissingArguments(48))]
    #[case("38;5;300", SgrError::OutOfRange(300))]
    #[case("38;7;1", SgrError::Unsupported(7))]
    #[case("22", SgrError::Unsupported(22))]
    fn malformed_sequences_are_errors(#[case] params: &str, #[case] expected: SgrError) {
        assert_eq!(decode_sgr(params), Err(expected));
    }

    #[test]
    fn state_accumulates_until_reset() {
        let mut state = StyleState::default();
        state.apply(&decode_sgr("1").unwrap());
        state.apply(&decode_sgr("34").unwrap());
        assert!(state.bold);
        assert_eq!(state.foreground, Some(Color::Basic(BasicColor::Blue)));
        state.apply(&decode_sgr("0").unwrap());
        assert!(state.is_plain());
    }

    #[test]
    fn hex_values_follow_the_terminal_palette() {
        assert_eq!(Color::Basic(BasicColor::Red).to_hex(), "#aa0000");
        assert_eq!(Color::Bright(BasicColor::Yellow).to_hex(), "#ffff55");
        assert_eq!(Color::Rgb(1, 171, 255).to_hex(), "#01abff");
    }
}
