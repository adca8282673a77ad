use std::collections::BTreeMap;

use lopdf::{dictionary, Document, ObjectId};

/// The base-14 fonts the editor paints with. None of them needs a font program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesItalic,
    Courier,
}

impl StandardFont {
    pub const ALL: [StandardFont; 5] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::TimesRoman,
        StandardFont::TimesItalic,
        StandardFont::Courier,
    ];

    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::TimesRoman => "Times-Roman",
            Self::TimesItalic => "Times-Italic",
            Self::Courier => "Courier",
        }
    }

    /// Name under which the font is registered in page resources.
    pub fn resource_name(self) -> &'static str {
        match self {
            Self::Helvetica => "Helv",
            Self::HelveticaBold => "HeBo",
            Self::TimesRoman => "TiRo",
            Self::TimesItalic => "TiIt",
            Self::Courier => "Cour",
        }
    }

    pub fn from_base_font(name: &str) -> Option<Self> {
        // Subset prefixes look like "ABCDEF+Helvetica".
        let name = name.rsplit('+').next().unwrap_or(name);
        Self::ALL.into_iter().find(|font| font.base_font().eq_ignore_ascii_case(name))
    }
}

/// Font dictionaries embedded in one graph, keyed by font.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontSet {
    ids: BTreeMap<StandardFont, ObjectId>,
}

impl FontSet {
    /// Adds a Type1/WinAnsi dictionary for every standard font.
    pub fn embed_standard(doc: &mut Document) -> Self {
        let ids = StandardFont::ALL
            .into_iter()
            .map(|font| {
                let id = doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => font.base_font(),
                    "Encoding" => "WinAnsiEncoding",
                });
                (font, id)
            })
            .collect();
        Self { ids }
    }

    pub fn get(&self, font: StandardFont) -> Option<ObjectId> {
        self.ids.get(&font).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Characters behind WinAnsi codes 0x80..=0x9F. Unassigned codes are `None`.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// Encodes text for a WinAnsi simple font. Characters the encoding lacks
/// become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match u32::from(c) {
        code @ (0..=0x7F | 0xA0..=0xFF) => code as u8,
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|mapped| *mapped == Some(c))
            .map_or(b'?', |offset| 0x80 + offset as u8),
    }
}

/// Decodes bytes shown with a WinAnsi simple font. Unassigned codes fall
/// back to their Latin-1 reading.
pub fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| match byte {
            0x80..=0x9F => WIN_ANSI_HIGH[usize::from(byte - 0x80)].unwrap_or(char::from(*byte)),
            _ => char::from(*byte),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_every_standard_font() {
        let mut doc = Document::with_version("1.7");
        let fonts = FontSet::embed_standard(&mut doc);
        assert_eq!(fonts.len(), 5);

        let helvetica = fonts.get(StandardFont::Helvetica).expect("helvetica embedded");
        let dict = doc.get_dictionary(helvetica).expect("font dictionary");
        assert_eq!(dict.get(b"BaseFont").and_then(|o| o.as_name()).expect("base font"), b"Helvetica");
    }

    #[test]
    fn subset_prefix_is_ignored() {
        assert_eq!(StandardFont::from_base_font("ABCDEF+Courier"), Some(StandardFont::Courier));
        assert_eq!(StandardFont::from_base_font("Arial"), None);
    }

    #[test]
    fn non_latin_characters_are_replaced() {
        assert_eq!(encode_win_ansi("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn typographic_punctuation_uses_the_windows_range() {
        let text = "\u{20AC}5 \u{201C}quoted\u{201D} \u{2014} it\u{2019}s";
        let bytes = encode_win_ansi(text);
        assert_eq!(bytes[0], 0x80);
        assert!(bytes.contains(&0x93) && bytes.contains(&0x94) && bytes.contains(&0x97) && bytes.contains(&0x92));
        assert_eq!(decode_win_ansi(&bytes), text);
    }

    #[test]
    fn c1_controls_are_not_encodable() {
        assert_eq!(encode_win_ansi("\u{0080}"), b"?".to_vec());
        assert_eq!(decode_win_ansi(&[0x81, 0xE9]), "\u{0081}\u{E9}");
    }
}
