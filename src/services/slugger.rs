//! Transliteration strategies that turn free text into a URL-safe token.

use crate::error::{SlugError, SlugResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub trait Slugger: fmt::Debug + Send + Sync {
    /// Returns a URL-safe version of `text`, with runs of disallowed
    /// characters collapsed into a single `separator` and no leading or
    /// trailing separator.
    fn slug(&self, text: &str, separator: &str) -> String;
}

/// Selects and configures a slugger by name.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SluggerSettings {
    #[serde(default = "default_slugger_name")]
    pub name: String,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    /// Extra characters the table slugger keeps verbatim, e.g. `"."`.
    #[serde(default)]
    pub preserve: String,
    /// Pattern of disallowed runs for the deunicode slugger.
    #[serde(default)]
    pub regex: Option<String>,
}

impl Default for SluggerSettings {
    fn default() -> Self {
        Self {
            name: default_slugger_name(),
            lowercase: true,
            preserve: String::new(),
            regex: None,
        }
    }
}

impl SluggerSettings {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

fn default_slugger_name() -> String {
    "table".to_string()
}

fn default_true() -> bool {
    true
}

pub const AVAILABLE_SLUGGERS: [&str; 5] = ["table", "default", "cake", "deunicode", "cocur"];

/// Resolves a slugger once, at configuration time.
pub fn build_slugger(settings: &SluggerSettings) -> SlugResult<Arc<dyn Slugger>> {
    match settings.name.as_str() {
        "table" | "default" | "cake" => Ok(Arc::new(TableSlugger {
            lowercase: settings.lowercase,
            preserve: settings.preserve.clone(),
        })),
        "deunicode" | "cocur" => {
            let regex = settings
                .regex
                .as_deref()
                .map(Regex::new)
                .transpose()
                .map_err(|e| SlugError::Configuration(format!("invalid slugger regex: {}", e)))?;
            Ok(Arc::new(DeunicodeSlugger {
                lowercase: settings.lowercase,
                regex,
            }))
        }
        other => Err(SlugError::Configuration(format!(
            "Unknown slugger '{}'. Available sluggers: {}",
            other,
            AVAILABLE_SLUGGERS.join(", ")
        ))),
    }
}

/// Default slugger backed by a fixed transliteration table, so output does
/// not depend on any system locale.
#[derive(Debug, Clone)]
pub struct TableSlugger {
    pub lowercase: bool,
    pub preserve: String,
}

impl Default for TableSlugger {
    fn default() -> Self {
        Self {
            lowercase: true,
            preserve: String::new(),
        }
    }
}

impl Slugger for TableSlugger {
    fn slug(&self, text: &str, separator: &str) -> String {
        let mut out = String::with_capacity(text.len());
        // Starts false so a leading run is dropped
        let mut pending_separator = false;

        for c in text.chars() {
            if c.is_ascii_alphanumeric() || self.preserve.contains(c) {
                push_char(&mut out, &mut pending_separator, separator, c);
            } else if let Some(ascii) = transliterate(c) {
                for t in ascii.chars() {
                    push_char(&mut out, &mut pending_separator, separator, t);
                }
            } else {
                pending_separator = true;
            }
        }

        if self.lowercase {
            out.to_lowercase()
        } else {
            out
        }
    }
}

fn push_char(out: &mut String, pending_separator: &mut bool, separator: &str, c: char) {
    if *pending_separator && !out.is_empty() {
        out.push_str(separator);
    }
    *pending_separator = false;
    out.push(c);
}

/// Slugger backed by the `deunicode` transliteration data.
#[derive(Debug, Clone)]
pub struct DeunicodeSlugger {
    pub lowercase: bool,
    pub regex: Option<Regex>,
}

impl Slugger for DeunicodeSlugger {
    fn slug(&self, text: &str, separator: &str) -> String {
        if self.lowercase && self.regex.is_none() && separator == "-" {
            return slug::slugify(text);
        }

        let ascii = deunicode::deunicode(text);
        let replaced = self
            .regex
            .as_ref()
            .unwrap_or(&*DISALLOWED_RUNS)
            .replace_all(&ascii, separator);

        let mut trimmed: &str = &replaced;
        if !separator.is_empty() {
            trimmed = trimmed
                .trim_start_matches(separator)
                .trim_end_matches(separator);
        }

        if self.lowercase {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        }
    }
}

static DISALLOWED_RUNS: once_cell::sync::Lazy<Regex> =
    once_cell::sync::Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid regex"));

/// ASCII folding for Latin, Greek and Cyrillic letters.
fn transliterate(c: char) -> Option<&'static str> {
    let ascii = match c {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' | 'Ǎ' => "A",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' | 'ǎ' | 'ª' => "a",
        'Æ' | 'Ǽ' => "AE",
        'æ' | 'ǽ' => "ae",
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => "C",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'Ð' | 'Ď' | 'Đ' => "D",
        'ð' | 'ď' | 'đ' => "d",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => "E",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => "G",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'Ĥ' | 'Ħ' => "H",
        'ĥ' | 'ħ' => "h",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' | 'Ǐ' => "I",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' | 'ǐ' => "i",
        'Ĳ' => "IJ",
        'ĳ' => "ij",
        'Ĵ' => "J",
        'ĵ' => "j",
        'Ķ' => "K",
        'ķ' | 'ĸ' => "k",
        'Ĺ' | 'Ļ' | 'Ľ' | 'Ŀ' | 'Ł' => "L",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' | 'Ŋ' => "N",
        'ñ' | 'ń' | 'ņ' | 'ň' | 'ŉ' | 'ŋ' => "n",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ō' | 'Ŏ' | 'Ő' | 'Ø' | 'Ǒ' | 'Ǿ' => "O",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' | 'ŏ' | 'ő' | 'ø' | 'ǒ' | 'ǿ' | 'º' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'Ŕ' | 'Ŗ' | 'Ř' => "R",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'Ś' | 'Ŝ' | 'Ş' | 'Ș' | 'Š' => "S",
        'ś' | 'ŝ' | 'ş' | 'ș' | 'š' | 'ſ' => "s",
        'ß' => "ss",
        'Ţ' | 'Ț' | 'Ť' | 'Ŧ' => "T",
        'ţ' | 'ț' | 'ť' | 'ŧ' => "t",
        'Þ' => "TH",
        'þ' => "th",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' | 'Ǔ' => "U",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' | 'ǔ' => "u",
        'Ŵ' => "W",
        'ŵ' => "w",
        'Ý' | 'Ÿ' | 'Ŷ' => "Y",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ź' | 'ż' | 'ž' => "z",
        // Greek
        'Α' | 'Ά' => "A",
        'α' | 'ά' => "a",
        'Β' => "B",
        'β' => "b",
        'Γ' => "G",
        'γ' => "g",
        'Δ' => "D",
        'δ' => "d",
        'Ε' | 'Έ' => "E",
        'ε' | 'έ' => "e",
        'Ζ' => "Z",
        'ζ' => "z",
        'Η' | 'Ή' => "I",
        'η' | 'ή' => "i",
        'Θ' => "TH",
        'θ' => "th",
        'Ι' | 'Ί' | 'Ϊ' => "I",
        'ι' | 'ί' | 'ϊ' | 'ΐ' => "i",
        'Κ' => "K",
        'κ' => "k",
        'Λ' => "L",
        'λ' => "l",
        'Μ' => "M",
        'μ' => "m",
        'Ν' => "N",
        'ν' => "n",
        'Ξ' => "KS",
        'ξ' => "ks",
        'Ο' | 'Ό' => "O",
        'ο' | 'ό' => "o",
        'Π' => "P",
        'π' => "p",
        'Ρ' => "R",
        'ρ' => "r",
        'Σ' => "S",
        'σ' | 'ς' => "s",
        'Τ' => "T",
        'τ' => "t",
        'Υ' | 'Ύ' | 'Ϋ' => "Y",
        'υ' | 'ύ' | 'ϋ' | 'ΰ' => "y",
        'Φ' => "F",
        'φ' => "f",
        'Χ' => "X",
        'χ' => "x",
        'Ψ' => "PS",
        'ψ' => "ps",
        'Ω' | 'Ώ' => "O",
        'ω' | 'ώ' => "o",
        // Cyrillic
        'А' => "A",
        'а' => "a",
        'Б' => "B",
        'б' => "b",
        'В' => "V",
        'в' => "v",
        'Г' | 'Ґ' => "G",
        'г' | 'ґ' => "g",
        'Д' => "D",
        'д' => "d",
        'Е' | 'Э' | 'Є' => "E",
        'е' | 'э' | 'є' => "e",
        'Ё' => "Yo",
        'ё' => "yo",
        'Ж' => "Zh",
        'ж' => "zh",
        'З' => "Z",
        'з' => "z",
        'И' | 'І' => "I",
        'и' | 'і' => "i",
        'Ї' => "Yi",
        'ї' => "yi",
        'Й' => "Y",
        'й' => "y",
        'К' => "K",
        'к' => "k",
        'Л' => "L",
        'л' => "l",
        'М' => "M",
        'м' => "m",
        'Н' => "N",
        'н' => "n",
        'О' => "O",
        'о' => "o",
        'П' => "P",
        'п' => "p",
        'Р' => "R",
        'р' => "r",
        'С' => "S",
        'с' => "s",
        'Т' => "T",
        'т' => "t",
        'У' => "U",
        'у' => "u",
        'Ф' => "F",
        'ф' => "f",
        'Х' => "H",
        'х' => "h",
        'Ц' => "Ts",
        'ц' => "ts",
        'Ч' => "Ch",
        'ч' => "ch",
        'Ш' => "Sh",
        'ш' => "sh",
        'Щ' => "Shch",
        'щ' => "shch",
        'Ы' => "Y",
        'ы' => "y",
        'Ю' => "Yu",
        'ю' => "yu",
        'Я' => "Ya",
        'я' => "ya",
        'Ъ' | 'ъ' | 'Ь' | 'ь' => "",
        _ => return None,
    };
    Some(ascii)
}
