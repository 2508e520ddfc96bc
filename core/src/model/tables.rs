//! Closed enumerations from ETSI TS 101 756, used by FIG 0/5 (language)
//! and FIG 0/13 (user application) encoders.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Language {
    Alb = 0x01,
    Bre = 0x02,
    Cat = 0x03,
    Hrv = 0x04,
    Cym = 0x05,
    Ces = 0x06,
    Dan = 0x07,
    Deu = 0x08,
    Eng = 0x09,
    Spa = 0x0A,
    Epo = 0x0B,
    Est = 0x0C,
    Eus = 0x0D,
    Fra = 0x0F,
    Gle = 0x11,
    Ita = 0x15,
    Nld = 0x1D,
    Nor = 0x1E,
    Pol = 0x20,
    Por = 0x21,
    Ron = 0x22,
    Rus = 0x56,
    Swe = 0x28,
    Tur = 0x29,
    Ukr = 0x49,
}

impl From<Language> for u8 {
    fn from(value: Language) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Language {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(Language::Alb),
            0x02 => Ok(Language::Bre),
            0x03 => Ok(Language::Cat),
            0x04 => Ok(Language::Hrv),
            0x05 => Ok(Language::Cym),
            0x06 => Ok(Language::Ces),
            0x07 => Ok(Language::Dan),
            0x08 => Ok(Language::Deu),
            0x09 => Ok(Language::Eng),
            0x0A => Ok(Language::Spa),
            0x0B => Ok(Language::Epo),
            0x0C => Ok(Language::Est),
            0x0D => Ok(Language::Eus),
            0x0F => Ok(Language::Fra),
            0x11 => Ok(Language::Gle),
            0x15 => Ok(Language::Ita),
            0x1D => Ok(Language::Nld),
            0x1E => Ok(Language::Nor),
            0x20 => Ok(Language::Pol),
            0x21 => Ok(Language::Por),
            0x22 => Ok(Language::Ron),
            0x56 => Ok(Language::Rus),
            0x28 => Ok(Language::Swe),
            0x29 => Ok(Language::Tur),
            0x49 => Ok(Language::Ukr),
            other => Err(format!("unknown language code 0x{other:02X}")),
        }
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        Language::try_from(code).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Alb => "Albanian",
            Language::Bre => "Breton",
            Language::Cat => "Catalan",
            Language::Hrv => "Croatian",
            Language::Cym => "Welsh",
            Language::Ces => "Czech",
            Language::Dan => "Danish",
            Language::Deu => "German",
            Language::Eng => "English",
            Language::Spa => "Spanish",
            Language::Epo => "Esperanto",
            Language::Est => "Estonian",
            Language::Eus => "Basque",
            Language::Fra => "French",
            Language::Gle => "Irish",
            Language::Ita => "Italian",
            Language::Nld => "Dutch",
            Language::Nor => "Norwegian",
            Language::Pol => "Polish",
            Language::Por => "Portuguese",
            Language::Ron => "Romanian",
            Language::Rus => "Russian",
            Language::Swe => "Swedish",
            Language::Tur => "Turkish",
            Language::Ukr => "Ukrainian",
        };
        write!(f, "{name}")
    }
}

/// FIG 0/13 user application identifiers (11-bit field, low byte used on
/// the wire for short-form descriptors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserApplication {
    Reserved,
    Sls,
    Tpeg,
    Spi,
    Dmb,
    Filecasting,
    Fis,
    Journaline,
    Unknown(u16),
}

impl From<UserApplication> for u16 {
    fn from(value: UserApplication) -> Self {
        match value {
            UserApplication::Reserved => 0x000,
            UserApplication::Sls => 0x002,
            UserApplication::Tpeg => 0x004,
            UserApplication::Spi => 0x007,
            UserApplication::Dmb => 0x009,
            UserApplication::Filecasting => 0x00D,
            UserApplication::Fis => 0x00E,
            UserApplication::Journaline => 0x044A,
            UserApplication::Unknown(val) => val,
        }
    }
}

impl From<u16> for UserApplication {
    fn from(code: u16) -> Self {
        match code {
            0x000 => UserApplication::Reserved,
            0x002 => UserApplication::Sls,
            0x004 => UserApplication::Tpeg,
            0x007 => UserApplication::Spi,
            0x009 => UserApplication::Dmb,
            0x00D => UserApplication::Filecasting,
            0x00E => UserApplication::Fis,
            0x044A => UserApplication::Journaline,
            other => UserApplication::Unknown(other),
        }
    }
}

impl fmt::Display for UserApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserApplication::Reserved => write!(f, "Reserved"),
            UserApplication::Sls => write!(f, "SlideShow"),
            UserApplication::Tpeg => write!(f, "TPEG"),
            UserApplication::Spi => write!(f, "SPI"),
            UserApplication::Dmb => write!(f, "DMB"),
            UserApplication::Filecasting => write!(f, "Filecasting"),
            UserApplication::Fis => write!(f, "FIS"),
            UserApplication::Journaline => write!(f, "Journaline"),
            UserApplication::Unknown(v) => write!(f, "Unknown(0x{v:03X})"),
        }
    }
}

impl Serialize for UserApplication {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16((*self).into())
    }
}

impl<'de> Deserialize<'de> for UserApplication {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u16::deserialize(deserializer)?;
        Ok(UserApplication::from(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_round_trips() {
        for lang in [Language::Eng, Language::Rus, Language::Ukr] {
            let code: u8 = lang.into();
            assert_eq!(Language::try_from(code), Ok(lang));
        }
    }

    #[test]
    fn unknown_language_code_is_rejected() {
        assert!(Language::try_from(0x00).is_err());
    }

    #[test]
    fn user_application_code_round_trips() {
        for ua in [UserApplication::Sls, UserApplication::Journaline] {
            let code: u16 = ua.into();
            assert_eq!(UserApplication::from(code), ua);
        }
    }

    #[test]
    fn unknown_user_application_code_is_preserved() {
        assert_eq!(UserApplication::from(0x123), UserApplication::Unknown(0x123));
    }
}
