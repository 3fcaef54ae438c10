/// Extensiones que el decodificador sabe abrir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedExtension {
    Mp3,
    Flac,
    Wav,
    Ogg,
    M4a,
    Aac,
    Opus,
}

impl SupportedExtension {
    pub const ALL: &'static [SupportedExtension] = &[
        SupportedExtension::Mp3,
        SupportedExtension::Flac,
        SupportedExtension::Wav,
        SupportedExtension::Ogg,
        SupportedExtension::M4a,
        SupportedExtension::Aac,
        SupportedExtension::Opus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedExtension::Mp3 => "mp3",
            SupportedExtension::Flac => "flac",
            SupportedExtension::Wav => "wav",
            SupportedExtension::Ogg => "ogg",
            SupportedExtension::M4a => "m4a",
            SupportedExtension::Aac => "aac",
            SupportedExtension::Opus => "opus",
        }
    }
}

impl std::str::FromStr for SupportedExtension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        SupportedExtension::ALL
            .iter()
            .find(|ext| ext.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("Extension not supported: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(SupportedExtension::from_str("MP3"), Ok(SupportedExtension::Mp3));
        assert_eq!(SupportedExtension::from_str("flac"), Ok(SupportedExtension::Flac));
        assert!(SupportedExtension::from_str("txt").is_err());
    }

    #[test]
    fn every_extension_parses_back_from_its_name() {
        for ext in SupportedExtension::ALL {
            assert_eq!(SupportedExtension::from_str(ext.as_str()), Ok(*ext));
        }
    }
}
