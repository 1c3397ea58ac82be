//! Locale text and label tables
//!
//! A locale is data: the instruction text, the correct-answer hint for
//! instruction trials, and the rating scale (bounds plus one label per step)
//! for each test family. Descriptors are parameterized by one of these
//! tables; adding a language means adding a table, not code.
//!
//! Built-in tables exist for English, Finnish and Swedish. A deployment can
//! override any of them with a TOML file of the same shape.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::scale::RatingScale;
use crate::trial::TestFamily;

/// Per-family text and scale table
#[derive(Debug, Clone, Deserialize)]
pub struct FamilyText {
    /// Markdown instruction text shown above the audio slots
    pub instructions: String,

    /// Correct-answer hint appended for the instruction variant
    #[serde(default)]
    pub instruction_note: Option<String>,

    /// Primary rating scale
    pub scale: RatingScale,

    /// Second, independent scale (edit-fidelity only)
    #[serde(default)]
    pub editing_scale: Option<RatingScale>,
}

/// Complete locale table
#[derive(Debug, Clone, Deserialize)]
pub struct Locale {
    pub language: String,
    #[serde(default)]
    pub similarity: Option<FamilyText>,
    #[serde(default)]
    pub comparative: Option<FamilyText>,
    #[serde(default)]
    pub quality: Option<FamilyText>,
    #[serde(default)]
    pub naturalness: Option<FamilyText>,
    #[serde(default)]
    pub edit_fidelity: Option<FamilyText>,
    #[serde(default)]
    pub attention: Option<FamilyText>,
}

impl Locale {
    /// Look up a built-in locale by name
    pub fn builtin(language: &str) -> Result<Locale> {
        match language.to_lowercase().as_str() {
            "english" | "en" => Ok(english()),
            "finnish" | "fi" => Ok(finnish()),
            "swedish" | "sv" => Ok(swedish()),
            other => Err(Error::Config(format!("no built-in locale '{other}'"))),
        }
    }

    /// Load a locale table from a TOML file
    pub fn load(path: &Path) -> Result<Locale> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("locale file {}: {e}", path.display())))?;
        let locale: Locale = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("locale file {}: {e}", path.display())))?;
        locale.validate()?;
        Ok(locale)
    }

    /// Table for one test family, or a configuration error if this locale
    /// does not define it.
    pub fn family(&self, family: TestFamily) -> Result<&FamilyText> {
        let entry = match family {
            TestFamily::Similarity => &self.similarity,
            TestFamily::Comparative => &self.comparative,
            TestFamily::Quality => &self.quality,
            TestFamily::Naturalness => &self.naturalness,
            TestFamily::EditFidelity => &self.edit_fidelity,
            TestFamily::Attention => &self.attention,
        };
        entry.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "locale '{}' defines no texts for {family:?}",
                self.language
            ))
        })
    }

    /// Validate every defined scale
    pub fn validate(&self) -> Result<()> {
        for entry in [
            &self.similarity,
            &self.comparative,
            &self.quality,
            &self.naturalness,
            &self.edit_fidelity,
            &self.attention,
        ]
        .into_iter()
        .flatten()
        {
            entry.scale.validate()?;
            if let Some(editing) = &entry.editing_scale {
                editing.validate()?;
            }
        }
        Ok(())
    }
}

fn scale(min: i32, max: i32, default: i32, labels: &[&str]) -> RatingScale {
    // Built-in tables are asserted consistent at construction
    RatingScale::new(min, max, default, labels.iter().copied())
        .expect("built-in scale tables are consistent")
}

/// English table (default)
pub fn english() -> Locale {
    Locale {
        language: "english".into(),
        similarity: Some(FamilyText {
            instructions: "\
### Speaker Similarity Test (SMOS)\n\
Please rate how similar the voice in the target audio is to the reference audio.\n\
- Scale: 1-5 (1: Very Different, 5: Very Similar)\n\
- The audios are recorded under various conditions, so please focus on the speaker's voice characteristics.\n\
- Please finish listening to both audios before submitting your score.\n\
- It's very important to trust your first impression and not overthink your answer.\n"
                .into(),
            instruction_note: Some(
                "**This is an instruction example where both audios are from the same \
                 speaker with different content. You should give a score of 5 since it's \
                 the same speaker.**"
                    .into(),
            ),
            scale: scale(
                1,
                5,
                3,
                &[
                    "Very Different",
                    "Different",
                    "Slightly Different",
                    "Similar",
                    "Very Similar",
                ],
            ),
            editing_scale: None,
        }),
        comparative: Some(FamilyText {
            instructions: "\
### Comparative Mean Opinion Score Test (CMOS)\n\
Please compare how human-sounding sample B is against sample A.\n\
- Scale: -3 to +3\n\
- Negative: Sample A is more human-sounding\n\
- Positive: Sample B is more human-sounding\n\
- 0: Equal quality\n\
\n\
Tips:\n\
- The audios are recorded under various conditions and in different speaking styles, so please focus on how the voice sounds like a natural human voice.\n\
- Please finish listening to the given audio before submitting your score.\n\
- It's very important to trust your first impression and not overthink your answer.\n"
                .into(),
            instruction_note: Some(
                "**This is an instruction example where both audios are natural speech \
                 with equal quality. You should give a score of 0.**"
                    .into(),
            ),
            scale: scale(
                -3,
                3,
                0,
                &[
                    "Sample A is much better",
                    "Sample A is better",
                    "Sample A is slightly better",
                    "Equal quality",
                    "Sample B is slightly better",
                    "Sample B is better",
                    "Sample B is much better",
                ],
            ),
            editing_scale: None,
        }),
        quality: Some(FamilyText {
            instructions: "\
### Speech Quality Test (QMOS)\n\
Please rate the quality of the target audio.\n\
- Scale: 1-5 (1: very bad, 5: very good)\n\
- Please finish listening to the given audio before submitting your score.\n\
- It's very important to trust your first impression and not overthink your answer.\n\
\n\
Please consider the following aspects for your rating:\n\
1. How pleasant the speech sounds to your ear.\n\
2. Whether there are audio artefacts, such as background noise, crackling, echo, volume inconsistencies, or digital distortions.\n\
3. Whether the speech is clear and intelligible to you.\n"
                .into(),
            instruction_note: Some(
                "**This is an instruction example where the target audio is high-quality \
                 speech. You should give a score of 5.**"
                    .into(),
            ),
            scale: scale(1, 5, 3, &["Very Bad", "Bad", "Ok", "Good", "Very Good"]),
            editing_scale: None,
        }),
        naturalness: Some(FamilyText {
            instructions: "\
### Speech Naturalness Test (NMOS)\n\
Please rate how natural the voice in the target audio sounds.\n\
- Scale: 1-5 (1: very unnatural, 5: very natural)\n\
- The audios are recorded under various conditions, so please focus on how the voice sounds like a natural human voice.\n\
- Please finish listening to the given audio before submitting your score.\n\
- It's very important to trust your first impression and not overthink your answer.\n"
                .into(),
            instruction_note: Some(
                "**This is an instruction example where the target audio is natural \
                 speech. You should give a score of 5.**"
                    .into(),
            ),
            scale: scale(
                1,
                5,
                3,
                &[
                    "Very Unnatural",
                    "Unnatural",
                    "Slightly Unnatural",
                    "Natural",
                    "Very Natural",
                ],
            ),
            editing_scale: None,
        }),
        edit_fidelity: Some(FamilyText {
            instructions: "\
### Editing Mean Opinion Score Test (EMOS)\n\
Please evaluate the edited speech based on the provided transcript.\n\
\n\
**Instructions:**\n\
1. Read the edited transcript below\n\
2. Listen to the edited speech\n\
3. Rate how natural (human-sounding) the speech is (1-5 scale)\n\
4. Rate how well the editing is reflected in the speech (0-3 scale)\n"
                .into(),
            instruction_note: Some(
                "**The edited transcript has one or more characters edited (replaced, \
                 inserted, or reordered) and may contain incorrect or non-existent words, \
                 which is expected. Please focus on the naturalness of the speech and how \
                 well the editing is reflected.**"
                    .into(),
            ),
            scale: scale(
                1,
                5,
                3,
                &[
                    "Very Unnatural",
                    "Unnatural",
                    "Slightly Unnatural",
                    "Natural",
                    "Very Natural",
                ],
            ),
            editing_scale: Some(scale(
                0,
                3,
                1,
                &[
                    "The speech doesn't reflect the editing",
                    "Some editing is reflected",
                    "Most of the editing is reflected",
                    "All editing is reflected",
                ],
            )),
        }),
        attention: Some(FamilyText {
            instructions: "\
### Attention Check\n\
Both the reference and target audios are identical; they are instructions to you on how to rate this question.\n\
\n\
Please rate as the audio instructs.\n\
- Scale: -3 to 3\n\
\n\
Even though the audios are identical, **please finish listening to both audios before submitting your answer.**\n"
                .into(),
            instruction_note: None,
            scale: scale(
                -3,
                3,
                0,
                &[
                    "Sample A is much better",
                    "Sample A is better",
                    "Sample A is slightly better",
                    "Equal quality",
                    "Sample B is slightly better",
                    "Sample B is better",
                    "Sample B is much better",
                ],
            ),
            editing_scale: None,
        }),
    }
}

/// Finnish table (similarity, comparative and attention families)
pub fn finnish() -> Locale {
    let comparative_labels = [
        "Ääni A kuulostaa paljon enemmän ihmisen kaltaiselta",
        "Ääni A kuulostaa enemmän ihmisen kaltaiselta",
        "Ääni A kuulostaa hieman enemmän ihmisen kaltaiselta",
        "Molemmat kuulostavat yhtä ihmisen kaltaisilta",
        "Ääni B kuulostaa hieman enemmän ihmisen kaltaiselta",
        "Ääni B kuulostaa enemmän ihmisen kaltaiselta",
        "Ääni B kuulostaa paljon enemmän ihmisen kaltaiselta",
    ];
    Locale {
        language: "finnish".into(),
        similarity: Some(FamilyText {
            instructions: "\
### Puhujan samankaltaisuuden arviointi (similarity)\n\
\n\
Sinua pyydetään kuuntelemaan kahta ääninäytettä: Ääni A ja Ääni B.\n\
\n\
Tehtäväsi on kuunnella molemmat ääninäytteet kokonaan ja arvioida, edustavatko molemmat näytteet samaa puhujaa. Keskity puhujan äänellisiin ominaisuuksiin (kuten sävyyn, äänenkorkeuteen ja puhetapaan) taustamelun, tallennuslaadun tai sisällön sijaan.\n\
\n\
Luota ensivaikutelmaasi äläkä mieti päätöstäsi liikaa. Käytä \"En osaa sanoa\" -vaihtoehtoa vain satunnaisesti, jos et todella kallistu kumpaankaan suuntaan.\n"
                .into(),
            instruction_note: Some(
                "**Tämä on ohjekysymys. Sinun tulisi arvioida tämä kysymys arvosanalla \
                 2 - Sama puhuja, koska sekä äänellä A että äänellä B on sama puhuja.**"
                    .into(),
            ),
            scale: scale(
                -2,
                2,
                0,
                &[
                    "Ei sama puhuja",
                    "Todennäköisesti ei sama puhuja",
                    "En osaa sanoa",
                    "Todennäköisesti sama puhuja",
                    "Sama puhuja",
                ],
            ),
            editing_scale: None,
        }),
        comparative: Some(FamilyText {
            instructions: "\
### Puheen ihmismäisyyden arviointi (human-likeness)\n\
\n\
Sinua pyydetään kuuntelemaan kahta ääninäytettä: Ääni A ja Ääni B.\n\
\n\
Tehtäväsi on verrata kahta ääninäytettä ja arvioida, kumpi näytteistä kuulostaa enemmän ihmisääneltä. Keskity puheäänen ominaisuuksiin, äläkä kiinnitä huomiota taustameluun, tallennuslaatuun tai sisältöön.\n\
\n\
Kuuntele molemmat ääninäytteet kokonaan ennen arviosi antamista. Luota ensivaikutelmaasi äläkä mieti päätöstäsi liikaa.\n"
                .into(),
            instruction_note: Some(
                "**Tämä on ohjekysymys. Sinun tulisi arvioida tämä kysymys arvosanalla \
                 0, koska sekä ääni A että ääni B ovat ihmisen tuottamia.**"
                    .into(),
            ),
            scale: scale(-3, 3, 0, &comparative_labels),
            editing_scale: None,
        }),
        quality: None,
        naturalness: None,
        edit_fidelity: None,
        attention: Some(FamilyText {
            instructions: "\
### Huomiotarkistus\n\
Sekä viite- että kohdeäänitteet ovat identtisiä, ne ovat ohjeita sinulle tämän kysymyksen arvioimiseksi.\n\
\n\
Vaikka äänitteet ovat identtiset, **kuuntele molemmat äänitteet loppuun ennen vastaustesi lähettämistä.**\n"
                .into(),
            instruction_note: None,
            scale: scale(-3, 3, 0, &comparative_labels),
            editing_scale: None,
        }),
    }
}

/// Swedish table (similarity, comparative and attention families)
pub fn swedish() -> Locale {
    let comparative_labels = [
        "Audio A är mycket mer människolik",
        "Audio A är mer människolik",
        "Audio A är lite mer människolik",
        "De låter lika människolika",
        "Audio B är lite mer människolik",
        "Audio B är mer människolik",
        "Audio B är mycket mer människolik",
    ];
    Locale {
        language: "swedish".into(),
        similarity: Some(FamilyText {
            instructions: "\
### Instruktioner för test av talarlikhet\n\
\n\
Du kommer att bli ombedd att lyssna på två ljudexempel: Ljud A och Ljud B.\n\
\n\
Din uppgift är att lyssna igenom båda ljudexemplen helt och hållet, och sedan avgöra om båda ljudexemplen representerar samma talare. Fokusera på talarens röstegenskaper (till exempel ton, tonhöjd och talstil), snarare än på bakgrundsljud, inspelningskvalitet och innehåll.\n\
\n\
Det är viktigt att du litar på ditt första intryck och inte övertänker ditt beslut. Använd bara \"osäker\" undantagsvis, då du verkligen inte lutar åt något håll alls.\n"
                .into(),
            instruction_note: Some(
                "**Detta är en riktlinjefråga. Du bör betygsätta frågan med poängen \
                 2 - Samma talare eftersom både ljud A och ljud B kommer från samma talare.**"
                    .into(),
            ),
            scale: scale(
                -2,
                2,
                0,
                &[
                    "inte samma talare",
                    "troligen inte samma talare",
                    "osäker",
                    "troligen samma talare",
                    "samma talare",
                ],
            ),
            editing_scale: None,
        }),
        comparative: Some(FamilyText {
            instructions: "\
### Instruktioner för test av människolikhet\n\
\n\
Du kommer att bli ombedd att lyssna på två ljudexempel: Ljud A och Ljud B.\n\
\n\
Din uppgift är att jämföra de två ljudexemplen och avgöra vilket som låter mest som en mänsklig röst. Fokusera på rösten i sig, inte på bakgrundsljud, inspelningskvalitet eller innehåll.\n\
\n\
Lyssna genom båda ljudexemplen helt och hållet innan du ger ditt omdöme. Det är viktigt att du litar på ditt första intryck och inte övertänker ditt beslut.\n"
                .into(),
            instruction_note: Some(
                "**Detta är en riktlinjefråga. Du bör betygsätta frågan med poängen 0 \
                 eftersom båda ljudexemplen är mänskligt tal.**"
                    .into(),
            ),
            scale: scale(-3, 3, 0, &comparative_labels),
            editing_scale: None,
        }),
        quality: None,
        naturalness: None,
        edit_fidelity: None,
        attention: Some(FamilyText {
            instructions: "\
### Uppmärksamhetskontroll\n\
Både referens- och målljudet är identiska; de är instruktioner till dig om hur du ska betygsätta den här frågan.\n\
\n\
Även om ljuden är identiska, **lyssna igenom båda ljuden helt innan du skickar in ditt svar.**\n"
                .into(),
            instruction_note: None,
            scale: scale(-3, 3, 0, &comparative_labels),
            editing_scale: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_locales_validate() {
        for lang in ["english", "finnish", "swedish"] {
            let locale = Locale::builtin(lang).unwrap();
            locale.validate().unwrap();
        }
    }

    #[test]
    fn unknown_language_is_config_error() {
        assert!(matches!(Locale::builtin("klingon"), Err(Error::Config(_))));
    }

    #[test]
    fn english_defines_all_families() {
        let en = english();
        for family in [
            TestFamily::Similarity,
            TestFamily::Comparative,
            TestFamily::Quality,
            TestFamily::Naturalness,
            TestFamily::EditFidelity,
            TestFamily::Attention,
        ] {
            en.family(family).unwrap();
        }
    }

    #[test]
    fn finnish_similarity_is_symmetric() {
        let fi = finnish();
        let table = fi.family(TestFamily::Similarity).unwrap();
        assert_eq!(table.scale.min, -2);
        assert_eq!(table.scale.max, 2);
        assert_eq!(table.scale.level_labels.len(), 5);
    }

    #[test]
    fn finnish_has_no_edit_fidelity() {
        let fi = finnish();
        assert!(fi.family(TestFamily::EditFidelity).is_err());
    }

    #[test]
    fn edit_fidelity_carries_second_scale() {
        let en = english();
        let table = en.family(TestFamily::EditFidelity).unwrap();
        let editing = table.editing_scale.as_ref().unwrap();
        assert_eq!((editing.min, editing.max), (0, 3));
    }

    #[test]
    fn locale_loads_from_toml() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
language = "test"

[comparative]
instructions = "Compare the two samples."
instruction_note = "Give 0."

[comparative.scale]
min = -1
max = 1
default = 0
level_labels = ["A better", "Equal", "B better"]
"#
        )
        .unwrap();
        let locale = Locale::load(file.path()).unwrap();
        let table = locale.family(TestFamily::Comparative).unwrap();
        assert_eq!(table.scale.level_labels.len(), 3);
        assert!(locale.family(TestFamily::Quality).is_err());
    }
}
