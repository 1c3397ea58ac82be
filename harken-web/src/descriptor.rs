//! Trial descriptors
//!
//! One descriptor per presented trial: it knows its instruction text, its
//! rating-scale bounds and labels, which audio slots it needs, and how to
//! validate a submitted score. Descriptors are parameterized by the locale
//! table - a locale is data, not a separate descriptor hierarchy.
//!
//! Descriptors are looked up through a string-keyed registry so deployments
//! can register additional trial types without touching the built-in
//! variants. Constructing a trial whose type is not registered fails with
//! `UnknownTrialType`.

use std::collections::HashMap;
use std::sync::Arc;

use harken_common::catalog::Catalog;
use harken_common::error::{Error, Result};
use harken_common::locale::{FamilyText, Locale};
use harken_common::scale::RatingScale;
use harken_common::trial::{TestFamily, TestTypeTag, TrialSpec};

/// Behavior of one presented trial
pub trait TrialDescriptor: Send + Sync {
    fn tag(&self) -> TestTypeTag;

    /// Localized rich-text instructions; instruction variants include the
    /// correct-answer hint.
    fn instructions(&self) -> String;

    fn rating_scale(&self) -> &RatingScale;

    /// Whether the reference audio slot is shown and must be played
    fn needs_reference_audio(&self) -> bool {
        self.tag().needs_reference()
    }

    /// Second, independent scale (edit-fidelity only)
    fn editing_scale(&self) -> Option<&RatingScale> {
        None
    }

    /// Edited transcript text for display (edit-fidelity only)
    fn edited_transcript(&self) -> Option<&str> {
        None
    }

    fn validate(&self, score: i32) -> bool {
        self.rating_scale().contains(score)
    }
}

/// Descriptor for the similarity, comparative, quality, naturalness and
/// attention families
struct StandardDescriptor {
    tag: TestTypeTag,
    text: Arc<FamilyText>,
}

impl TrialDescriptor for StandardDescriptor {
    fn tag(&self) -> TestTypeTag {
        self.tag
    }

    fn instructions(&self) -> String {
        render_instructions(&self.text, self.tag)
    }

    fn rating_scale(&self) -> &RatingScale {
        &self.text.scale
    }
}

/// Edit-fidelity descriptor: a naturalness scale plus an independent
/// editing-effect scale, and the edited transcript shown to the rater
struct EditFidelityDescriptor {
    tag: TestTypeTag,
    text: Arc<FamilyText>,
    edited_transcript: Option<String>,
}

impl TrialDescriptor for EditFidelityDescriptor {
    fn tag(&self) -> TestTypeTag {
        self.tag
    }

    fn instructions(&self) -> String {
        render_instructions(&self.text, self.tag)
    }

    fn rating_scale(&self) -> &RatingScale {
        &self.text.scale
    }

    fn editing_scale(&self) -> Option<&RatingScale> {
        self.text.editing_scale.as_ref()
    }

    fn edited_transcript(&self) -> Option<&str> {
        self.edited_transcript.as_deref()
    }
}

fn render_instructions(text: &FamilyText, tag: TestTypeTag) -> String {
    match (&text.instruction_note, tag.is_instruction()) {
        (Some(note), true) => format!("{}\n{note}\n", text.instructions),
        _ => text.instructions.clone(),
    }
}

type DescriptorFactory = Box<dyn Fn(&TrialSpec) -> Box<dyn TrialDescriptor> + Send + Sync>;

/// String-keyed descriptor registry, open for extension
pub struct DescriptorRegistry {
    factories: HashMap<String, DescriptorFactory>,
}

impl DescriptorRegistry {
    /// Register descriptors for every test family the locale defines.
    ///
    /// Instruction variants reuse their scored counterpart's table; families
    /// absent from the locale stay unregistered, so a catalog that uses them
    /// fails startup validation rather than failing mid-session.
    pub fn with_locale(locale: &Locale) -> DescriptorRegistry {
        let mut registry = DescriptorRegistry {
            factories: HashMap::new(),
        };

        for &tag in TestTypeTag::all() {
            let Ok(text) = locale.family(tag.family()) else {
                continue;
            };
            let text = Arc::new(text.clone());
            if tag.family() == TestFamily::EditFidelity {
                registry.register(
                    tag.as_str(),
                    Box::new(move |trial| {
                        Box::new(EditFidelityDescriptor {
                            tag,
                            text: Arc::clone(&text),
                            edited_transcript: trial.edited_transcript.clone(),
                        })
                    }),
                );
            } else {
                registry.register(
                    tag.as_str(),
                    Box::new(move |_trial| {
                        Box::new(StandardDescriptor {
                            tag,
                            text: Arc::clone(&text),
                        })
                    }),
                );
            }
        }

        registry
    }

    /// Register (or replace) a descriptor factory for a trial-type key
    pub fn register(&mut self, tag: impl Into<String>, factory: DescriptorFactory) {
        self.factories.insert(tag.into(), factory);
    }

    pub fn supports(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Construct the descriptor for a trial
    pub fn create(&self, trial: &TrialSpec) -> Result<Box<dyn TrialDescriptor>> {
        let key = trial.test_type.as_str();
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| Error::UnknownTrialType(key.to_string()))?;
        Ok(factory(trial))
    }

    /// Fail fast if any catalog bucket or configured trial has no descriptor
    pub fn validate_trials<'a, I>(&self, trials: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a TrialSpec>,
    {
        for trial in trials {
            if !self.supports(trial.test_type.as_str()) {
                return Err(Error::UnknownTrialType(trial.test_type.to_string()));
            }
        }
        Ok(())
    }

    /// Startup validation over the whole catalog
    pub fn validate_catalog(&self, catalog: &Catalog) -> Result<()> {
        for (tag, groups) in catalog.buckets() {
            if !self.supports(tag.as_str()) {
                return Err(Error::UnknownTrialType(tag.to_string()));
            }
            self.validate_trials(groups.iter().flatten())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harken_common::locale;

    fn trial(tag: &str) -> TrialSpec {
        serde_json::from_value(serde_json::json!({
            "type": tag,
            "reference": "a.wav",
            "target": "b.wav"
        }))
        .unwrap()
    }

    #[test]
    fn english_registry_covers_all_tags() {
        let registry = DescriptorRegistry::with_locale(&locale::english());
        for tag in TestTypeTag::all() {
            assert!(registry.supports(tag.as_str()), "{tag}");
        }
    }

    #[test]
    fn finnish_registry_omits_undefined_families() {
        let registry = DescriptorRegistry::with_locale(&locale::finnish());
        assert!(registry.supports("SMOS"));
        assert!(registry.supports("CMOS"));
        assert!(registry.supports("attention"));
        assert!(!registry.supports("QMOS"));
        assert!(!registry.supports("EMOS"));
    }

    #[test]
    fn comparative_scale_is_signed_and_symmetric() {
        let registry = DescriptorRegistry::with_locale(&locale::english());
        let descriptor = registry.create(&trial("CMOS")).unwrap();
        let scale = descriptor.rating_scale();
        assert_eq!((scale.min, scale.max, scale.default), (-3, 3, 0));
        assert!(descriptor.validate(2));
        assert!(!descriptor.validate(4));
    }

    #[test]
    fn instruction_variant_reuses_scale_and_adds_hint() {
        let registry = DescriptorRegistry::with_locale(&locale::english());
        let scored = registry.create(&trial("SMOS")).unwrap();
        let instruction = registry.create(&trial("smos_instruction")).unwrap();
        assert_eq!(scored.rating_scale(), instruction.rating_scale());
        assert!(!scored.instructions().contains("instruction example"));
        assert!(instruction.instructions().contains("instruction example"));
    }

    #[test]
    fn reference_slot_follows_family() {
        let registry = DescriptorRegistry::with_locale(&locale::english());
        assert!(registry.create(&trial("SMOS")).unwrap().needs_reference_audio());
        assert!(registry.create(&trial("attention")).unwrap().needs_reference_audio());
        assert!(!registry.create(&trial("QMOS")).unwrap().needs_reference_audio());
        assert!(!registry.create(&trial("NMOS")).unwrap().needs_reference_audio());
    }

    #[test]
    fn edit_fidelity_exposes_second_scale_and_transcript() {
        let registry = DescriptorRegistry::with_locale(&locale::english());
        let mut spec = trial("EMOS");
        spec.edited_transcript = Some("the edited line".into());
        let descriptor = registry.create(&spec).unwrap();
        assert!(!descriptor.needs_reference_audio());
        let editing = descriptor.editing_scale().unwrap();
        assert_eq!((editing.min, editing.max), (0, 3));
        assert_eq!(descriptor.edited_transcript(), Some("the edited line"));
    }

    #[test]
    fn unknown_type_fails_lookup() {
        let registry = DescriptorRegistry::with_locale(&locale::finnish());
        let err = match registry.create(&trial("QMOS")) {
            Ok(_) => panic!("expected QMOS lookup to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, Error::UnknownTrialType(_)));
    }

    #[test]
    fn callers_can_register_new_tags() {
        let mut registry = DescriptorRegistry::with_locale(&locale::english());
        assert!(!registry.supports("pitch"));
        let text = Arc::new(
            locale::english()
                .family(TestFamily::Quality)
                .unwrap()
                .clone(),
        );
        registry.register(
            "pitch",
            Box::new(move |_| {
                Box::new(StandardDescriptor {
                    tag: TestTypeTag::Quality,
                    text: Arc::clone(&text),
                })
            }),
        );
        assert!(registry.supports("pitch"));
    }
}
